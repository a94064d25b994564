//! Keeps failures in host callbacks from unwinding into the host's frame.

use eyre::{eyre, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Extracts the message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "no message".to_string())
}

/// Runs `f`, turning a panic into an error report.
///
/// A panic part-way through a mutation can leave the object partially updated. Its `RefCell`
/// borrow is released during unwinding, so the object is still usable afterwards.
pub fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(eyre!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_pass_through() {
        assert_eq!(guarded(|| Ok(5)).unwrap(), 5);
        assert!(guarded::<()>(|| Err(eyre!("nope"))).is_err());
    }

    #[test]
    fn panics_become_errors() {
        let err = guarded::<()>(|| panic!("host exploded")).unwrap_err();
        assert!(err.to_string().contains("host exploded"));

        let code = 7;
        let err = guarded::<()>(|| panic!("code {}", code)).unwrap_err();
        assert!(err.to_string().contains("code 7"));
    }
}
