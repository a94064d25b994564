//! The diagnostic stream produced while applying replacements.
//!
//! Nothing that goes wrong while replacing one object is allowed to stop the rest of a pass, so
//! problems are recorded here (and logged) instead of being returned as errors.

use std::fmt;

use log::Level;

use crate::{kind::ObjectKind, object::ObjectId, orchestrator::Pass};

#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// An object was replaced.
    Replaced {
        pass: Pass,
        name: String,
        target: ObjectId,
    },

    /// No live objects of a kind could be found. `resident_sample` holds names of objects of
    /// other kinds to help work out why.
    EnumerationEmpty {
        kind: ObjectKind,
        resident_sample: Vec<String>,
    },

    /// The replacement couldn't be decoded, or the target refused the write.
    DecodeFailure {
        pass: Pass,
        name: String,
        target: Option<ObjectId>,
        reason: String,
    },

    /// A registered replacement didn't match any live object.
    Unmatched {
        pass: Pass,
        name: String,

        /// Resident names that look related to `name`.
        similar: Vec<String>,
    },

    /// A bundle-sourced object was found as a target for itself and left alone.
    SelfReplacementSkipped {
        pass: Pass,
        name: String,
        target: ObjectId,
    },

    /// A replacement that can't be applied yet.
    Unsupported {
        pass: Pass,
        name: String,
        reason: String,
    },
}

impl Diagnostic {
    /// The level this diagnostic is logged at.
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::Replaced { .. } => Level::Info,
            Diagnostic::EnumerationEmpty { .. } => Level::Warn,
            Diagnostic::DecodeFailure { .. } => Level::Error,

            // These are summarised once per pass at warning level.
            Diagnostic::Unmatched { .. } => Level::Debug,

            Diagnostic::SelfReplacementSkipped { .. } => Level::Trace,
            Diagnostic::Unsupported { .. } => Level::Warn,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Diagnostic::DecodeFailure { .. } | Diagnostic::Unmatched { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Replaced { pass, name, target } => {
                write!(f, "[{}] replaced '{}' ({})", pass, name, target)
            }

            Diagnostic::EnumerationEmpty {
                kind,
                resident_sample,
            } => write!(
                f,
                "no live {} objects found; resident sample: [{}]",
                kind,
                resident_sample.join(", ")
            ),

            Diagnostic::DecodeFailure {
                pass,
                name,
                target: Some(target),
                reason,
            } => write!(f, "[{}] failed to replace '{}' ({}): {}", pass, name, target, reason),

            Diagnostic::DecodeFailure {
                pass,
                name,
                target: None,
                reason,
            } => write!(f, "[{}] failed to load '{}': {}", pass, name, reason),

            Diagnostic::Unmatched {
                pass,
                name,
                similar,
            } => write!(
                f,
                "[{}] '{}' does not replace anything; similar resident names: [{}]",
                pass,
                name,
                similar.join(", ")
            ),

            Diagnostic::SelfReplacementSkipped { pass, name, target } => {
                write!(f, "[{}] '{}' ({}) is its own source; skipped", pass, name, target)
            }

            Diagnostic::Unsupported { pass, name, reason } => {
                write!(f, "[{}] cannot replace '{}': {}", pass, name, reason)
            }
        }
    }
}

/// Collects diagnostics, logging each one as it arrives.
#[derive(Default, Debug)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::log!(diagnostic.level(), "{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn failures(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|diagnostic| diagnostic.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_names_are_failures() {
        let mut diagnostics = Diagnostics::new();

        diagnostics.push(Diagnostic::Unmatched {
            pass: Pass::DiskTexture,
            name: "title_bg".to_string(),
            similar: vec!["title_bg_01".to_string()],
        });

        diagnostics.push(Diagnostic::EnumerationEmpty {
            kind: ObjectKind::AudioClip,
            resident_sample: vec![],
        });

        assert_eq!(diagnostics.entries().len(), 2);
        assert_eq!(diagnostics.failures().count(), 1);

        let text = diagnostics.entries()[0].to_string();
        assert!(text.contains("title_bg_01"), "{}", text);
    }
}
