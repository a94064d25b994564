//! Logging backend which logs to a file and to standard error.
//!
//! Hosts that already have a `log` implementation don't need this; everything in the crate logs
//! through the `log` macros.

use chrono::Local;
use eyre::{eyre, Context, Result};
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::OnceCell;
use std::{
    fs::File,
    io::Write,
    path::Path,
    sync::Mutex,
};

struct Message {
    module: String,
    level: Level,
    string: String,
    time: String,
}

impl Message {
    fn from_record(record: &Record) -> Message {
        Message {
            module: record
                .module_path()
                .and_then(|path| path.split("::").last())
                .unwrap_or("unknown")
                .to_string(),
            level: record.level(),
            string: format!("{}", record.args()),
            time: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        }
    }

    fn write_to(&self, out: &mut impl Write) {
        let level_name = match self.level {
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };

        //      [date time] [module] [level] Text
        let _ = writeln!(
            out,
            "[{}] [{}] [{}] {}",
            self.time, self.module, level_name, self.string
        );
    }
}

pub struct Logger {
    file: Option<Mutex<File>>,
    max_level: LevelFilter,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = Message::from_record(record);

        // Written synchronously on the calling thread.
        message.write_to(&mut std::io::stderr().lock());

        if let Some(Ok(mut file)) = self.file.as_ref().map(Mutex::lock) {
            message.write_to(&mut *file);
        }
    }

    fn flush(&self) {
        if let Some(Ok(mut file)) = self.file.as_ref().map(Mutex::lock) {
            let _ = file.flush();
        }
    }
}

static LOGGER: OnceCell<Logger> = OnceCell::new();

/// Installs the logger, writing to `path` as well as standard error if a path is given.
pub fn init(path: Option<&Path>, max_level: LevelFilter) -> Result<()> {
    let file = path
        .map(|path| {
            File::create(path).wrap_err_with(|| format!("Unable to create log file {:?}", path))
        })
        .transpose()?
        .map(Mutex::new);

    let logger = LOGGER.get_or_init(|| Logger { file, max_level });

    log::set_logger(logger).map_err(|err| eyre!("A logger has already been installed: {}", err))?;
    log::set_max_level(max_level);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_follow_the_log_format() {
        let message = Message {
            module: "registry".to_string(),
            level: Level::Warn,
            string: "hello".to_string(),
            time: "2024-01-01 00:00:00.000".to_string(),
        };

        let mut out = vec![];
        message.write_to(&mut out);

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[2024-01-01 00:00:00.000] [registry] [warning] hello\n"
        );
    }

    #[test]
    fn only_one_logger_can_be_installed() {
        // The first call fails too if another test got there first.
        let _ = init(None, LevelFilter::Off);

        assert!(init(None, LevelFilter::Off).is_err());
    }
}
