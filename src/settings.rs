use std::{fs::File, io::Read, path::Path};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::orchestrator::Pass;

fn default_settle_frames() -> u32 {
    30
}

fn default_resident_sample_limit() -> usize {
    25
}

fn default_similar_name_limit() -> usize {
    10
}

/// Tuning for the replacement engine.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Options {
    /// How many frames to wait after a scene loads before replacing anything. Objects in a new
    /// scene aren't all resident straight away.
    #[serde(default = "default_settle_frames")]
    pub settle_frames: u32,

    /// The maximum number of resident object names dumped when a kind has no live objects.
    #[serde(default = "default_resident_sample_limit")]
    pub resident_sample_limit: usize,

    /// The maximum number of similar names listed for each unmatched replacement.
    #[serde(default = "default_similar_name_limit")]
    pub similar_name_limit: usize,

    /// Passes that should not run.
    #[serde(default)]
    pub disabled_passes: Vec<Pass>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            settle_frames: default_settle_frames(),
            resident_sample_limit: default_resident_sample_limit(),
            similar_name_limit: default_similar_name_limit(),
            disabled_passes: vec![],
        }
    }
}

impl Options {
    /// Attempts to parse the contents of `reader` to get an `Options` value.
    fn parse_json(reader: impl Read) -> Result<Options> {
        // Coerce with `?`.
        Ok(serde_json::from_reader(reader)?)
    }

    /// Looks for a settings file at `path` and loads it.
    fn load_from_file(path: &Path) -> Result<Option<Options>> {
        if !path.exists() {
            // This isn't an error, but we didn't find any settings.
            return Ok(None);
        }

        let file = File::open(path).wrap_err("failed to open settings file")?;

        Ok(Some(Options::parse_json(file).wrap_err("malformed settings file")?))
    }

    /// Either loads the settings from `path` or generates default values for them.
    pub fn load(path: impl AsRef<Path>) -> Options {
        match Options::load_from_file(path.as_ref()) {
            Ok(Some(options)) => return options,

            Ok(None) => log::info!("No settings file found. Defaults will be used."),

            Err(err) => {
                log::error!("Error loading settings file: {err:?}. Defaults will be used.")
            }
        };

        Options::default()
    }

    /// Saves the settings to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;

        Ok(())
    }

    pub fn is_enabled(&self, pass: Pass) -> bool {
        !self.disabled_passes.contains(&pass)
    }
}
