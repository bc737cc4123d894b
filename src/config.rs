//! Application configuration.
//!
//! The configuration is an optional JSON file, read from `--config <path>`
//! or `$XDG_CONFIG_HOME/wallcycle/config.json`.  It is only ever read;
//! wallcycle never writes it back.
//!
//! # Example
//!
//! ```json
//! {
//!   "setter": { "program": "feh", "args": ["--bg-scale"] },
//!   "interval_minutes": 5,
//!   "random_mode": "every_pass",
//!   "pid_file": "/tmp/wallcycle-1000.pid"
//! }
//! ```

use crate::order::RandomMode;
use crate::setter::{CommandSetter, DEFAULT_ARGS, DEFAULT_PROGRAM};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default display time per picture, in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;

/// Top-level configuration.
///
/// Every field is optional; a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External wallpaper command.
    pub setter: SetterConfig,

    /// Minutes per picture when `-t/--time` is not given.
    pub interval_minutes: u64,

    /// Shuffle behaviour when `-r/--random` is given.
    pub random_mode: RandomMode,

    /// Lock file location.  `None` means the per-user default.
    pub pid_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            setter: SetterConfig::default(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            random_mode: RandomMode::default(),
            pid_file: None,
        }
    }
}

/// The program run for every wallpaper change, and the arguments placed
/// before the picture path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SetterConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for SetterConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.into(),
            args: DEFAULT_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl SetterConfig {
    pub fn build(&self) -> CommandSetter {
        CommandSetter::new(self.program.clone(), self.args.clone())
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.interval_minutes == 0 {
            return Err(ConfigError(format!(
                "{}: interval_minutes must be at least 1",
                path.display()
            )));
        }
        if self.setter.program.trim().is_empty() {
            return Err(ConfigError(format!(
                "{}: setter.program must not be empty",
                path.display()
            )));
        }
        Ok(())
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
