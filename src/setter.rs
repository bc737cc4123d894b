//! [`WallpaperSetter`] implementation that runs an external command.
//!
//! The command line is `<program> <args...> <picture>`; with the defaults
//! that is `feh --bg-scale /abs/path/to/picture.jpg`.  Output is not parsed.

use crate::traits::WallpaperSetter;
use log::debug;
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Default wallpaper tool.
pub const DEFAULT_PROGRAM: &str = "feh";

/// Arguments placed before the picture path for [`DEFAULT_PROGRAM`].
pub const DEFAULT_ARGS: [&str; 1] = ["--bg-scale"];

/// Runs an external program synchronously for every wallpaper change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSetter {
    program: String,
    args: Vec<String>,
}

/// Errors produced while running the wallpaper command.
#[derive(Debug, thiserror::Error)]
pub enum SetterError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status} for {picture}")]
    Failed {
        program: String,
        status: ExitStatus,
        picture: String,
    },
}

impl Default for CommandSetter {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROGRAM,
            DEFAULT_ARGS.iter().map(|a| a.to_string()).collect(),
        )
    }
}

impl CommandSetter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl WallpaperSetter for CommandSetter {
    type Error = SetterError;

    fn set_wallpaper(&mut self, picture: &Path) -> Result<(), SetterError> {
        debug!("running {} {:?} {}", self.program, self.args, picture.display());
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(picture)
            .status()
            .map_err(|source| SetterError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SetterError::Failed {
                program: self.program.clone(),
                status,
                picture: picture.display().to_string(),
            })
        }
    }
}
