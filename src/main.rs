//! Entry point for the **wallcycle** binary.
//!
//! Scans the picture directory, installs the interrupt handler and runs an
//! exclusive rotation session on the main thread.  The session releases the
//! single-instance lock on every way out of the loop before the process
//! exits.

use clap::Parser as _;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wallcycle::cancel::CancelToken;
use wallcycle::cli::Cli;
use wallcycle::config::{Config, ConfigError};
use wallcycle::guard::{default_pid_path, SignalProbe};
use wallcycle::order::{OrderPolicy, Playlist};
use wallcycle::rotation::{RotationError, Rotator};
use wallcycle::scanner;
use wallcycle::session::{self, Outcome, SessionError};

/// Fatal errors that end the process with a non-zero status.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot scan {}: {source}", .dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/wallcycle`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("wallcycle")
}

/// Load the config from `--config` if given, otherwise from the default
/// location, falling back to compiled-in defaults when that file is absent.
fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        let cfg = Config::load(path)?;
        info!("loaded config from {}", path.display());
        return Ok(cfg);
    }

    let path = config_dir().join("config.json");
    if !path.exists() {
        debug!("no config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let cfg = Config::load(&path)?;
    info!("loaded config from {}", path.display());
    Ok(cfg)
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    debug!("{:?}", cli);

    // `run` has returned, so the lock is already released here.
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = load_config(cli.config.as_deref())?;

    let pictures = scanner::scan(&cli.directory).map_err(|source| AppError::Scan {
        dir: cli.directory.clone(),
        source,
    })?;
    if pictures.is_empty() {
        return Err(RotationError::NoPictures.into());
    }

    // Installed before the lock is taken so no interrupt can slip past it.
    let token = CancelToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || token.cancel())?;
    }

    let minutes = cli.time.unwrap_or(config.interval_minutes);
    let interval = Duration::from_secs(minutes.saturating_mul(60));
    let policy = OrderPolicy::from_flags(cli.random, config.random_mode);

    let mut playlist = Playlist::new(policy, pictures);
    let mut rotator = Rotator::new(config.setter.build(), interval, rand::rng());
    let pid_path = config.pid_file.clone().unwrap_or_else(default_pid_path);

    match session::rotate_exclusive(&pid_path, &SignalProbe, &mut rotator, &mut playlist, &token)? {
        Outcome::AlreadyRunning(_) => println!("Program already running. Exiting now..."),
        Outcome::Stopped { .. } => println!("\rClosing now..."),
    }
    Ok(())
}
