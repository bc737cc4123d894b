//! One exclusive rotation session.
//!
//! [`rotate_exclusive`] takes the PID-file lock, runs the rotation loop and
//! lets the guard go on every way out, so a failing setter or an interrupt
//! never leaves the lock behind.  A second instance returns without touching
//! the setter or the holder's file.

use crate::cancel::CancelToken;
use crate::guard::{Acquire, GuardError, PidFileGuard};
use crate::order::Playlist;
use crate::rotation::{RotationError, Rotator};
use crate::traits::{ProcessProbe, WallpaperSetter};
use log::{debug, info};
use rand::Rng;
use std::path::Path;

/// How a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The loop ran until cancelled.
    Stopped { shown: u64 },
    /// Another instance holds the lock.  Carries its pid when known.
    AlreadyRunning(Option<i32>),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

/// Rotate `playlist` while holding the lock at `pid_path`.
pub fn rotate_exclusive<S: WallpaperSetter, R: Rng>(
    pid_path: &Path,
    probe: &dyn ProcessProbe,
    rotator: &mut Rotator<S, R>,
    playlist: &mut Playlist,
    token: &CancelToken,
) -> Result<Outcome, SessionError> {
    let _guard = match PidFileGuard::acquire(pid_path, probe)? {
        Acquire::Acquired(guard) => guard,
        Acquire::AlreadyRunning(pid) => {
            debug!("instance {:?} holds {}", pid, pid_path.display());
            return Ok(Outcome::AlreadyRunning(pid));
        }
    };

    let shown = rotator.run(playlist, token)?;
    info!("stopped after {} wallpaper change(s)", shown);
    Ok(Outcome::Stopped { shown })
}
