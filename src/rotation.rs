//! The rotation loop.
//!
//! For every picture of every pass the [`Rotator`] records a monotonic start
//! time, hands the picture to its [`WallpaperSetter`], and then waits for the
//! rest of the display interval.  Time spent inside the setter counts toward
//! the interval; when the setter takes longer than the whole interval the
//! next picture follows immediately.
//!
//! The loop never ends on its own.  It returns when the [`CancelToken`] is
//! cancelled (checked before each picture and throughout every wait) or when
//! the setter fails.

use crate::cancel::CancelToken;
use crate::order::Playlist;
use crate::traits::WallpaperSetter;
use log::{info, warn};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Errors that stop the rotation.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    /// The playlist has nothing to show.
    #[error("no pictures to rotate")]
    NoPictures,
    /// The wallpaper setter failed for a picture.
    #[error("failed to set {}: {message}", .picture.display())]
    Setter { picture: PathBuf, message: String },
}

/// Time left to wait after the setter took `elapsed` out of `interval`.
///
/// Clamped at zero when the setter overran the interval.
pub fn sleep_after(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Drives a [`WallpaperSetter`] through a [`Playlist`] at a fixed interval.
pub struct Rotator<S, R> {
    setter: S,
    interval: Duration,
    rng: R,
}

impl<S: WallpaperSetter, R: Rng> Rotator<S, R> {
    pub fn new(setter: S, interval: Duration, rng: R) -> Self {
        Self {
            setter,
            interval,
            rng,
        }
    }

    pub fn setter(&self) -> &S {
        &self.setter
    }

    /// Rotate until `token` is cancelled.
    ///
    /// Returns the number of wallpapers shown.  Only cancellation ends the
    /// loop successfully; a setter failure ends it with an error.
    pub fn run(&mut self, playlist: &mut Playlist, token: &CancelToken) -> Result<u64, RotationError> {
        if playlist.is_empty() {
            return Err(RotationError::NoPictures);
        }
        info!(
            "rotating {} picture(s) every {:?} ({:?})",
            playlist.len(),
            self.interval,
            playlist.policy()
        );

        let mut shown = 0;
        loop {
            let pass = playlist.next_pass(&mut self.rng);
            for picture in pass {
                if token.is_cancelled() {
                    return Ok(shown);
                }

                let start = Instant::now();
                if let Err(e) = self.show(picture) {
                    // Ctrl-C reaches the whole process group, so the setter
                    // usually dies with us.
                    if token.is_cancelled() {
                        info!("interrupted while setting {}", picture.display());
                        return Ok(shown);
                    }
                    return Err(e);
                }
                shown += 1;
                let elapsed = start.elapsed();

                let pause = sleep_after(self.interval, elapsed);
                if elapsed > self.interval {
                    warn!(
                        "setting {} took {:?}, {:?} over the interval",
                        picture.display(),
                        elapsed,
                        elapsed - self.interval
                    );
                }
                if token.wait_timeout(pause) {
                    return Ok(shown);
                }
            }
        }
    }

    fn show(&mut self, picture: &Path) -> Result<(), RotationError> {
        info!("wallpaper: {}", picture.display());
        self.setter
            .set_wallpaper(picture)
            .map_err(|e| RotationError::Setter {
                picture: picture.to_path_buf(),
                message: e.to_string(),
            })
    }
}
