//! Core traits that decouple wallcycle from any specific wallpaper tool or
//! operating-system process API.
//!
//! The [`Rotator`](crate::rotation::Rotator) only depends on
//! [`WallpaperSetter`], and the [`PidFileGuard`](crate::guard::PidFileGuard)
//! only depends on [`ProcessProbe`].  Tests substitute recording doubles for
//! both.

use std::path::Path;

/// Abstraction over an external tool that sets the desktop wallpaper.
///
/// An implementation might shell out to `feh`, or it might be a stub that
/// records every call in tests.
pub trait WallpaperSetter {
    /// The error type produced by this setter.
    type Error: std::error::Error + Send + 'static;

    /// Set `picture` (an absolute path) as the wallpaper.
    ///
    /// This call **blocks** until the wallpaper has been applied.
    fn set_wallpaper(&mut self, picture: &Path) -> Result<(), Self::Error>;
}

/// Capability to ask whether a process id belongs to a running process.
///
/// On Unix this is the signal-0 convention; other platforms would plug in
/// their own adapter here.
pub trait ProcessProbe {
    /// Return `true` if `pid` currently names a live process.
    fn is_alive(&self, pid: i32) -> bool;
}
