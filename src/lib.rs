//! **wallcycle** — rotate desktop wallpapers from a directory.
//!
//! Pictures are scanned once from a directory, ordered (as listed, shuffled
//! once, or reshuffled every pass) and handed one by one to an external
//! wallpaper tool, with a fixed display interval per picture.  A PID-file
//! guard keeps a second instance from running at the same time.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::WallpaperSetter`] — abstracts the external tool so the
//!   rotation loop is not coupled to `feh` or any other program.
//! * [`traits::ProcessProbe`] — abstracts the liveness check used by the
//!   instance guard so stale lock files can be detected portably.
//!
//! Concrete implementations live in [`setter`] (child process) and
//! [`guard`] (signal-0 probe).  [`session::rotate_exclusive`] ties the
//! guard and the rotation loop together.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod guard;
pub mod order;
pub mod rotation;
pub mod scanner;
pub mod session;
pub mod setter;
pub mod traits;
