//! Single-instance guard.
//!
//! Only one wallcycle may rotate wallpapers per user.  The guard is a PID
//! file whose owner is checked with a [`ProcessProbe`](crate::traits::ProcessProbe),
//! so a file left behind by a crashed instance is taken over instead of
//! blocking every later start.
//!
//! Nothing outside this module should touch the PID file directly.

pub mod pidfile;
pub mod probe;

pub use pidfile::{default_pid_path, Acquire, GuardError, PidFileGuard};
pub use probe::SignalProbe;
