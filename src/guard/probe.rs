//! [`ProcessProbe`] implementation using the signal-0 convention.

use crate::traits::ProcessProbe;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Probes liveness with `kill(pid, 0)`.
///
/// No signal is delivered.  `EPERM` means the process exists but belongs to
/// someone else, which still counts as alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalProbe;

impl ProcessProbe for SignalProbe {
    fn is_alive(&self, pid: i32) -> bool {
        // 0 and negative ids address process groups, never a single process.
        if pid <= 0 {
            return false;
        }
        match kill(Pid::from_raw(pid), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}
