//! PID-file lock.
//!
//! # File format
//!
//! The file holds the owner's process id as decimal text followed by `\n`:
//!
//! ```text
//! 12345
//! ```
//!
//! # Protocol
//!
//! A fresh file is written under a scratch name and hard-linked into place,
//! so it appears with its contents already complete and only one of several
//! racing instances can create it.  When the file already exists, it is
//! opened (never through a symlink) and locked with a non-blocking `flock`
//! before its contents are judged.  Whoever holds that lock is the only one
//! allowed to rewrite a stale file; an instance that finds the lock taken
//! backs off as "already running".

use crate::traits::ProcessProbe;
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// Attempts before giving up on a file that keeps being replaced under us.
const ATTEMPTS: usize = 3;

/// Default lock location, scoped by user id so users do not collide.
pub fn default_pid_path() -> PathBuf {
    let uid = nix::unistd::getuid().as_raw();
    PathBuf::from(format!("/tmp/wallcycle-{}.pid", uid))
}

/// Outcome of [`PidFileGuard::acquire`].
#[derive(Debug)]
pub enum Acquire {
    /// The lock is ours until the guard is dropped.
    Acquired(PidFileGuard),
    /// Another instance holds the lock.  Carries its pid when the file could
    /// be read.
    AlreadyRunning(Option<i32>),
}

/// Errors produced while reading or writing the PID file.
#[derive(Debug, thiserror::Error)]
#[error("pid file {}: {source}", .path.display())]
pub struct GuardError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

/// Holds the PID file for as long as it lives.
///
/// Dropping the guard deletes the file, but only if it still names the
/// owning process.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,
    pid: u32,
}

/// Parse the stored pid, treating anything that is not a positive integer
/// as absent.
fn parse_pid(contents: &str) -> Option<i32> {
    contents.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}

fn read_pid(path: &Path) -> Option<i32> {
    fs::read(path)
        .ok()
        .and_then(|bytes| parse_pid(&String::from_utf8_lossy(&bytes)))
}

fn read_open_pid(file: &mut File) -> io::Result<Option<i32>> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;
    Ok(parse_pid(&String::from_utf8_lossy(&bytes)))
}

fn write_pid(file: &mut File, pid: u32) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", pid)?;
    file.sync_all()
}

/// Open an existing pid file for reading and writing, refusing symlinks.
fn open_existing(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(nix::libc::O_NOFOLLOW)
        .open(path)
}

/// Try to take an exclusive, non-blocking `flock`.  `Ok(None)` means another
/// open description holds it.
fn try_lock(file: File) -> io::Result<Option<Flock<File>>> {
    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(locked) => Ok(Some(locked)),
        Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
        Err((_, errno)) => Err(errno.into()),
    }
}

/// `true` if `path` still names the inode behind `file`.
fn still_linked(file: &File, path: &Path) -> io::Result<bool> {
    let open = file.metadata()?;
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(meta.dev() == open.dev() && meta.ino() == open.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn scratch_path(path: &Path, pid: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.tmp", pid));
    PathBuf::from(name)
}

/// Create `path` holding `pid`.  Returns `false` if it already exists.
fn publish(path: &Path, pid: u32) -> io::Result<bool> {
    let scratch = scratch_path(path, pid);
    match fs::remove_file(&scratch) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    let created = link_scratch(&scratch, path, pid);
    let _ = fs::remove_file(&scratch);
    created
}

fn link_scratch(scratch: &Path, path: &Path, pid: u32) -> io::Result<bool> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(scratch)?;
    write_pid(&mut file, pid)?;
    match fs::hard_link(scratch, path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

impl PidFileGuard {
    /// Acquire the lock at `path` for the current process.
    pub fn acquire(path: impl AsRef<Path>, probe: &dyn ProcessProbe) -> Result<Acquire, GuardError> {
        Self::acquire_for(path, std::process::id(), probe)
    }

    /// Acquire the lock at `path` on behalf of `pid`.
    ///
    /// A stored id equal to `pid` is considered stale: it can only be left
    /// over from a crashed process whose id was later reused.
    pub fn acquire_for(
        path: impl AsRef<Path>,
        pid: u32,
        probe: &dyn ProcessProbe,
    ) -> Result<Acquire, GuardError> {
        let path = path.as_ref();
        let fail = |source| GuardError {
            path: path.to_path_buf(),
            source,
        };

        for _ in 0..ATTEMPTS {
            if publish(path, pid).map_err(fail)? {
                debug!("wrote pid {} to {}", pid, path.display());
                return Ok(Acquire::Acquired(PidFileGuard {
                    path: path.to_path_buf(),
                    pid,
                }));
            }
            if let Some(outcome) = Self::take_over(path, pid, probe).map_err(fail)? {
                return Ok(outcome);
            }
            debug!("pid file {} replaced while inspecting it, retrying", path.display());
        }

        Err(fail(io::Error::other("pid file keeps changing")))
    }

    /// Judge an existing pid file.  `Ok(None)` means it vanished or was
    /// replaced and the caller should start over.
    fn take_over(path: &Path, pid: u32, probe: &dyn ProcessProbe) -> io::Result<Option<Acquire>> {
        let file = match open_existing(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(mut locked) = try_lock(file)? else {
            let holder = read_pid(path);
            info!("pid file {} is being claimed by another instance", path.display());
            return Ok(Some(Acquire::AlreadyRunning(holder)));
        };
        if !still_linked(&locked, path)? {
            return Ok(None);
        }

        match read_open_pid(&mut locked)? {
            Some(holder) if holder as u32 != pid && probe.is_alive(holder) => {
                info!("pid file {} held by live process {}", path.display(), holder);
                return Ok(Some(Acquire::AlreadyRunning(Some(holder))));
            }
            Some(holder) => {
                info!("taking over stale pid file {} (pid {})", path.display(), holder)
            }
            None => warn!("taking over malformed pid file {}", path.display()),
        }

        write_pid(&mut locked, pid)?;
        debug!("wrote pid {} to {}", pid, path.display());
        Ok(Some(Acquire::Acquired(PidFileGuard {
            path: path.to_path_buf(),
            pid,
        })))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let locked = match open_existing(&self.path).and_then(try_lock) {
            Ok(Some(locked)) => locked,
            Ok(None) => {
                warn!("pid file {} is locked by another instance, leaving it", self.path.display());
                return;
            }
            Err(e) => {
                warn!("cannot inspect pid file {}: {}", self.path.display(), e);
                return;
            }
        };

        let owner = read_pid(&self.path);
        if owner != Some(self.pid as i32) {
            warn!(
                "pid file {} no longer ours ({:?}), leaving it",
                self.path.display(),
                owner
            );
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed pid file {}", self.path.display()),
            Err(e) => warn!("failed to remove pid file {}: {}", self.path.display(), e),
        }
        drop(locked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::SignalProbe;
    use std::cell::RefCell;

    /// A probe that gives the same answer for every pid.
    struct FixedProbe(bool);

    impl ProcessProbe for FixedProbe {
        fn is_alive(&self, _pid: i32) -> bool {
            self.0
        }
    }

    /// Every pid is alive except one.
    struct AllAliveBut(i32);

    impl ProcessProbe for AllAliveBut {
        fn is_alive(&self, pid: i32) -> bool {
            pid != self.0
        }
    }

    /// Reports every pid dead, but runs a rival acquire the first time it is
    /// asked, so the rival races the instance doing the check.
    struct RivalDuringCheck {
        path: PathBuf,
        rival_pid: u32,
        rival: RefCell<Option<Acquire>>,
    }

    impl ProcessProbe for RivalDuringCheck {
        fn is_alive(&self, _pid: i32) -> bool {
            let first = self.rival.borrow().is_none();
            if first {
                let outcome =
                    PidFileGuard::acquire_for(&self.path, self.rival_pid, &FixedProbe(false)).unwrap();
                *self.rival.borrow_mut() = Some(outcome);
            }
            false
        }
    }

    fn expect_acquired(result: Acquire) -> PidFileGuard {
        match result {
            Acquire::Acquired(guard) => guard,
            Acquire::AlreadyRunning(pid) => panic!("unexpectedly held by {pid:?}"),
        }
    }

    #[test]
    fn parse_pid_rejects_garbage() {
        assert_eq!(parse_pid("123\n"), Some(123));
        assert_eq!(parse_pid("  77 "), Some(77));
        assert_eq!(parse_pid(""), None);
        assert_eq!(parse_pid("abc"), None);
        assert_eq!(parse_pid("0"), None);
        assert_eq!(parse_pid("-5"), None);
    }

    #[test]
    fn default_path_is_scoped_by_uid() {
        let uid = nix::unistd::getuid().as_raw();
        let path = default_pid_path();
        assert!(path.starts_with("/tmp"));
        assert!(path.to_string_lossy().contains(&format!("-{uid}.pid")));
    }

    #[test]
    fn acquire_without_file_writes_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");

        let guard = expect_acquired(PidFileGuard::acquire_for(&path, 4242, &FixedProbe(false)).unwrap());
        assert_eq!(guard.pid(), 4242);
        assert_eq!(fs::read_to_string(&path).unwrap(), "4242\n");
        assert!(!scratch_path(&path, 4242).exists());

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn second_instance_is_refused_and_lock_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");

        let first = expect_acquired(PidFileGuard::acquire_for(&path, 4242, &FixedProbe(false)).unwrap());

        match PidFileGuard::acquire_for(&path, 4343, &FixedProbe(true)).unwrap() {
            Acquire::AlreadyRunning(pid) => assert_eq!(pid, Some(4242)),
            Acquire::Acquired(_) => panic!("second instance acquired the lock"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "4242\n");

        drop(first);
        assert!(!path.exists());
    }

    #[test]
    fn stale_file_after_crash_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");

        // Simulated crash: the guard never runs its destructor.
        let crashed = expect_acquired(PidFileGuard::acquire_for(&path, 4242, &FixedProbe(false)).unwrap());
        std::mem::forget(crashed);
        assert!(path.exists());

        let guard = expect_acquired(PidFileGuard::acquire_for(&path, 5555, &FixedProbe(false)).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "5555\n");
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn rival_during_stale_check_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");
        fs::write(&path, "777\n").unwrap();

        let probe = RivalDuringCheck {
            path: path.clone(),
            rival_pid: 999,
            rival: RefCell::new(None),
        };
        let guard = expect_acquired(PidFileGuard::acquire_for(&path, 888, &probe).unwrap());

        match probe.rival.into_inner() {
            Some(Acquire::AlreadyRunning(_)) => {}
            Some(Acquire::Acquired(_)) => panic!("both instances acquired the lock"),
            None => panic!("rival never ran"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "888\n");

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_acquires_have_one_winner() {
        for stale in [false, true] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("w.pid");
            if stale {
                fs::write(&path, "777\n").unwrap();
            }

            let barrier = std::sync::Arc::new(std::sync::Barrier::new(8));
            let handles: Vec<_> = (0..8u32)
                .map(|i| {
                    let path = path.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        PidFileGuard::acquire_for(&path, 1000 + i, &AllAliveBut(777)).unwrap()
                    })
                })
                .collect();
            let outcomes: Vec<Acquire> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let winners: Vec<&PidFileGuard> = outcomes
                .iter()
                .filter_map(|o| match o {
                    Acquire::Acquired(guard) => Some(guard),
                    Acquire::AlreadyRunning(_) => None,
                })
                .collect();
            assert_eq!(winners.len(), 1, "stale={stale}");
            assert_eq!(
                fs::read_to_string(&path).unwrap(),
                format!("{}\n", winners[0].pid())
            );
        }
    }

    #[test]
    fn malformed_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");
        fs::write(&path, "not a pid").unwrap();

        let guard = expect_acquired(PidFileGuard::acquire_for(&path, 4242, &FixedProbe(true)).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "4242\n");
        drop(guard);
    }

    #[test]
    fn own_pid_in_file_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");
        fs::write(&path, "4242\n").unwrap();

        let guard = expect_acquired(PidFileGuard::acquire_for(&path, 4242, &FixedProbe(true)).unwrap());
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn drop_leaves_file_owned_by_someone_else() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");

        let guard = expect_acquired(PidFileGuard::acquire_for(&path, 4242, &FixedProbe(false)).unwrap());
        fs::write(&path, "9999\n").unwrap();
        drop(guard);
        assert_eq!(fs::read_to_string(&path).unwrap(), "9999\n");
    }

    #[test]
    fn symlinked_pid_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("victim");
        fs::write(&target, "precious\n").unwrap();
        let path = dir.path().join("w.pid");
        std::os::unix::fs::symlink(&target, &path).unwrap();

        assert!(PidFileGuard::acquire_for(&path, 4242, &FixedProbe(false)).is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "precious\n");
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("w.pid");
        let err = PidFileGuard::acquire_for(&path, 4242, &FixedProbe(false)).unwrap_err();
        assert!(err.to_string().contains("w.pid"));
    }

    #[test]
    fn live_holder_detected_with_signal_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.pid");

        let mut holder = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let holder_pid = holder.id();
        fs::write(&path, format!("{holder_pid}\n")).unwrap();

        match PidFileGuard::acquire(&path, &SignalProbe).unwrap() {
            Acquire::AlreadyRunning(pid) => assert_eq!(pid, Some(holder_pid as i32)),
            Acquire::Acquired(_) => panic!("live holder was ignored"),
        }

        holder.kill().unwrap();
        holder.wait().unwrap();

        let guard = expect_acquired(PidFileGuard::acquire(&path, &SignalProbe).unwrap());
        assert_eq!(guard.pid(), std::process::id());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{}\n", std::process::id())
        );
    }
}
