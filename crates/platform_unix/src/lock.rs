//! Per-user single-instance lock.
//!
//! The first dock takes an exclusive `flock` on the lock file and writes its
//! PID into it. Later invocations find the lock held and read the PID to
//! talk to the running dock.

use crate::PlatformError;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::sys::signal::kill;
use nix::unistd::{Pid, Uid};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lock file location for the current user.
///
/// Lives in `$XDG_RUNTIME_DIR` when set, the system temp dir otherwise.
pub fn default_lock_path() -> PathBuf {
    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(std::env::temp_dir);
    dir.join(format!("hyprdock-{}.lock", Uid::current()))
}

/// Held lock. Released when dropped.
pub struct InstanceLock {
    path: PathBuf,
    _file: Flock<File>,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for InstanceLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceLock").field("path", &self.path).finish()
    }
}

/// Result of trying to become the only running dock.
#[derive(Debug)]
pub enum LockOutcome {
    /// This process owns the lock now.
    Acquired(InstanceLock),
    /// Another live process owns it; its PID, if readable.
    HeldBy(Option<i32>),
}

impl LockOutcome {
    /// Try to take the lock at `path`.
    pub fn acquire(path: &Path) -> Result<Self, PlatformError> {
        let lock_err = |source| PlatformError::Lock {
            path: path.to_path_buf(),
            source,
        };

        // No truncation here: the file may hold the running owner's PID.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(lock_err)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(locked) => {
                let mut writer: &File = &locked;
                writer.set_len(0).map_err(lock_err)?;
                writer
                    .write_all(format!("{}\n", std::process::id()).as_bytes())
                    .map_err(lock_err)?;
                debug!("Acquired instance lock {}", path.display());
                Ok(Self::Acquired(InstanceLock {
                    path: path.to_path_buf(),
                    _file: locked,
                }))
            }
            Err((_, Errno::EWOULDBLOCK)) => {
                let owner = read_owner_pid(path).filter(|pid| is_alive(*pid));
                debug!("Instance lock {} held by {:?}", path.display(), owner);
                Ok(Self::HeldBy(owner))
            }
            Err((_, errno)) => Err(lock_err(std::io::Error::from(errno))),
        }
    }
}

/// PID recorded in the lock file.
pub fn read_owner_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path)
        .ok()?
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|pid| *pid > 0)
}

/// Whether a process with this PID exists.
pub fn is_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        // Exists, but belongs to someone else.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
