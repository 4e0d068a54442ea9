//! Cross-process launch lock.
//!
//! A launch holds `&mut Registry` for its whole lifetime, which keeps edits
//! out within one process. `launch.lock` extends that to other `titan`
//! processes: structural edits (add / edit / remove) refuse to run while the
//! file exists. A file left behind by a process that is no longer running
//! is removed on the next check.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{io_err, RegistryError};
use crate::paths::{lock_path, titan_root};

/// Held for the duration of one launch; removes the lock file on drop.
#[derive(Debug)]
pub struct LaunchLock {
    path: PathBuf,
}

impl LaunchLock {
    /// Exclusively create `<home>/.titan/launch.lock` for `title`.
    pub fn acquire_at(home: &Path, title: &str) -> Result<Self, RegistryError> {
        let root = titan_root(home);
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        }
        Self::ensure_free_at(home)?;
        let path = lock_path(home);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let holder = Self::holder_at(home).unwrap_or_else(|| "unknown".to_owned());
                return Err(RegistryError::LaunchInProgress { holder, path });
            }
            Err(err) => return Err(io_err(&path, err)),
        };
        let stamp = format!(
            "pid={} entry={} since={}\n",
            std::process::id(),
            title,
            Utc::now().to_rfc3339()
        );
        file.write_all(stamp.as_bytes())
            .map_err(|e| io_err(&path, e))?;
        Ok(Self { path })
    }

    /// Contents of the lock file, if a launch currently holds it.
    pub fn holder_at(home: &Path) -> Option<String> {
        fs::read_to_string(lock_path(home))
            .ok()
            .map(|s| s.trim().to_owned())
    }

    /// Fail with `LaunchInProgress` if a running launch holds the lock.
    /// A lock whose `pid=` names a dead process is stale and gets removed.
    pub fn ensure_free_at(home: &Path) -> Result<(), RegistryError> {
        let path = lock_path(home);
        let Some(holder) = Self::holder_at(home) else {
            return Ok(());
        };
        match holder_pid(&holder) {
            Some(pid) if !pid_alive(pid) => {
                tracing::warn!(
                    path = %path.display(),
                    holder = %holder,
                    "removing stale launch lock",
                );
                match fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                    Err(err) => Err(io_err(&path, err)),
                }
            }
            _ => Err(RegistryError::LaunchInProgress { holder, path }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn holder_pid(holder: &str) -> Option<i32> {
    holder
        .split_whitespace()
        .find_map(|field| field.strip_prefix("pid="))
        .and_then(|pid| pid.parse().ok())
}

#[cfg(unix)]
fn pid_alive(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if pid <= 0 {
        return false;
    }
    // EPERM still means the process exists.
    !matches!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn pid_alive(_pid: i32) -> bool {
    true
}

impl Drop for LaunchLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
