//! Single-instance guard for a data directory.
//!
//! sled refuses a second opener of the same database, but it does so with an
//! opaque I/O error halfway through startup. The lock file turns that into a
//! clear message before anything is opened.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const LOCK_FILE_NAME: &str = ".rf-sentinel.lock";

#[derive(Debug, Error)]
pub enum LockError {
    #[error(
        "another rf-sentinel instance is running (PID {pid}); \
         stop it or remove the stale lock file {}",
        path.display()
    )]
    Held { pid: u32, path: PathBuf },

    #[error("lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// PID lock file held for the life of the value.
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
    owned: bool,
}

impl ProcessLock {
    /// Take the lock for `data_dir`, creating the directory if needed.
    ///
    /// A lock left by a process that is no longer running is replaced.
    pub fn acquire<P: AsRef<Path>>(data_dir: P) -> Result<Self, LockError> {
        let data_dir = data_dir.as_ref();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| LockError::Io { path, source }
        };

        fs::create_dir_all(data_dir).map_err(io_err(data_dir))?;
        let path = data_dir.join(LOCK_FILE_NAME);

        match Self::holder(&path) {
            Some(pid) if pid != std::process::id() && is_sentinel_process(pid) => {
                return Err(LockError::Held { pid, path });
            }
            Some(_) => {
                info!(path = %path.display(), "Replacing stale lock file");
            }
            None => {}
        }

        let pid = std::process::id();
        fs::write(&path, format!("{pid}\n")).map_err(io_err(&path))?;
        debug!(pid, path = %path.display(), "Acquired process lock");

        Ok(Self { path, owned: true })
    }

    /// PID recorded in an existing lock file. Unreadable or garbled files
    /// count as no holder.
    fn holder(path: &Path) -> Option<u32> {
        let contents = fs::read_to_string(path).ok()?;
        match contents.trim().parse() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparseable lock file");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(&mut self) {
        if !self.owned {
            return;
        }
        self.owned = false;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Released process lock"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove lock file"),
        }
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn is_sentinel_process(pid: u32) -> bool {
    fs::read_to_string(format!("/proc/{pid}/cmdline"))
        .is_ok_and(|cmdline| cmdline.contains("rf-sentinel") || cmdline.contains("rf_sentinel"))
}

#[cfg(not(unix))]
fn is_sentinel_process(_pid: u32) -> bool {
    true
}
