//! Single-run locks.
//!
//! Two workflows racing each other could both decide the labeled instance
//! is missing and create it twice, so only one workflow may run at a time.
//! Requests that arrive while a run is in flight are rejected, not queued.
//!
//! [`RunLock`] covers runs inside one process. [`FileLock`] covers separate
//! `mcgov` invocations through an advisory lock on a shared file.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::{GovernorError, Result};

static GLOBAL: RunLock = RunLock::new();

/// Non-blocking exclusive lock around workflow runs.
#[derive(Debug)]
pub struct RunLock {
    busy: AtomicBool,
}

impl RunLock {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// The lock shared by the whole process.
    pub fn global() -> &'static RunLock {
        &GLOBAL
    }

    /// Take the lock, or fail with [`GovernorError::Busy`] if it is held.
    ///
    /// The lock is released when the returned guard drops, whether the run
    /// succeeded, failed, or panicked.
    pub fn try_acquire(&self) -> Result<RunGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("Run lock is held, rejecting request");
            return Err(GovernorError::Busy);
        }
        Ok(RunGuard { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `f` while holding the lock.
    pub fn run_exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.try_acquire()?;
        f()
    }
}

impl Default for RunLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a [`RunLock`] until dropped.
#[derive(Debug)]
pub struct RunGuard<'a> {
    lock: &'a RunLock,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
    }
}

/// Advisory lock on a file, shared by every process that opens the same path.
pub struct FileLock {
    path: PathBuf,
    lock: fd_lock::RwLock<File>,
}

impl FileLock {
    /// Open (creating if needed) the lock file at `path`. The lock is not
    /// taken until [`FileLock::run_exclusive`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            path,
            lock: fd_lock::RwLock::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` while holding the file lock, or fail with
    /// [`GovernorError::Busy`] if another handle holds it.
    pub fn run_exclusive<T>(&mut self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = match self.lock.try_write() {
            Ok(guard) => guard,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                debug!("Lock file {} is held, rejecting request", self.path.display());
                return Err(GovernorError::Busy);
            }
            Err(e) => return Err(e.into()),
        };
        debug!("Holding lock file {}", self.path.display());
        f()
    }
}
