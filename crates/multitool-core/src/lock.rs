//! Host-wide exclusive lock over a filesystem path.
//!
//! Two backends share one interface and are chosen once, at construction:
//!
//! - `Flock`: `flock(LOCK_EX | LOCK_NB)` on `<path>.lock`. The kernel drops the
//!   lock when the descriptor closes, so a crashed holder never wedges the host.
//! - `Directory`: atomic `mkdir(path)`, which succeeds for exactly one caller.
//!   Used where `flock` is unavailable.
//!
//! Acquisition polls every 50 ms until it succeeds or the timeout elapses.
//! Release is idempotent and also runs on drop.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{MultiToolError, Result};
use crate::paths;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const OWNER_FILE: &str = "owner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBackend {
    Flock,
    Directory,
}

impl LockBackend {
    /// Best primitive the current platform offers.
    pub fn native() -> Self {
        if cfg!(unix) {
            LockBackend::Flock
        } else {
            LockBackend::Directory
        }
    }
}

#[derive(Debug)]
enum Held {
    Nothing,
    File(File),
    Directory,
}

#[derive(Debug)]
pub struct FileLock {
    artifact: PathBuf,
    backend: LockBackend,
    held: Held,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(path, LockBackend::native())
    }

    pub fn with_backend(path: impl Into<PathBuf>, backend: LockBackend) -> Self {
        let path = path.into();
        let artifact = match backend {
            LockBackend::Flock => paths::lock_file_for(&path),
            LockBackend::Directory => path,
        };
        Self {
            artifact,
            backend,
            held: Held::Nothing,
        }
    }

    /// The file or directory that represents the lock on disk.
    pub fn path(&self) -> &Path {
        &self.artifact
    }

    pub fn backend(&self) -> LockBackend {
        self.backend
    }

    pub fn is_held(&self) -> bool {
        !matches!(self.held, Held::Nothing)
    }

    /// Block until the lock is ours or `timeout` elapses.
    ///
    /// At least one attempt is made even with a zero timeout. Calling this on
    /// an instance that already holds the lock returns immediately.
    pub fn acquire(&mut self, timeout: Duration) -> Result<()> {
        if self.is_held() {
            return Ok(());
        }
        let start = Instant::now();
        loop {
            if self.try_acquire()? {
                debug!(path = %self.artifact.display(), waited_ms = start.elapsed().as_millis() as u64, "lock acquired");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(MultiToolError::LockTimeout {
                    path: self.artifact.clone(),
                    timeout,
                    holder: self.read_holder(),
                });
            }
            debug!(path = %self.artifact.display(), "lock busy, polling");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Single non-blocking attempt. `Ok(false)` means someone else holds it.
    pub fn try_acquire(&mut self) -> Result<bool> {
        if self.is_held() {
            return Ok(true);
        }
        let held = match self.backend {
            LockBackend::Flock => self.try_flock()?,
            LockBackend::Directory => self.try_mkdir()?,
        };
        if let Some(held) = held {
            self.held = held;
            self.write_owner();
            return Ok(true);
        }
        Ok(false)
    }

    /// Give the lock up. A no-op when nothing is held.
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.held, Held::Nothing) {
            Held::Nothing => {}
            Held::File(file) => {
                let _ = file.set_len(0);
                let _ = unlock_file(&file);
                drop(file);
                debug!(path = %self.artifact.display(), "lock released");
            }
            Held::Directory => {
                let _ = std::fs::remove_file(self.artifact.join(OWNER_FILE));
                let _ = std::fs::remove_dir(&self.artifact);
                debug!(path = %self.artifact.display(), "lock released");
            }
        }
    }

    fn try_flock(&self) -> Result<Option<Held>> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.artifact)?;
        if try_lock_file(&file)? {
            Ok(Some(Held::File(file)))
        } else {
            Ok(None)
        }
    }

    fn try_mkdir(&self) -> Result<Option<Held>> {
        match std::fs::create_dir(&self.artifact) {
            Ok(()) => Ok(Some(Held::Directory)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record who holds the lock. Best effort: the lock is already ours.
    fn write_owner(&mut self) {
        let record = format!(
            "pid={} acquired_at={}\n",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );
        let written = match &mut self.held {
            Held::Nothing => Ok(()),
            Held::File(file) => file
                .set_len(0)
                .and_then(|_| file.seek(SeekFrom::Start(0)))
                .and_then(|_| file.write_all(record.as_bytes())),
            Held::Directory => std::fs::write(self.artifact.join(OWNER_FILE), record),
        };
        if let Err(e) = written {
            debug!(path = %self.artifact.display(), error = %e, "could not record lock owner");
        }
    }

    fn read_holder(&self) -> Option<String> {
        let source = match self.backend {
            LockBackend::Flock => self.artifact.clone(),
            LockBackend::Directory => self.artifact.join(OWNER_FILE),
        };
        let text = std::fs::read_to_string(source).ok()?;
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn try_lock_file(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor belongs to `file`, which outlives the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::Interrupted => Ok(false),
        _ => Err(err),
    }
}

#[cfg(not(unix))]
fn try_lock_file(_file: &File) -> std::io::Result<bool> {
    Err(std::io::Error::new(
        ErrorKind::Unsupported,
        "flock is not available on this platform",
    ))
}

#[cfg(unix)]
fn unlock_file(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: as in `try_lock_file`.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn unlock_file(_file: &File) -> std::io::Result<()> {
    Ok(())
}
