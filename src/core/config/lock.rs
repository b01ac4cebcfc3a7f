//! core::config::lock
//!
//! Exclusive lock around writes to the persisted document.
//!
//! # Storage
//!
//! - `<config file>.lock` next to the document, holding an OS-level
//!   exclusive lock
//!
//! # Invariants
//!
//! - The lock is held for the whole read-modify-write of the document
//! - The lock is released on drop, on every exit path including panics

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use super::ConfigError;

/// Default timeout for lock acquisition (10 seconds).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Polling interval when waiting for lock (100ms).
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An exclusive lock on a config document.
///
/// Released when dropped.
#[derive(Debug)]
pub struct ConfigLock {
    path: PathBuf,
    file: Option<File>,
}

impl ConfigLock {
    /// Lock file path for a config document: `config.yaml` → `config.yaml.lock`.
    pub fn lock_path(config_path: &Path) -> PathBuf {
        let mut name = config_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "config.yaml".into());
        name.push(".lock");
        config_path.with_file_name(name)
    }

    /// Acquire the lock, polling until `timeout` expires.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::LockTimeout`] if another process holds the lock past the deadline
    /// - [`ConfigError::Lock`] on I/O failure
    pub fn acquire(config_path: &Path, timeout: Duration) -> Result<Self, ConfigError> {
        let path = Self::lock_path(config_path);
        let deadline = Instant::now() + timeout;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Lock(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        loop {
            match Self::try_acquire_at(&path)? {
                Some(lock) => return Ok(lock),
                None => {
                    if Instant::now() >= deadline {
                        return Err(ConfigError::LockTimeout(path));
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
            }
        }
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `Ok(None)` if another holder has it.
    pub fn try_acquire(config_path: &Path) -> Result<Option<Self>, ConfigError> {
        let path = Self::lock_path(config_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Lock(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        Self::try_acquire_at(&path)
    }

    fn try_acquire_at(path: &Path) -> Result<Option<Self>, ConfigError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| ConfigError::Lock(format!("cannot open {}: {}", path.display(), e)))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                file: Some(file),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(ConfigError::Lock(format!("lock failed: {}", e))),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_path_sits_next_to_document() {
        let path = ConfigLock::lock_path(Path::new("/tmp/doctl/config.yaml"));
        assert_eq!(path, PathBuf::from("/tmp/doctl/config.yaml.lock"));
    }

    #[test]
    fn acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.yaml");

        {
            let lock = ConfigLock::acquire(&config, DEFAULT_LOCK_TIMEOUT).unwrap();
            assert!(lock.is_held());
            assert!(lock.path().exists());
        }

        let again = ConfigLock::try_acquire(&config).unwrap();
        assert!(again.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn contended_lock_times_out() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.yaml");
        let lock_path = ConfigLock::lock_path(&config);

        // A separate handle on the same file holds the lock.
        let holder = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .unwrap();
        holder.lock_exclusive().unwrap();

        // flock contends across open file descriptions, even within one process.
        let err = ConfigLock::acquire(&config, Duration::from_millis(250)).unwrap_err();
        assert!(matches!(err, ConfigError::LockTimeout(ref p) if *p == lock_path));
        assert!(ConfigLock::try_acquire(&config).unwrap().is_none());

        holder.unlock().unwrap();
    }

    #[test]
    fn default_timeout_is_reasonable() {
        assert!(DEFAULT_LOCK_TIMEOUT >= Duration::from_secs(5));
        assert!(DEFAULT_LOCK_TIMEOUT <= Duration::from_secs(60));
    }
}
