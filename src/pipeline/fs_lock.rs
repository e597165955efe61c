//! Filesystem-based locking for cross-process coordination
//!
//! Uses flock() so two processes sharing a data directory never ingest the
//! same document at once. Complements the in-process key set in key_lock.rs.

use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lock file path for a document key inside `lock_dir`
fn lock_file_path(lock_dir: &Path, key: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    lock_dir.join(format!("{}.lock", &hash[..16]))
}

/// Guard that holds an exclusive filesystem lock
///
/// Released when dropped. If the process crashes the OS releases the flock.
#[derive(Debug)]
pub(crate) struct FsLockGuard {
    _file: File,
    path: PathBuf,
}

impl FsLockGuard {
    /// Try to acquire an exclusive lock for `key`, non-blocking
    ///
    /// Returns `Ok(None)` if another holder has the lock.
    pub(crate) fn try_acquire(lock_dir: &Path, key: &str) -> std::io::Result<Option<Self>> {
        let lock_path = lock_file_path(lock_dir, key);

        fs::create_dir_all(lock_dir)?;
        let file = File::create(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired filesystem lock for {} ({:?})", key, lock_path);
                Ok(Some(Self {
                    _file: file,
                    path: lock_path,
                }))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                tracing::debug!("Filesystem lock for {} is held elsewhere", key);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for FsLockGuard {
    fn drop(&mut self) {
        // Lock files are reused, only the flock is released
        tracing::debug!("Releasing filesystem lock {:?}", self.path);
    }
}
