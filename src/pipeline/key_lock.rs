//! Per-document locking for ingestion and deletion
//!
//! Two layers:
//! 1. In-process key set - rejects a second task working on the same id
//! 2. Filesystem lock (optional) - rejects another process sharing the data dir

use super::fs_lock::FsLockGuard;
use crate::error::{RagError, Result};
use crate::types::DocumentId;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Registry of document ids currently being written
#[derive(Debug, Default, Clone)]
pub(crate) struct KeyLocks {
    active: Arc<Mutex<HashSet<DocumentId>>>,
    lock_dir: Option<PathBuf>,
}

/// Held while a document is being ingested or deleted
///
/// Dropping the guard releases both layers, including on early return or
/// cancellation of the owning future.
#[derive(Debug)]
pub(crate) struct KeyGuard {
    id: DocumentId,
    active: Arc<Mutex<HashSet<DocumentId>>>,
    _fs_lock: Option<FsLockGuard>,
}

impl KeyLocks {
    pub(crate) fn new(lock_dir: Option<PathBuf>) -> Self {
        Self {
            active: Arc::default(),
            lock_dir,
        }
    }

    /// Acquire the lock for `id` or fail with `RagError::Busy`
    pub(crate) async fn acquire(&self, id: &DocumentId) -> Result<KeyGuard> {
        {
            let mut active = self
                .active
                .lock()
                .map_err(|e| RagError::other(format!("Key lock poisoned: {}", e)))?;
            if !active.insert(id.clone()) {
                tracing::debug!("Document {} is already locked in this process", id);
                return Err(RagError::Busy(id.to_string()));
            }
        }

        // From here on the guard owns the key and releases it on any exit
        let mut guard = KeyGuard {
            id: id.clone(),
            active: self.active.clone(),
            _fs_lock: None,
        };

        if let Some(lock_dir) = self.lock_dir.clone() {
            let key = id.to_string();
            let fs_lock =
                tokio::task::spawn_blocking(move || FsLockGuard::try_acquire(&lock_dir, &key))
                    .await
                    .map_err(|e| RagError::other(format!("Lock task failed: {}", e)))??;

            match fs_lock {
                Some(lock) => guard._fs_lock = Some(lock),
                None => {
                    tracing::debug!("Document {} is locked by another process", id);
                    return Err(RagError::Busy(id.to_string()));
                }
            }
        }

        Ok(guard)
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self, id: &DocumentId) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(id))
            .unwrap_or(false)
    }
}

impl KeyGuard {
    /// The document this guard holds
    pub(crate) fn id(&self) -> &DocumentId {
        &self.id
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        let mut active = match self.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        };
        active.remove(&self.id);
    }
}
