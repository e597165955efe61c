use super::{IndexStore, decode, encode};
use crate::error::StoreError;
use crate::index::VectorIndex;
use crate::types::DocumentId;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const INDEX_SUFFIX: &str = ".index.json";

/// Stores one file per document: `<root>/<id>.index.json`
///
/// Writes go to a hidden temporary file in the same directory which is
/// fsynced and then renamed over the final name.
#[derive(Debug, Clone)]
pub struct FsIndexStore {
    root: PathBuf,
}

/// Removes a temporary file unless it was published
struct TempFileGuard {
    path: PathBuf,
    published: bool,
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.published
            && let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!("Failed to remove temporary index file {:?}: {}", self.path, e);
        }
    }
}

impl FsIndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the index file for `id`
    pub fn index_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}{}", id, INDEX_SUFFIX))
    }

    fn io_error(action: &'static str, id: &DocumentId, source: std::io::Error) -> StoreError {
        StoreError::Io {
            action,
            document_id: id.to_string(),
            source,
        }
    }
}

#[async_trait]
impl IndexStore for FsIndexStore {
    async fn save(&self, id: &DocumentId, index: &VectorIndex) -> Result<(), StoreError> {
        let bytes = encode(id, index)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::io_error("create directory for", id, e))?;

        let mut guard = TempFileGuard {
            path: self
                .root
                .join(format!(".{}.{}.tmp", id, uuid::Uuid::new_v4().simple())),
            published: false,
        };

        let mut file = tokio::fs::File::create(&guard.path)
            .await
            .map_err(|e| Self::io_error("write", id, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| Self::io_error("write", id, e))?;
        file.sync_all()
            .await
            .map_err(|e| Self::io_error("write", id, e))?;
        drop(file);

        let final_path = self.index_path(id);
        tokio::fs::rename(&guard.path, &final_path)
            .await
            .map_err(|e| Self::io_error("publish", id, e))?;
        guard.published = true;

        tracing::debug!(
            "Saved index for {} ({} chunks, {} bytes) to {:?}",
            id,
            index.len(),
            bytes.len(),
            final_path
        );
        Ok(())
    }

    async fn load(&self, id: &DocumentId) -> Result<VectorIndex, StoreError> {
        let bytes = match tokio::fs::read(self.index_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(Self::io_error("read", id, e)),
        };
        decode(id, &bytes)
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.index_path(id)).await {
            Ok(()) => {
                tracing::debug!("Deleted index for {}", id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error("delete", id, e)),
        }
    }

    async fn exists(&self, id: &DocumentId) -> Result<bool, StoreError> {
        tokio::fs::try_exists(self.index_path(id))
            .await
            .map_err(|e| Self::io_error("check", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DistanceMetric;
    use crate::types::Chunk;
    use tempfile::TempDir;

    fn sample_index(text: &str) -> VectorIndex {
        let chunk = Chunk {
            index: 0,
            start: 0,
            len: text.chars().count(),
            text: text.to_string(),
        };
        VectorIndex::build(vec![chunk], vec![vec![0.25, 0.5, 1.0]], DistanceMetric::Cosine).unwrap()
    }

    fn id(raw: &str) -> DocumentId {
        DocumentId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path().join("indexes"));
        let index = sample_index("hello");

        store.save(&id("doc-a"), &index).await.unwrap();
        let loaded = store.load(&id("doc-a")).await.unwrap();
        assert_eq!(loaded, index);
        assert!(store.exists(&id("doc-a")).await.unwrap());
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path());
        let err = store.load(&id("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref d) if d == "missing"));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path());

        store.save(&id("doc"), &sample_index("first")).await.unwrap();
        store.save(&id("doc"), &sample_index("second")).await.unwrap();

        let loaded = store.load(&id("doc")).await.unwrap();
        assert_eq!(loaded.chunks()[0].text, "second");
    }

    #[tokio::test]
    async fn test_no_temporary_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path());
        store.save(&id("doc"), &sample_index("x")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doc.index.json".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path());
        store.save(&id("doc"), &sample_index("x")).await.unwrap();

        store.delete(&id("doc")).await.unwrap();
        store.delete(&id("doc")).await.unwrap();
        assert!(!store.exists(&id("doc")).await.unwrap());
        assert!(matches!(
            store.load(&id("doc")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_documents_do_not_share_storage() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path());
        store.save(&id("a"), &sample_index("alpha")).await.unwrap();
        store.save(&id("a_"), &sample_index("beta")).await.unwrap();

        store.delete(&id("a")).await.unwrap();
        assert_eq!(store.load(&id("a_")).await.unwrap().chunks()[0].text, "beta");
        assert_ne!(store.index_path(&id("a")), store.index_path(&id("a_")));
    }

    #[tokio::test]
    async fn test_ids_differing_in_case_share_one_file() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path());
        assert_eq!(store.index_path(&id("Report")), store.index_path(&id("report")));

        store.save(&id("Report"), &sample_index("upper")).await.unwrap();
        store.save(&id("report"), &sample_index("lower")).await.unwrap();
        assert_eq!(store.load(&id("REPORT")).await.unwrap().chunks()[0].text, "lower");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_corrupted_file_reported() {
        let dir = TempDir::new().unwrap();
        let store = FsIndexStore::new(dir.path());
        std::fs::write(store.index_path(&id("bad")), b"{broken").unwrap();

        let err = store.load(&id("bad")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));
    }
}
