use crate::error::{RagError, Result};
use crate::types::{DocumentId, DocumentRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Metadata records of all uploaded documents, persisted as one JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocumentRegistry {
    /// Map of document id -> record
    documents: BTreeMap<DocumentId, DocumentRecord>,
}

impl DocumentRegistry {
    /// Load the registry from disk; a missing file is an empty registry
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Registry file {:?} not found, starting empty", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let registry: DocumentRegistry = serde_json::from_str(&content).map_err(|e| {
            RagError::other(format!("Failed to parse document registry {:?}: {}", path, e))
        })?;

        tracing::debug!("Loaded registry with {} documents", registry.len());
        Ok(registry)
    }

    /// Save the registry, replacing the previous file atomically
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::other(format!("Failed to serialize document registry: {}", e)))?;

        let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        let written = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!("Saved registry to {:?}", path);
        Ok(())
    }

    /// Insert or replace a record, returning the previous one
    pub fn insert(&mut self, record: DocumentRecord) -> Option<DocumentRecord> {
        self.documents.insert(record.id.clone(), record)
    }

    pub fn get(&self, id: &DocumentId) -> Option<&DocumentRecord> {
        self.documents.get(id)
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<DocumentRecord> {
        self.documents.remove(id)
    }

    /// All records, oldest upload first
    pub fn list(&self) -> Vec<DocumentRecord> {
        let mut records: Vec<DocumentRecord> = self.documents.values().cloned().collect();
        records.sort_by(|a, b| a.upload_time.cmp(&b.upload_time).then(a.id.cmp(&b.id)));
        records
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
