//! In-memory index store for tests and embedding in other programs.

use super::{IndexStore, decode, encode};
use crate::error::StoreError;
use crate::index::VectorIndex;
use crate::types::DocumentId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps serialized indexes in a `HashMap`, so loads go through the same
/// decode path as the filesystem backend
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<HashMap<DocumentId, Vec<u8>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored indexes
    pub async fn len(&self) -> usize {
        self.indexes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.indexes.read().await.is_empty()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn save(&self, id: &DocumentId, index: &VectorIndex) -> Result<(), StoreError> {
        let bytes = encode(id, index)?;
        self.indexes.write().await.insert(id.clone(), bytes);
        Ok(())
    }

    async fn load(&self, id: &DocumentId) -> Result<VectorIndex, StoreError> {
        let indexes = self.indexes.read().await;
        let bytes = indexes
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        decode(id, bytes)
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.indexes.write().await.remove(id);
        Ok(())
    }

    async fn exists(&self, id: &DocumentId) -> Result<bool, StoreError> {
        Ok(self.indexes.read().await.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DistanceMetric;
    use crate::types::Chunk;

    #[tokio::test]
    async fn test_round_trip_and_delete() {
        let store = MemoryIndexStore::new();
        let id = DocumentId::parse("mem").unwrap();
        let chunk = Chunk {
            index: 0,
            start: 0,
            len: 3,
            text: "abc".to_string(),
        };
        let index =
            VectorIndex::build(vec![chunk], vec![vec![1.0, 2.0]], DistanceMetric::L2).unwrap();

        store.save(&id, &index).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.load(&id).await.unwrap(), index);

        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(store.load(&id).await, Err(StoreError::NotFound(_))));
    }
}
