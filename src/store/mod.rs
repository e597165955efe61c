//! Durable storage of per-document vector indexes
//!
//! An [`IndexStore`] maps a [`DocumentId`] to the serialized form of its
//! [`VectorIndex`]. Identity lives in the id, not in a path, so backends are
//! free to lay data out however they like.

mod fs_store;
mod memory;

pub use fs_store::FsIndexStore;
pub use memory::MemoryIndexStore;

use crate::error::StoreError;
use crate::index::VectorIndex;
use crate::types::DocumentId;
use async_trait::async_trait;

/// Trait for index persistence backends
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Persist the index for `id`, replacing any previous one
    ///
    /// Readers observe either the old index, the new one, or none; never a
    /// partially written index.
    async fn save(&self, id: &DocumentId, index: &VectorIndex) -> Result<(), StoreError>;

    /// Load the index for `id`, failing with `StoreError::NotFound` if absent
    async fn load(&self, id: &DocumentId) -> Result<VectorIndex, StoreError>;

    /// Remove the index for `id`. Removing a missing index succeeds.
    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError>;

    /// Check whether an index exists for `id`
    async fn exists(&self, id: &DocumentId) -> Result<bool, StoreError>;
}

fn encode(id: &DocumentId, index: &VectorIndex) -> Result<Vec<u8>, StoreError> {
    index.serialize().map_err(|source| StoreError::Corrupted {
        document_id: id.to_string(),
        source,
    })
}

fn decode(id: &DocumentId, bytes: &[u8]) -> Result<VectorIndex, StoreError> {
    VectorIndex::deserialize(bytes).map_err(|source| StoreError::Corrupted {
        document_id: id.to_string(),
        source,
    })
}
