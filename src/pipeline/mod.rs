//! Ingestion and retrieval pipeline
//!
//! Ingestion: extract -> split -> embed -> build index -> persist. Each step
//! runs to completion before the next starts and the index is only published
//! once fully built, so a failed or cancelled ingestion leaves nothing behind.
//!
//! Retrieval: load the document's index -> embed the question -> k-NN query.

mod fs_lock;
mod key_lock;

use crate::chunker::TextChunker;
use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, ExtractionError, RagError, Result, ValidationError};
use crate::extract::TextExtractor;
use crate::index::{DistanceMetric, RetrievalResult, VectorIndex};
use crate::store::IndexStore;
use crate::types::{Chunk, DocumentId};
use key_lock::KeyLocks;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub(crate) use key_lock::KeyGuard;

/// Number of chunks retrieved when the caller does not ask for a specific k
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 60;

/// Return early if the ingestion was cancelled
macro_rules! check_cancelled {
    ($cancel_token:expr, $id:expr) => {
        if $cancel_token.is_cancelled() {
            tracing::info!("Ingestion of {} cancelled", $id);
            return Err(RagError::Cancelled($id.to_string()));
        }
    };
}

/// Summary of a completed ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub document_id: DocumentId,
    pub chunk_count: usize,
    pub duration_ms: u64,
}

/// Turns documents into persisted indexes and answers retrieval queries
pub struct RetrievalPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn IndexStore>,
    chunker: TextChunker,
    metric: DistanceMetric,
    top_k: usize,
    batch_size: usize,
    embed_timeout: Duration,
    retain_text: bool,
    locks: KeyLocks,
}

/// Builder for [`RetrievalPipeline`]
pub struct RetrievalPipelineBuilder {
    extractor: Option<Arc<dyn TextExtractor>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn IndexStore>>,
    chunker: Option<TextChunker>,
    metric: DistanceMetric,
    top_k: usize,
    batch_size: usize,
    embed_timeout: Duration,
    retain_text: bool,
    lock_dir: Option<PathBuf>,
}

impl Default for RetrievalPipelineBuilder {
    fn default() -> Self {
        Self {
            extractor: None,
            embedder: None,
            store: None,
            chunker: None,
            metric: DistanceMetric::default(),
            top_k: DEFAULT_TOP_K,
            batch_size: DEFAULT_BATCH_SIZE,
            embed_timeout: Duration::from_secs(DEFAULT_EMBED_TIMEOUT_SECS),
            retain_text: false,
            lock_dir: None,
        }
    }
}

impl RetrievalPipelineBuilder {
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Keep the extracted text inside the persisted index
    pub fn retain_text(mut self, retain: bool) -> Self {
        self.retain_text = retain;
        self
    }

    /// Directory for cross-process lock files; without it only tasks in this
    /// process are serialised
    pub fn lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<RetrievalPipeline> {
        let missing = |what: &str| RagError::other(format!("RetrievalPipeline requires {}", what));

        if self.top_k == 0 {
            return Err(constraint("top_k", "at least 1", self.top_k));
        }
        if self.batch_size == 0 {
            return Err(constraint("batch_size", "at least 1", self.batch_size));
        }

        Ok(RetrievalPipeline {
            extractor: self.extractor.ok_or_else(|| missing("an extractor"))?,
            embedder: self.embedder.ok_or_else(|| missing("an embedding provider"))?,
            store: self.store.ok_or_else(|| missing("an index store"))?,
            chunker: self.chunker.unwrap_or_default(),
            metric: self.metric,
            top_k: self.top_k,
            batch_size: self.batch_size,
            embed_timeout: self.embed_timeout,
            retain_text: self.retain_text,
            locks: KeyLocks::new(self.lock_dir),
        })
    }
}

fn constraint(field: &str, constraint: &str, actual: usize) -> RagError {
    ValidationError::ConstraintViolation {
        field: field.to_string(),
        constraint: constraint.to_string(),
        actual: actual.to_string(),
    }
    .into()
}

impl RetrievalPipeline {
    pub fn builder() -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::default()
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    pub fn default_top_k(&self) -> usize {
        self.top_k
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    /// Ingest a document, replacing any existing index for `id`
    pub async fn ingest(&self, id: &DocumentId, bytes: &[u8]) -> Result<IngestOutcome> {
        self.ingest_with_cancellation(id, bytes, &CancellationToken::new())
            .await
    }

    /// Ingest a document, aborting at the next step boundary once `cancel`
    /// fires
    ///
    /// Fails with [`RagError::Busy`] if another ingestion or deletion of the
    /// same id is in progress.
    pub async fn ingest_with_cancellation(
        &self,
        id: &DocumentId,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome> {
        let guard = self.lock(id).await?;
        self.ingest_locked(&guard, bytes, cancel).await
    }

    /// Take the per-document write lock, failing with [`RagError::Busy`] if
    /// it is held
    ///
    /// Callers that must keep other writers out across more than the index
    /// write hold the guard and use the `*_locked` operations.
    pub(crate) async fn lock(&self, id: &DocumentId) -> Result<KeyGuard> {
        self.locks.acquire(id).await
    }

    /// Ingest under a lock already held by the caller
    pub(crate) async fn ingest_locked(
        &self,
        guard: &KeyGuard,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome> {
        let start = Instant::now();
        let id = guard.id();
        tracing::info!("Ingesting document {} ({} bytes)", id, bytes.len());

        check_cancelled!(cancel, id);
        let text = self.extractor.extract(bytes).await?;

        check_cancelled!(cancel, id);
        let chunks = self.chunker.split(&text);
        if chunks.is_empty() {
            return Err(ExtractionError::NoText.into());
        }
        tracing::debug!("Split document {} into {} chunks", id, chunks.len());

        let vectors = self.embed_chunks(id, &chunks, cancel).await?;

        let chunk_count = chunks.len();
        let mut index = VectorIndex::build(chunks, vectors, self.metric)?;
        if self.retain_text {
            index = index.with_source_text(text);
        }

        check_cancelled!(cancel, id);
        self.store.save(id, &index).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Ingested document {}: {} chunks in {}ms",
            id,
            chunk_count,
            duration_ms
        );

        Ok(IngestOutcome {
            document_id: id.clone(),
            chunk_count,
            duration_ms,
        })
    }

    /// Retrieve the chunks of `id` most relevant to `question`
    ///
    /// `k` defaults to the configured top_k. A blank question is rejected
    /// before any collaborator is called.
    pub async fn retrieve(
        &self,
        id: &DocumentId,
        question: &str,
        k: Option<usize>,
    ) -> Result<RetrievalResult> {
        if question.trim().is_empty() {
            return Err(ValidationError::InvalidQuery.into());
        }
        let k = k.unwrap_or(self.top_k);
        if k == 0 {
            return Err(constraint("top_k", "at least 1", k));
        }

        let index = self.store.load(id).await?;
        let mut vectors = self.embed_texts(vec![question.to_string()]).await?;
        let query = vectors
            .pop()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;

        let result = index.query(&query, k)?;
        tracing::debug!("Retrieved {} chunks from {}", result.len(), id);
        Ok(result)
    }

    /// Remove the index of `id`; succeeds if there is none
    pub async fn delete(&self, id: &DocumentId) -> Result<()> {
        let guard = self.lock(id).await?;
        self.delete_locked(&guard).await
    }

    /// Remove the index under a lock already held by the caller
    pub(crate) async fn delete_locked(&self, guard: &KeyGuard) -> Result<()> {
        self.store.delete(guard.id()).await?;
        tracing::info!("Deleted index for document {}", guard.id());
        Ok(())
    }

    /// Whether a persisted index exists for `id`
    pub async fn has_index(&self, id: &DocumentId) -> Result<bool> {
        Ok(self.store.exists(id).await?)
    }

    async fn embed_chunks(
        &self,
        id: &DocumentId,
        chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        let total_batches = chunks.len().div_ceil(self.batch_size);
        let mut vectors = Vec::with_capacity(chunks.len());

        for (batch_idx, batch) in chunks.chunks(self.batch_size).enumerate() {
            check_cancelled!(cancel, id);

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            vectors.extend(self.embed_texts(texts).await?);

            tracing::debug!(
                "Embedded batch {}/{} of document {}",
                batch_idx + 1,
                total_batches,
                id
            );
        }

        Ok(vectors)
    }

    /// Embed on a blocking thread under the configured timeout, then verify
    /// the provider returned one vector of the right size per text
    async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let provider = self.embedder.clone();
        let embed_future = tokio::task::spawn_blocking(move || provider.embed_batch(&texts));

        let vectors = match tokio::time::timeout(self.embed_timeout, embed_future).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(EmbeddingError::GenerationFailed(format!(
                    "embedding task failed: {}",
                    e
                ))
                .into());
            }
            Err(_) => return Err(EmbeddingError::Timeout(self.embed_timeout.as_secs()).into()),
        };

        if vectors.len() != expected {
            return Err(EmbeddingError::CountMismatch {
                expected,
                actual: vectors.len(),
            }
            .into());
        }
        let dimension = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            }
            .into());
        }

        Ok(vectors)
    }
}
