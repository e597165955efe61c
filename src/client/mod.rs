//! Core library client for pdf-rag
//!
//! [`PdfQaClient`] is the entry point for applications: it stores uploads,
//! keeps the document registry, drives the retrieval pipeline and composes
//! answers. The CLI is a thin wrapper around it.

use crate::chunker::TextChunker;
use crate::composer::AnswerComposer;
use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedManager};
use crate::error::{RagError, Result, StoreError, ValidationError};
use crate::extract::{ExtractionMethod, GenerativeExtractor, PdfTextExtractor, TextExtractor};
use crate::generation::{GeminiClient, GenerativeModel};
use crate::index::VectorIndex;
use crate::paths::DataLayout;
use crate::pipeline::RetrievalPipeline;
use crate::registry::DocumentRegistry;
use crate::store::{FsIndexStore, IndexStore};
use crate::types::*;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Status reported for a successful ingestion
pub const STATUS_SUCCESS: &str = "success";

/// Main client for uploading PDFs and asking questions about them
///
/// # Example
///
/// ```no_run
/// use pdf_rag::{AskRequest, IngestRequest, PdfQaClient};
///
/// #[tokio::main]
/// async fn main() -> pdf_rag::Result<()> {
///     let client = PdfQaClient::new().await?;
///
///     let bytes = std::fs::read("report.pdf")?;
///     let ingested = client
///         .ingest_document(IngestRequest {
///             filename: "report.pdf".to_string(),
///             bytes,
///             document_id: None,
///         })
///         .await?;
///
///     let answer = client
///         .ask(AskRequest {
///             document_id: ingested.document_id,
///             question: "What is the main finding?".to_string(),
///             top_k: None,
///         })
///         .await?;
///     println!("{}", answer.answer);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PdfQaClient {
    pub(crate) pipeline: Arc<RetrievalPipeline>,
    pub(crate) composer: AnswerComposer,
    pub(crate) registry: Arc<RwLock<DocumentRegistry>>,
    pub(crate) layout: DataLayout,
    pub(crate) config: Arc<Config>,
}

impl PdfQaClient {
    /// Create a client from the default config file plus environment overrides
    pub async fn new() -> Result<Self> {
        let config = Config::new()?;
        Self::with_config(config).await
    }

    /// Create a client with the default collaborators for `config`
    ///
    /// Loads the embedding model (downloading it on first use), builds a
    /// Gemini client and opens the filesystem index store.
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::info!("Initializing PDF QA client");
        tracing::debug!("Data directory: {}", config.storage.data_dir.display());
        tracing::debug!("Embedding model: {}", config.embedding.model_name);
        tracing::debug!("Extraction method: {}", config.extraction.method);

        let model_name = config.embedding.model_name.clone();
        let cache_dir = config.embedding.cache_dir.clone();
        let embedder =
            tokio::task::spawn_blocking(move || FastEmbedManager::shared(&model_name, Some(&cache_dir)))
                .await
                .map_err(|e| RagError::other(format!("Embedding model loader failed: {}", e)))??;

        let generator: Arc<dyn GenerativeModel> = Arc::new(
            GeminiClient::new(&config.generation.model, config.generation.api_key.clone())
                .with_base_url(&config.generation.base_url)
                .with_timeout(Duration::from_secs(config.generation.timeout_secs)),
        );

        let extractor: Arc<dyn TextExtractor> = match config.extraction.method {
            ExtractionMethod::Pdf => Arc::new(PdfTextExtractor::new()),
            ExtractionMethod::Generative => Arc::new(GenerativeExtractor::new(generator.clone())),
        };

        let store: Arc<dyn IndexStore> = Arc::new(FsIndexStore::new(config.layout().indexes_dir()));

        Self::from_parts(config, extractor, embedder, store, generator).await
    }

    /// Create a client from explicit collaborators
    ///
    /// Chunking, retrieval and storage settings still come from `config`.
    pub async fn from_parts(
        config: Config,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn IndexStore>,
        generator: Arc<dyn GenerativeModel>,
    ) -> Result<Self> {
        config.validate()?;
        let layout = config.layout();

        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
        let pipeline = RetrievalPipeline::builder()
            .extractor(extractor)
            .embedder(embedder)
            .store(store)
            .chunker(chunker)
            .metric(config.retrieval.metric)
            .top_k(config.retrieval.top_k)
            .batch_size(config.embedding.batch_size)
            .embed_timeout(Duration::from_secs(config.embedding.timeout_secs))
            .retain_text(config.extraction.retain_text)
            .lock_dir(layout.locks_dir())
            .build()?;

        let registry = DocumentRegistry::load(&layout.registry_path()).await?;
        tracing::info!("Registry has {} documents", registry.len());

        let composer =
            AnswerComposer::new(generator).with_temperature(config.generation.temperature);

        Ok(Self {
            pipeline: Arc::new(pipeline),
            composer,
            registry: Arc::new(RwLock::new(registry)),
            layout,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &RetrievalPipeline {
        &self.pipeline
    }

    /// Where the raw upload of `id` is stored
    pub fn upload_path(&self, id: &DocumentId) -> PathBuf {
        self.layout.uploads_dir().join(format!("{}.pdf", id))
    }

    /// Store and index an uploaded PDF
    pub async fn ingest_document(&self, request: IngestRequest) -> Result<IngestResponse> {
        self.ingest_document_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Store and index an uploaded PDF, stopping early once `cancel` fires
    ///
    /// The document's write lock is held from staging until the registry is
    /// saved. On failure neither the upload, the index nor a registry record
    /// is left behind for this attempt; a previously ingested version of the
    /// same id stays intact.
    pub async fn ingest_document_with_cancellation(
        &self,
        request: IngestRequest,
        cancel: &CancellationToken,
    ) -> Result<IngestResponse> {
        let start = Instant::now();
        validate_filename(&request.filename)?;

        let id = request.document_id.unwrap_or_else(DocumentId::generate);
        let guard = self.pipeline.lock(&id).await?;
        let upload_time = Utc::now();
        tracing::info!("Uploading {} as document {}", request.filename, id);

        let uploads_dir = self.layout.uploads_dir();
        tokio::fs::create_dir_all(&uploads_dir).await?;
        let staged = uploads_dir.join(format!(".{}.{}.tmp", id, uuid::Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&staged, &request.bytes).await {
            remove_if_exists(&staged).await;
            return Err(e.into());
        }

        let previous = self.previous_index(&id).await;

        let outcome = match self
            .pipeline
            .ingest_locked(&guard, &request.bytes, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Ingestion of {} failed: {}", id, e);
                remove_if_exists(&staged).await;
                return Err(e);
            }
        };

        let record = DocumentRecord {
            id: id.clone(),
            filename: request.filename.clone(),
            storage_path: self.upload_path(&id).to_string_lossy().to_string(),
            upload_time,
            processed: true,
        };
        if let Err(e) = self.publish(&staged, record).await {
            tracing::warn!("Publishing {} failed, rolling back its index: {}", id, e);
            remove_if_exists(&staged).await;
            self.restore_index(&id, previous).await;
            return Err(e);
        }
        drop(guard);

        Ok(IngestResponse {
            document_id: id,
            filename: request.filename,
            status: STATUS_SUCCESS.to_string(),
            chunks: outcome.chunk_count,
            upload_time,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// The index currently stored for `id`, kept so a failed re-ingest can
    /// put it back
    async fn previous_index(&self, id: &DocumentId) -> Option<VectorIndex> {
        match self.pipeline.store().load(id).await {
            Ok(index) => Some(index),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!("Existing index for {} is unusable, replacing it: {}", id, e);
                None
            }
        }
    }

    /// Save the registry with `record`, then move the staged upload into place
    ///
    /// The in-memory registry only changes once both steps succeeded.
    async fn publish(&self, staged: &Path, record: DocumentRecord) -> Result<()> {
        let registry_path = self.layout.registry_path();
        let upload_path = self.upload_path(&record.id);

        let mut registry = self.registry.write().await;
        let mut updated = registry.clone();
        updated.insert(record);
        updated.save(&registry_path).await?;

        if let Err(e) = tokio::fs::rename(staged, &upload_path).await {
            if let Err(restore) = registry.save(&registry_path).await {
                tracing::warn!("Failed to restore registry {:?}: {}", registry_path, restore);
            }
            return Err(e.into());
        }

        *registry = updated;
        Ok(())
    }

    /// Put back the index that existed before a failed ingestion, or remove
    /// the new one if there was none
    async fn restore_index(&self, id: &DocumentId, previous: Option<VectorIndex>) {
        let store = self.pipeline.store();
        let restored = match previous {
            Some(index) => store.save(id, &index).await,
            None => store.delete(id).await,
        };
        if let Err(e) = restored {
            tracing::warn!("Failed to roll back index for {}: {}", id, e);
        }
    }

    /// Answer a question about one document
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let result = self
            .pipeline
            .retrieve(&request.document_id, &request.question, request.top_k)
            .await?;

        let response = self.composer.answer(&request.question, &result).await?;
        tracing::info!(
            "Answered question about {} from {} chunks",
            request.document_id,
            response.sources.len()
        );
        Ok(response)
    }

    /// Remove a document's index, upload and record
    ///
    /// Deleting an unknown document succeeds. Fails with `RagError::Busy`
    /// while the document is being ingested.
    pub async fn delete_document(&self, id: &DocumentId) -> Result<()> {
        let guard = self.pipeline.lock(id).await?;

        {
            let mut registry = self.registry.write().await;
            if registry.get(id).is_some() {
                let mut updated = registry.clone();
                updated.remove(id);
                updated.save(&self.layout.registry_path()).await?;
                *registry = updated;
            }
        }

        self.pipeline.delete_locked(&guard).await?;
        remove_if_exists(&self.upload_path(id)).await;
        tracing::info!("Deleted document {}", id);
        Ok(())
    }

    /// All known documents, oldest first
    pub async fn list_documents(&self) -> Vec<DocumentRecord> {
        self.registry.read().await.list()
    }

    pub async fn get_document(&self, id: &DocumentId) -> Result<DocumentRecord> {
        self.registry
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ValidationError::DocumentNotFound(id.to_string()).into())
    }
}

/// Only `.pdf` uploads (any case) with a non-empty name are accepted
fn validate_filename(filename: &str) -> Result<()> {
    let path = Path::new(filename);
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    let has_stem = path.file_stem().is_some_and(|stem| !stem.is_empty());

    if is_pdf && has_stem {
        Ok(())
    } else {
        Err(ValidationError::InvalidFilename(filename.to_string()).into())
    }
}

async fn remove_if_exists(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("Failed to remove {:?}: {}", path, e);
    }
}
