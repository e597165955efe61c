use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Model used when nothing else is configured
pub const DEFAULT_MODEL_NAME: &str = "all-mpnet-base-v2";

/// The process-wide model instance, created on first use and never torn down
static SHARED: OnceCell<Arc<FastEmbedManager>> = OnceCell::new();

/// FastEmbed-based embedding provider
pub struct FastEmbedManager {
    // TextEmbedding::embed needs exclusive access
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: &'static str,
}

/// Map a configured model name to the FastEmbed model, its dimension and canonical name
fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize, &'static str), EmbeddingError> {
    let lowered = name.to_ascii_lowercase();
    let short = lowered
        .strip_prefix("sentence-transformers/")
        .or_else(|| lowered.strip_prefix("baai/"))
        .unwrap_or(&lowered);

    match short {
        "all-mpnet-base-v2" => Ok((EmbeddingModel::AllMpnetBaseV2, 768, "all-mpnet-base-v2")),
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384, "all-MiniLM-L6-v2")),
        "all-minilm-l12-v2" => Ok((EmbeddingModel::AllMiniLML12V2, 384, "all-MiniLM-L12-v2")),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384, "BAAI/bge-small-en-v1.5")),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768, "BAAI/bge-base-en-v1.5")),
        _ => Err(EmbeddingError::UnknownModel(name.to_string())),
    }
}

/// Check that a model name is supported without loading it
pub fn is_supported_model(name: &str) -> bool {
    resolve_model(name).is_ok()
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-mpnet-base-v2)
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::from_model_name(DEFAULT_MODEL_NAME, None)
    }

    /// Load a model by name, optionally caching weights in `cache_dir`
    pub fn from_model_name(name: &str, cache_dir: Option<&Path>) -> Result<Self, EmbeddingError> {
        let (model, dimension, model_name) = resolve_model(name)?;
        tracing::info!("Initializing FastEmbed model: {}", model_name);

        let mut options = InitOptions::new(model).with_show_download_progress(true);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir.to_path_buf());
        }

        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            model_name,
        })
    }

    /// Get the process-wide model, loading it on the first call
    ///
    /// Later calls return the same instance. Asking for a different model than
    /// the one already loaded is an error, since the embedding dimension is
    /// fixed for the lifetime of the process.
    pub fn shared(name: &str, cache_dir: Option<&Path>) -> Result<Arc<Self>, EmbeddingError> {
        let manager = SHARED.get_or_try_init(|| {
            Self::from_model_name(name, cache_dir).map(Arc::new)
        })?;

        let (_, _, requested) = resolve_model(name)?;
        if manager.model_name != requested {
            return Err(EmbeddingError::InitializationFailed(format!(
                "process already uses model '{}', cannot switch to '{}'",
                manager.model_name, requested
            )));
        }

        Ok(Arc::clone(manager))
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyBatch);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::GenerationFailed(format!("{:#}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.model_name
    }
}
