/// Configuration system for pdf-rag
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedding::{DEFAULT_MODEL_NAME, is_supported_model};
use crate::error::{ConfigError, RagError};
use crate::extract::ExtractionMethod;
use crate::generation::DEFAULT_BASE_URL;
use crate::index::DistanceMetric;
use crate::paths::DataLayout;
use crate::pipeline::{DEFAULT_BATCH_SIZE, DEFAULT_EMBED_TIMEOUT_SECS, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Where indexes, uploads and the registry live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Text extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Generative model configuration
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Root data directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-mpnet-base-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for one embedding batch
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Where model weights are downloaded to
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question when the request does not say
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Distance metric used for new indexes ("cosine" or "l2")
    #[serde(default)]
    pub metric: DistanceMetric,
}

/// Text extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExtractionConfig {
    /// "pdf" (local parsing) or "generative" (model transcription)
    #[serde(default)]
    pub method: ExtractionMethod,

    /// Keep the extracted text inside each index for auditing
    #[serde(default)]
    pub retain_text: bool,
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Gemini model name
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// API key; usually supplied through GOOGLE_API_KEY instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// REST endpoint root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature for answers (model default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    crate::paths::PlatformPaths::project_data_dir()
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_embedding_timeout() -> u64 {
    DEFAULT_EMBED_TIMEOUT_SECS
}

fn default_model_cache_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_model_cache_dir()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_generation_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_generation_timeout() -> u64 {
    120
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
            cache_dir: default_model_cache_dir(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            metric: DistanceMetric::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_generation_timeout(),
            temperature: None,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(invalid("storage.data_dir", "must not be empty"));
        }

        if !is_supported_model(&self.embedding.model_name) {
            return Err(invalid(
                "embedding.model_name",
                format!("unsupported model '{}'", self.embedding.model_name),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.embedding.timeout_secs == 0 {
            return Err(invalid("embedding.timeout_secs", "must be greater than 0"));
        }

        if self.chunking.chunk_size == 0 {
            return Err(invalid("chunking.chunk_size", "must be greater than 0"));
        }

        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(invalid(
                "chunking.overlap",
                format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.chunking.chunk_size, self.chunking.overlap
                ),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k", "must be greater than 0"));
        }

        if self.generation.model.trim().is_empty() {
            return Err(invalid("generation.model", "must not be empty"));
        }

        if self.generation.timeout_secs == 0 {
            return Err(invalid("generation.timeout_secs", "must be greater than 0"));
        }

        if let Some(temperature) = self.generation.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(invalid(
                "generation.temperature",
                format!("must be between 0.0 and 2.0, got {}", temperature),
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the process environment in practice)
    ///
    /// Values that fail to parse are ignored and leave the setting unchanged.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("PDF_RAG_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(model) = lookup("PDF_RAG_MODEL") {
            self.embedding.model_name = model;
        }

        if let Some(batch_size) = lookup("PDF_RAG_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }

        if let Some(chunk_size) = lookup("PDF_RAG_CHUNK_SIZE")
            && let Ok(size) = chunk_size.parse()
        {
            self.chunking.chunk_size = size;
        }

        if let Some(overlap) = lookup("PDF_RAG_CHUNK_OVERLAP")
            && let Ok(overlap) = overlap.parse()
        {
            self.chunking.overlap = overlap;
        }

        if let Some(top_k) = lookup("PDF_RAG_TOP_K")
            && let Ok(k) = top_k.parse()
        {
            self.retrieval.top_k = k;
        }

        if let Some(method) = lookup("PDF_RAG_EXTRACTION")
            && let Ok(method) = method.parse()
        {
            self.extraction.method = method;
        }

        if let Some(model) = lookup("PDF_RAG_GENERATION_MODEL") {
            self.generation.model = model;
        }

        if let Some(url) = lookup("PDF_RAG_GEMINI_BASE_URL") {
            self.generation.base_url = url;
        }

        if let Some(key) = lookup("GOOGLE_API_KEY")
            && !key.trim().is_empty()
        {
            self.generation.api_key = Some(key);
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Persisted layout under `storage.data_dir`
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.storage.data_dir)
    }
}

#[cfg(test)]
mod tests;
