/// Centralized error types for pdf-rag using thiserror
///
/// Every pipeline stage has its own error enum; `RagError` wraps them so callers
/// can match on the stage that failed without losing the original message.
use thiserror::Error;

/// Main error type for the RAG system
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Document '{0}' is being ingested by another operation")]
    Busy(String),

    #[error("Ingestion of document '{0}' was cancelled")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while turning PDF bytes into text
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Input is not a PDF document")]
    NotPdf,

    #[error("Failed to parse PDF: {0}")]
    ParseFailed(String),

    #[error("No text could be extracted from the document")]
    NoText,

    #[error("Extraction collaborator failed: {0}")]
    CollaboratorFailed(String),
}

/// Errors related to text chunking
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("Invalid chunking configuration: {0}")]
    InvalidConfig(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Embedding batch is empty")]
    EmptyBatch,

    #[error("Embedding generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to building, querying and decoding a vector index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot build an empty index: {0}")]
    EmptyIndex(String),

    #[error("Invalid query: {0}")]
    Query(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Serialized index is corrupted: {0}")]
    Corrupted(String),
}

/// Errors related to persisted index storage
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No index found for document '{0}'")]
    NotFound(String),

    #[error("Failed to {action} index for document '{document_id}': {source}")]
    Io {
        action: &'static str,
        document_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored index for document '{document_id}' is unreadable: {source}")]
    Corrupted {
        document_id: String,
        #[source]
        source: IndexError,
    },
}

/// Errors reported by the generative collaborator
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generative model API key is not configured")]
    MissingApiKey,

    #[error("Request to generative model failed: {0}")]
    RequestFailed(String),

    #[error("Generative model returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Generative model returned no text")]
    EmptyResponse,
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Question must not be empty")]
    InvalidQuery,

    #[error("Invalid document id '{0}': expected 1-128 characters from [A-Za-z0-9_-]")]
    InvalidDocumentId(String),

    #[error("Only PDF files are accepted, got '{0}'")]
    InvalidFilename(String),

    #[error("{field} must be {constraint}, got {actual}")]
    ConstraintViolation {
        field: String,
        constraint: String,
        actual: String,
    },

    #[error("No document found with id '{0}'")]
    DocumentNotFound(String),
}

// Conversion from anyhow::Error to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}

/// Convenience alias used throughout the crate
pub type Result<T, E = RagError> = std::result::Result<T, E>;

impl RagError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RagError::Other(msg.into())
    }

    /// True when the document or its index does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RagError::Store(StoreError::NotFound(_))
                | RagError::Validation(ValidationError::DocumentNotFound(_))
        )
    }

    /// Check if this is a user error (bad input, missing document) vs system error
    pub fn is_user_error(&self) -> bool {
        self.is_not_found()
            || matches!(
                self,
                RagError::Validation(_)
                    | RagError::Extraction(
                        ExtractionError::EmptyInput
                            | ExtractionError::NotPdf
                            | ExtractionError::NoText
                    )
                    | RagError::Chunking(_)
                    | RagError::Busy(_)
                    | RagError::Config(ConfigError::InvalidValue { .. })
            )
    }

    /// Check if the failure is transient and the caller may retry
    ///
    /// Nothing in the crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::Embedding(EmbeddingError::Timeout(_))
                | RagError::Generation(
                    GenerationError::RequestFailed(_) | GenerationError::Api { status: 429 | 500.., .. }
                )
                | RagError::Extraction(ExtractionError::CollaboratorFailed(_))
                | RagError::Busy(_)
                | RagError::Io(_)
        )
    }
}
