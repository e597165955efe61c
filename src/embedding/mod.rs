mod fastembed_manager;

pub use fastembed_manager::{DEFAULT_MODEL_NAME, FastEmbedManager, is_supported_model};

use crate::error::EmbeddingError;

/// Trait for embedding generation
///
/// Implementations are deterministic for a fixed model and must return one
/// vector per input text, in input order, each of length `dimension()`.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text
    ///
    /// An empty batch is an error.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}
