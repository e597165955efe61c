//! Generative model collaborator
//!
//! The pipeline only needs "prompt (optionally with a binary attachment) in,
//! text out". [`GenerativeModel`] is that seam; [`GeminiClient`] is the
//! implementation used by default.

mod gemini;

pub use gemini::{DEFAULT_BASE_URL, GeminiClient};

use crate::error::GenerationError;
use async_trait::async_trait;

/// Binary content sent alongside a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn pdf(data: Vec<u8>) -> Self {
        Self {
            mime_type: "application/pdf".to_string(),
            data,
        }
    }
}

/// A single generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub attachment: Option<Attachment>,
    /// Sampling temperature; the model default is used when `None`
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachment: None,
            temperature: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for text generation backends
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run one generation and return the produced text
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;

    /// Name of the underlying model
    fn model_name(&self) -> &str;
}
