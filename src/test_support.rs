//! Deterministic stand-ins for the extraction, embedding and generation
//! collaborators, shared by unit tests.

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, ExtractionError, GenerationError};
use crate::extract::TextExtractor;
use crate::generation::{GenerationRequest, GenerativeModel};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Treats the input bytes as already-extracted UTF-8 text
pub(crate) struct PlainTextExtractor {
    pub(crate) calls: AtomicUsize,
}

impl PlainTextExtractor {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        let text = String::from_utf8_lossy(bytes).to_string();
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

/// Bag-of-words hashing embedder: texts sharing words get similar vectors
pub(crate) struct HashEmbedder {
    dimension: usize,
    pub(crate) calls: AtomicUsize,
}

impl HashEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }
}

fn bucket(word: &str, dimension: usize) -> usize {
    // FNV-1a
    let hash = word
        .bytes()
        .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
    (hash % dimension as u64) as usize
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyBatch);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.dimension];
                for word in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    v[bucket(&word.to_lowercase(), self.dimension)] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash"
    }
}

/// Replies with a fixed answer and records every prompt it receives
pub(crate) struct ScriptedModel {
    reply: String,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt);
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
