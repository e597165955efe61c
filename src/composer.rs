//! Prompt assembly and answer generation
//!
//! Retrieved chunks are joined into a context block, wrapped in a fixed
//! question-answering template and sent to the generative model.

use crate::error::GenerationError;
use crate::generation::{GenerationRequest, GenerativeModel};
use crate::index::RetrievalResult;
use crate::types::AskResponse;
use std::sync::Arc;

/// Separator placed between chunk texts in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Builds prompts from retrieved chunks and asks the model for an answer
#[derive(Clone)]
pub struct AnswerComposer {
    model: Arc<dyn GenerativeModel>,
    temperature: Option<f32>,
}

impl AnswerComposer {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            temperature: None,
        }
    }

    /// Use a fixed sampling temperature for answers
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Render the answering prompt for `question` over `chunks` (in order)
    pub fn compose<S: AsRef<str>>(question: &str, chunks: &[S]) -> String {
        let context = chunks
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        format!(
            "Answer this question based on the context:\n\nContext: {}\n\nQuestion: {}\nAnswer:",
            context, question
        )
    }

    /// Generate an answer grounded in `result`
    ///
    /// Sources are the chunk texts in retrieval order.
    pub async fn answer(
        &self,
        question: &str,
        result: &RetrievalResult,
    ) -> Result<AskResponse, GenerationError> {
        let sources = result.texts();
        let prompt = Self::compose(question, &sources);

        let mut request = GenerationRequest::new(prompt);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        tracing::debug!(
            "Composing answer from {} chunks with {}",
            sources.len(),
            self.model.model_name()
        );
        let raw = self.model.generate(request).await?;

        Ok(AskResponse {
            answer: raw.trim().to_string(),
            sources,
        })
    }
}
