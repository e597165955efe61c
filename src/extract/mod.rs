//! PDF text extraction
//!
//! Two strategies: [`PdfTextExtractor`] parses the document locally with
//! `pdf-extract`, [`GenerativeExtractor`] asks a multimodal model to
//! transcribe it. Both work on in-memory bytes only.

use crate::error::ExtractionError;
use crate::generation::{Attachment, GenerationRequest, GenerativeModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Prompt used for model-based extraction
pub const EXTRACTION_PROMPT: &str = "Extract all text from this PDF exactly as shown:";

/// Trait for turning document bytes into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document
    ///
    /// Never returns an empty or whitespace-only string.
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Which extractor to build from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Local page-based parsing
    #[default]
    Pdf,
    /// Transcription by the generative model
    Generative,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Pdf => f.write_str("pdf"),
            ExtractionMethod::Generative => f.write_str("generative"),
        }
    }
}

impl FromStr for ExtractionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExtractionMethod::Pdf),
            "generative" | "gemini" => Ok(ExtractionMethod::Generative),
            other => Err(format!("unknown extraction method '{}'", other)),
        }
    }
}

fn check_pdf(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::EmptyInput);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExtractionError::NotPdf);
    }
    Ok(())
}

/// Clean up raw extracted text
///
/// Trailing whitespace is dropped from every line and runs of blank lines are
/// collapsed to one. Line order is preserved.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;

    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}

fn finish(raw: &str) -> Result<String, ExtractionError> {
    let text = normalize_text(raw);
    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}

/// Page-based extraction with `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        check_pdf(bytes)?;

        let owned = bytes.to_vec();
        // Parsing is CPU-bound; a panic in the parser surfaces as a JoinError
        let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| ExtractionError::ParseFailed(format!("parser aborted: {}", e)))?
            .map_err(|e| ExtractionError::ParseFailed(e.to_string()))?;

        let text = finish(&raw)?;
        tracing::debug!(
            "Extracted {} characters from {} byte PDF",
            text.chars().count(),
            bytes.len()
        );
        Ok(text)
    }
}

/// Extraction through a multimodal generative model
pub struct GenerativeExtractor {
    model: Arc<dyn GenerativeModel>,
}

impl GenerativeExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl TextExtractor for GenerativeExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        check_pdf(bytes)?;

        let request = GenerationRequest::new(EXTRACTION_PROMPT)
            .with_attachment(Attachment::pdf(bytes.to_vec()))
            .with_temperature(0.0);

        let raw = self
            .model
            .generate(request)
            .await
            .map_err(|e| ExtractionError::CollaboratorFailed(e.to_string()))?;

        finish(&raw)
    }
}
