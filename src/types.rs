use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_DOCUMENT_ID_LEN: usize = 128;

/// Opaque identifier of an ingested document
///
/// Restricted to `[A-Za-z0-9_-]` and folded to lowercase, so an id is usable
/// verbatim as a storage key and two different ids never map to the same
/// artifact, even on case-insensitive filesystems.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random identifier (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Validate and wrap an existing identifier
    ///
    /// `Doc-1` and `doc-1` name the same document.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_DOCUMENT_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(ValidationError::InvalidDocumentId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// A contiguous piece of a document's extracted text
///
/// `start` and `len` count characters (Unicode scalar values), not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of the chunk within its document
    pub index: usize,
    /// Character offset of the first character
    pub start: usize,
    /// Length in characters
    pub len: usize,
    /// The chunk text, exactly `text[start..start + len]`
    pub text: String,
}

impl Chunk {
    /// Character offset one past the last character
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Metadata kept for every uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    /// Original file name as uploaded
    pub filename: String,
    /// Where the raw upload is stored
    pub storage_path: String,
    pub upload_time: DateTime<Utc>,
    /// True once the document has a persisted index
    pub processed: bool,
}

/// Request to ingest a PDF
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Identifier to use; a random one is generated when absent
    pub document_id: Option<DocumentId>,
}

/// Response from a successful ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub document_id: DocumentId,
    pub filename: String,
    pub status: String,
    /// Number of chunks indexed
    pub chunks: usize,
    pub upload_time: DateTime<Utc>,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Request to answer a question about one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub document_id: DocumentId,
    pub question: String,
    /// Number of chunks to retrieve (defaults to the configured top_k)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Answer plus the chunks it was conditioned on, in retrieval order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
}
