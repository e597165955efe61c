//! # pdf-rag - Question Answering over Uploaded PDFs
//!
//! Ingest a PDF once, then ask natural-language questions about it. Answers
//! are generated by a language model from the passages of that one document
//! most similar to the question (retrieval-augmented generation).
//!
//! ## Overview
//!
//! Every document gets its own vector index, persisted under the data
//! directory and keyed by document id. Questions never see chunks from other
//! documents.
//!
//! ## Key Features
//!
//! - **Local Embeddings**: FastEmbed (all-mpnet-base-v2 by default)
//! - **Two Extraction Methods**: local PDF parsing, or transcription by the generative model
//! - **Exact Nearest-Neighbour Search**: cosine or L2 over a flat per-document index
//! - **Crash-Safe Persistence**: indexes and the registry are replaced atomically
//! - **Concurrency Control**: a document being ingested cannot be re-ingested or deleted
//!
//! ## Architecture
//!
//! ```text
//! IngestRequest ──► TextExtractor ──► TextChunker ──► EmbeddingProvider
//!                                                          │
//!                                                    VectorIndex ──► IndexStore
//!
//! AskRequest ──► IndexStore ──► VectorIndex::query ──► AnswerComposer ──► AskResponse
//! ```
//!
//! ## Modules
//!
//! - [`client`]: [`PdfQaClient`], the application entry point
//! - [`pipeline`]: ingest and retrieval orchestration
//! - [`extract`]: PDF to text
//! - [`chunker`]: overlapping fixed-size text chunks
//! - [`embedding`]: embedding generation using FastEmbed
//! - [`index`]: flat vector index and its persisted form
//! - [`store`]: per-document index persistence
//! - [`generation`]: generative model abstraction and Gemini client
//! - [`composer`]: prompt assembly and answer generation
//! - [`registry`]: uploaded document records
//! - [`config`]: configuration management with environment variable support
//! - [`types`]: request/response types
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform and data directory layout
//!
//! ## Usage Example
//!
//! ```no_run
//! use pdf_rag::{AskRequest, DocumentId, PdfQaClient};
//!
//! #[tokio::main]
//! async fn main() -> pdf_rag::Result<()> {
//!     let client = PdfQaClient::new().await?;
//!     let answer = client
//!         .ask(AskRequest {
//!             document_id: DocumentId::parse("report")?,
//!             question: "Who wrote this?".to_string(),
//!             top_k: None,
//!         })
//!         .await?;
//!     println!("{}", answer.answer);
//!     Ok(())
//! }
//! ```

/// Overlapping fixed-size text chunking
pub mod chunker;

/// Core library client for uploads, questions and document management
pub mod client;

/// Prompt assembly and answer generation
pub mod composer;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// PDF text extraction
pub mod extract;

/// Generative model abstraction and the Gemini REST client
pub mod generation;

/// Flat vector index with exact nearest-neighbour queries
pub mod index;

/// Platform directories and the persisted data layout
pub mod paths;

/// Ingest and retrieval orchestration
pub mod pipeline;

/// Persistent registry of uploaded documents
pub mod registry;

/// Per-document index persistence
pub mod store;

/// Request, response and record types
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::PdfQaClient;
pub use config::Config;
pub use error::{RagError, Result};
pub use types::{
    AskRequest, AskResponse, Chunk, DocumentId, DocumentRecord, IngestRequest, IngestResponse,
};
