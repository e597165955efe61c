//! Per-document vector index with exact nearest-neighbor search
//!
//! One `VectorIndex` holds every chunk of a single document together with its
//! embedding. Search is brute force over all stored vectors, which keeps the
//! ordering contract exact: ascending distance, ties broken by chunk order.

use crate::error::IndexError;
use crate::types::Chunk;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the serialized index layout
const FORMAT_VERSION: u32 = 1;

/// Distance used to rank stored vectors against a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in `[0, 2]`
    #[default]
    Cosine,
    /// Euclidean distance
    L2,
}

impl DistanceMetric {
    fn distance(self, stored: &[f32], stored_norm: f32, query: &[f32], query_norm: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                if stored_norm == 0.0 || query_norm == 0.0 {
                    return 1.0;
                }
                let dot: f32 = stored.iter().zip(query).map(|(a, b)| a * b).sum();
                1.0 - dot / (stored_norm * query_norm)
            }
            DistanceMetric::L2 => stored
                .iter()
                .zip(query)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => f.write_str("cosine"),
            DistanceMetric::L2 => f.write_str("l2"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            other => Err(format!("unknown distance metric '{}'", other)),
        }
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// A chunk returned by a query with its distance to the query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Query result ordered by ascending distance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    /// Chunk texts in retrieval order
    pub fn texts(&self) -> Vec<String> {
        self.hits.iter().map(|h| h.chunk.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Nearest-neighbor index over the chunks of one document
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    metric: DistanceMetric,
    dimension: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    // Derived from `vectors`, recomputed on load
    norms: Vec<f32>,
    source_text: Option<String>,
}

impl VectorIndex {
    /// Build an index from chunks and their embeddings (same length, same order)
    pub fn build(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        metric: DistanceMetric,
    ) -> Result<Self, IndexError> {
        if chunks.is_empty() || vectors.is_empty() {
            return Err(IndexError::EmptyIndex(format!(
                "got {} chunks and {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.len() != vectors.len() {
            return Err(IndexError::EmptyIndex(format!(
                "chunk count ({}) does not match vector count ({})",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(IndexError::EmptyIndex("vectors have dimension 0".to_string()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let norms = vectors.iter().map(|v| norm(v)).collect();

        Ok(Self {
            metric,
            dimension,
            chunks,
            vectors,
            norms,
            source_text: None,
        })
    }

    /// Keep the full extracted text alongside the index
    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Return the `min(k, len)` chunks nearest to `vector`
    pub fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult, IndexError> {
        if k == 0 {
            return Err(IndexError::Query("k must be greater than 0".to_string()));
        }
        if self.is_empty() {
            return Err(IndexError::Query("index is empty".to_string()));
        }
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let query_norm = norm(vector);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .par_iter()
            .zip(self.norms.par_iter())
            .enumerate()
            .map(|(i, (stored, &stored_norm))| {
                (i, self.metric.distance(stored, stored_norm, vector, query_norm))
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(RetrievalResult {
            hits: scored
                .into_iter()
                .map(|(i, distance)| RetrievedChunk {
                    chunk: self.chunks[i].clone(),
                    distance,
                })
                .collect(),
        })
    }

    /// Encode the index; vectors are kept bit-exact
    pub fn serialize(&self) -> Result<Vec<u8>, IndexError> {
        let persisted = PersistedIndex {
            format_version: FORMAT_VERSION,
            metric: self.metric,
            dimension: self.dimension,
            entries: self
                .chunks
                .iter()
                .zip(&self.vectors)
                .map(|(chunk, vector)| PersistedEntry {
                    chunk: chunk.clone(),
                    vector: encode_vector(vector),
                })
                .collect(),
            source_text: self.source_text.clone(),
        };

        serde_json::to_vec(&persisted).map_err(|e| IndexError::Corrupted(e.to_string()))
    }

    /// Decode an index produced by [`VectorIndex::serialize`]
    pub fn deserialize(bytes: &[u8]) -> Result<Self, IndexError> {
        let persisted: PersistedIndex =
            serde_json::from_slice(bytes).map_err(|e| IndexError::Corrupted(e.to_string()))?;

        if persisted.format_version != FORMAT_VERSION {
            return Err(IndexError::Corrupted(format!(
                "unsupported format version {}",
                persisted.format_version
            )));
        }

        let mut chunks = Vec::with_capacity(persisted.entries.len());
        let mut vectors = Vec::with_capacity(persisted.entries.len());
        for entry in persisted.entries {
            let vector = decode_vector(&entry.vector)?;
            if vector.len() != persisted.dimension {
                return Err(IndexError::Corrupted(format!(
                    "chunk {} has dimension {}, header says {}",
                    entry.chunk.index,
                    vector.len(),
                    persisted.dimension
                )));
            }
            chunks.push(entry.chunk);
            vectors.push(vector);
        }

        let index = Self::build(chunks, vectors, persisted.metric)
            .map_err(|e| IndexError::Corrupted(e.to_string()))?;

        Ok(match persisted.source_text {
            Some(text) => index.with_source_text(text),
            None => index,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    format_version: u32,
    metric: DistanceMetric,
    dimension: usize,
    entries: Vec<PersistedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_text: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    chunk: Chunk,
    /// Base64 of the little-endian f32 bytes
    vector: String,
}

fn encode_vector(vector: &[f32]) -> String {
    let bytes: Vec<u8> = vector.iter().flat_map(|x| x.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

fn decode_vector(encoded: &str) -> Result<Vec<f32>, IndexError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| IndexError::Corrupted(format!("invalid vector encoding: {}", e)))?;
    if bytes.len() % 4 != 0 {
        return Err(IndexError::Corrupted(format!(
            "vector byte length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
