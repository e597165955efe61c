/// Benchmarks for chunking, index queries and the retrieval path
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pdf_rag::chunker::TextChunker;
use pdf_rag::embedding::EmbeddingProvider;
use pdf_rag::error::EmbeddingError;
use pdf_rag::index::{DistanceMetric, VectorIndex};
use pdf_rag::pipeline::RetrievalPipeline;
use pdf_rag::store::MemoryIndexStore;
use pdf_rag::types::DocumentId;
use std::sync::Arc;
use tokio::runtime::Runtime;

const DIMENSION: usize = 768;

/// Helper to create document-like text
fn sample_text(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "Section {i} describes the quarterly results of division {}. \
                 Revenue grew by {} percent while costs stayed flat across regions.",
                i % 17,
                i % 9
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Deterministic pseudo-random vectors
fn sample_vectors(count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            (0..DIMENSION)
                .map(|_| {
                    state = state
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    ((state >> 32) as f32 / u32::MAX as f32) - 0.5
                })
                .collect()
        })
        .collect()
}

fn sample_index(count: usize, metric: DistanceMetric) -> VectorIndex {
    let chunker = TextChunker::default();
    let mut chunks = chunker.split(&sample_text(count * 8));
    chunks.truncate(count);
    let vectors = sample_vectors(chunks.len(), 42);
    VectorIndex::build(chunks, vectors, metric).unwrap()
}

/// Byte-hashing embedder so the pipeline bench measures our code, not a model
struct ByteEmbedder;

impl EmbeddingProvider for ByteEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMENSION];
                for (i, b) in text.bytes().enumerate() {
                    v[(i * 31 + b as usize) % DIMENSION] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "byte-hash"
    }
}

/// Accepts the input bytes as already-extracted text
struct Utf8Extractor;

#[async_trait::async_trait]
impl pdf_rag::extract::TextExtractor for Utf8Extractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, pdf_rag::error::ExtractionError> {
        Ok(String::from_utf8_lossy(bytes).to_string())
    }
}

fn benchmark_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");
    let chunker = TextChunker::default();

    for paragraphs in [10, 100, 1000].iter() {
        let text = sample_text(*paragraphs);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_paragraphs", paragraphs)),
            &text,
            |b, text| b.iter(|| chunker.split(black_box(text))),
        );
    }

    group.finish();
}

fn benchmark_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_query");
    let query = sample_vectors(1, 7).remove(0);

    for metric in [DistanceMetric::Cosine, DistanceMetric::L2] {
        for count in [100, 1000].iter() {
            let index = sample_index(*count, metric);
            group.bench_with_input(
                BenchmarkId::new(metric.to_string(), format!("{}_chunks", index.len())),
                &index,
                |b, index| b.iter(|| index.query(black_box(&query), 3).unwrap()),
            );
        }
    }

    group.finish();
}

fn benchmark_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_persistence");
    let index = sample_index(500, DistanceMetric::Cosine);
    let bytes = index.serialize().unwrap();

    group.bench_function("serialize", |b| b.iter(|| index.serialize().unwrap()));
    group.bench_function("deserialize", |b| {
        b.iter(|| VectorIndex::deserialize(black_box(&bytes)).unwrap())
    });

    group.finish();
}

fn benchmark_retrieve(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pipeline = RetrievalPipeline::builder()
        .extractor(Arc::new(Utf8Extractor))
        .embedder(Arc::new(ByteEmbedder))
        .store(Arc::new(MemoryIndexStore::new()))
        .build()
        .unwrap();
    let id = DocumentId::parse("bench").unwrap();
    rt.block_on(pipeline.ingest(&id, sample_text(400).as_bytes()))
        .unwrap();

    c.bench_function("pipeline_retrieve", |b| {
        b.to_async(&rt).iter(|| async {
            pipeline
                .retrieve(&id, black_box("How did revenue change in division 3?"), None)
                .await
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_chunking,
    benchmark_query,
    benchmark_persistence,
    benchmark_retrieve
);
criterion_main!(benches);
