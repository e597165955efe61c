//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdf_rag::config::Config;
use pdf_rag::embedding::EmbeddingProvider;
use pdf_rag::error::{EmbeddingError, GenerationError};
use pdf_rag::extract::PdfTextExtractor;
use pdf_rag::generation::{GenerationRequest, GenerativeModel};
use pdf_rag::store::FsIndexStore;
use pdf_rag::PdfQaClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const DIMENSION: usize = 64;

/// Build a minimal PDF with one line of Courier text per page
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Bag-of-words hashing embedder; optionally slow so tests can overlap calls
pub struct HashEmbedder {
    pub calls: AtomicUsize,
    delay: Duration,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMENSION];
                for word in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    let hash = word
                        .to_lowercase()
                        .bytes()
                        .fold(0xcbf29ce484222325u64, |h, b| {
                            (h ^ b as u64).wrapping_mul(0x100000001b3)
                        });
                    v[(hash % DIMENSION as u64) as usize] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "hash"
    }
}

/// Answers with a fixed reply and records every prompt
pub struct RecordingModel {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for RecordingModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt);
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

pub struct TestClient {
    pub client: PdfQaClient,
    pub embedder: Arc<HashEmbedder>,
    pub model: Arc<RecordingModel>,
    pub dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.path().join("data");
    config.chunking.chunk_size = 120;
    config.chunking.overlap = 20;
    config.embedding.batch_size = 2;
    config
}

/// Client with real PDF parsing and filesystem storage, fake models
pub async fn test_client(embedder: HashEmbedder) -> TestClient {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let embedder = Arc::new(embedder);
    let model = Arc::new(RecordingModel::new("  It is Zyxwvq.\n"));
    let store = Arc::new(FsIndexStore::new(config.layout().indexes_dir()));

    let client = PdfQaClient::from_parts(
        config,
        Arc::new(PdfTextExtractor::new()),
        embedder.clone(),
        store,
        model.clone(),
    )
    .await
    .unwrap();

    TestClient {
        client,
        embedder,
        model,
        dir,
    }
}
