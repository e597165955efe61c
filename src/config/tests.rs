use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn assert_invalid(config: &Config, key: &str) {
    match config.validate() {
        Err(RagError::Config(ConfigError::InvalidValue { key: actual, .. })) => {
            assert_eq!(actual, key)
        }
        other => panic!("expected invalid '{}', got {:?}", key, other),
    }
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.embedding.model_name, "all-mpnet-base-v2");
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.overlap, 200);
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.retrieval.metric, DistanceMetric::Cosine);
    assert_eq!(config.extraction.method, ExtractionMethod::Pdf);
    assert!(!config.extraction.retain_text);
    assert_eq!(config.generation.model, "gemini-1.5-flash");
    assert!(config.generation.api_key.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config: Config = toml::from_str(
        r#"
        [chunking]
        chunk_size = 500

        [extraction]
        method = "generative"
        "#,
    )
    .unwrap();

    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.overlap, 200);
    assert_eq!(config.extraction.method, ExtractionMethod::Generative);
    assert_eq!(config.retrieval, RetrievalConfig::default());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf").join("config.toml");

    let mut config = Config::default();
    config.storage.data_dir = dir.path().join("data");
    config.retrieval.top_k = 5;
    config.retrieval.metric = DistanceMetric::L2;
    config.generation.temperature = Some(0.2);
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_from_file_missing() {
    let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, RagError::Config(ConfigError::FileNotFound(_))));
}

#[test]
fn test_from_file_invalid_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[chunking\nchunk_size = ").unwrap();
    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, RagError::Config(ConfigError::ParseFailed(_))));
}

#[test]
fn test_from_file_runs_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[retrieval]\ntop_k = 0\n").unwrap();
    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, RagError::Config(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut config = Config::default();
    config.embedding.batch_size = 0;
    assert_invalid(&config, "embedding.batch_size");

    let mut config = Config::default();
    config.embedding.model_name = "word2vec".to_string();
    assert_invalid(&config, "embedding.model_name");

    let mut config = Config::default();
    config.chunking.chunk_size = 0;
    assert_invalid(&config, "chunking.chunk_size");

    let mut config = Config::default();
    config.chunking.overlap = config.chunking.chunk_size;
    assert_invalid(&config, "chunking.overlap");

    let mut config = Config::default();
    config.retrieval.top_k = 0;
    assert_invalid(&config, "retrieval.top_k");

    let mut config = Config::default();
    config.generation.temperature = Some(3.5);
    assert_invalid(&config, "generation.temperature");

    let mut config = Config::default();
    config.generation.model = "  ".to_string();
    assert_invalid(&config, "generation.model");
}

#[test]
fn test_overrides_applied() {
    let mut config = Config::default();
    config.apply_overrides_from(lookup_from(&[
        ("PDF_RAG_DATA_DIR", "/tmp/pdf-rag-data"),
        ("PDF_RAG_MODEL", "all-MiniLM-L6-v2"),
        ("PDF_RAG_BATCH_SIZE", "8"),
        ("PDF_RAG_CHUNK_SIZE", "600"),
        ("PDF_RAG_CHUNK_OVERLAP", "50"),
        ("PDF_RAG_TOP_K", "7"),
        ("PDF_RAG_EXTRACTION", "generative"),
        ("PDF_RAG_GENERATION_MODEL", "gemini-2.0-flash"),
        ("GOOGLE_API_KEY", "secret"),
    ]));

    assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/pdf-rag-data"));
    assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
    assert_eq!(config.embedding.batch_size, 8);
    assert_eq!(config.chunking.chunk_size, 600);
    assert_eq!(config.chunking.overlap, 50);
    assert_eq!(config.retrieval.top_k, 7);
    assert_eq!(config.extraction.method, ExtractionMethod::Generative);
    assert_eq!(config.generation.model, "gemini-2.0-flash");
    assert_eq!(config.generation.api_key.as_deref(), Some("secret"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_unparsable_overrides_ignored() {
    let mut config = Config::default();
    config.apply_overrides_from(lookup_from(&[
        ("PDF_RAG_BATCH_SIZE", "lots"),
        ("PDF_RAG_TOP_K", "-1"),
        ("PDF_RAG_EXTRACTION", "telepathy"),
        ("GOOGLE_API_KEY", "   "),
    ]));
    assert_eq!(config, Config::default());
}

#[test]
fn test_api_key_not_written_when_absent() {
    let text = toml::to_string_pretty(&Config::default()).unwrap();
    assert!(!text.contains("api_key"));
    assert!(text.contains("[generation]"));
}

#[test]
fn test_layout_follows_data_dir() {
    let mut config = Config::default();
    config.storage.data_dir = PathBuf::from("/srv/docs");
    assert_eq!(config.layout().indexes_dir(), PathBuf::from("/srv/docs/indexes"));
}
