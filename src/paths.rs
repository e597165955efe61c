/// Centralized platform-specific path computation
///
/// Base directories come from the `dirs` crate (XDG on Linux, Known Folders on
/// Windows, `~/Library` on macOS). Everything pdf-rag writes lives under a
/// `pdf-rag` folder inside them.
use std::path::{Path, PathBuf};

const APP_FOLDER: &str = "pdf-rag";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Local data directory, `.` if the platform has none
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Cache directory, `.` if the platform has none
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Config directory, `.` if the platform has none
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {data_dir}/pdf-rag
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_FOLDER)
    }

    /// Returns: {cache_dir}/pdf-rag
    pub fn project_cache_dir() -> PathBuf {
        Self::cache_dir().join(APP_FOLDER)
    }

    /// Returns: {config_dir}/pdf-rag
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_FOLDER)
    }

    /// Where downloaded embedding model weights are kept
    ///
    /// Returns: {cache_dir}/pdf-rag/models
    pub fn default_model_cache_dir() -> PathBuf {
        Self::project_cache_dir().join("models")
    }

    /// Returns: {config_dir}/pdf-rag/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

/// Layout of everything persisted under one data directory
///
/// Indexes, raw uploads and lock files live in separate subdirectories so a
/// document id never addresses two artifacts in the same namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.root.join("indexes")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("documents.json")
    }
}
