//! Managed asset storage.
//!
//! Assets are addressed three ways:
//!
//! - **path**: store-relative, e.g. `content/2017-03/figure_1.png`
//! - **uri**: what gets persisted, e.g. `public://iiif/content/2017-03/figure_1.png`
//! - **url**: what gets published, e.g. `https://cdn.example.org/iiif/content/2017-03/figure_1.png`

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::RwLock;

use crate::config::AssetConfig;
use crate::error::{AssetError, AssetResult};

/// Where resolved assets are written and how they are addressed.
pub trait AssetStore: Send + Sync {
    /// Whether a file exists at the store-relative path.
    fn exists(&self, path: &str) -> bool;

    /// Write bytes to the store-relative path, replacing any existing file.
    /// Returns the storage URI.
    fn write(&self, path: &str, bytes: &[u8]) -> AssetResult<String>;

    /// Public URL for a storage URI.
    fn url_for(&self, uri: &str) -> String;

    /// Store-relative path for a storage URI, if the URI belongs to this store.
    fn path_for(&self, uri: &str) -> Option<String>;
}

/// Normalize a store-relative path: strip leading `/`, drop `.`, refuse `..`.
fn normalize(path: &str) -> AssetResult<String> {
    let mut parts = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(AssetError::invalid_path(path)),
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        return Err(AssetError::invalid_path(path));
    }
    Ok(parts.join("/"))
}

/// URI prefix and public base shared by both store implementations.
#[derive(Debug, Clone)]
struct Addressing {
    uri_prefix: String,
    base_url: String,
}

impl Addressing {
    fn new(uri_prefix: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            uri_prefix: uri_prefix.into(),
            base_url,
        }
    }

    fn uri(&self, path: &str) -> String {
        format!("{}{}", self.uri_prefix, path)
    }

    fn path_for(&self, uri: &str) -> Option<String> {
        uri.strip_prefix(&self.uri_prefix).map(str::to_string)
    }

    fn url_for(&self, uri: &str) -> String {
        match self.path_for(uri) {
            Some(path) => format!("{}{}", self.base_url, path),
            None => uri.to_string(),
        }
    }
}

/// Asset store on the local filesystem.
///
/// All paths are relative to `root`; `..` is rejected.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    addressing: Addressing,
}

impl LocalAssetStore {
    pub fn new(
        root: impl Into<PathBuf>,
        uri_prefix: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            addressing: Addressing::new(uri_prefix, base_url),
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(
            &config.storage_root,
            &config.storage_uri_prefix,
            &config.public_base_url,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> AssetResult<PathBuf> {
        let path = normalize(path)?;
        let full = self.root.join(&path);
        if full
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(AssetError::invalid_path(path));
        }
        Ok(full)
    }
}

impl AssetStore for LocalAssetStore {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn write(&self, path: &str, bytes: &[u8]) -> AssetResult<String> {
        let relative = normalize(path)?;
        let full = self.resolve(&relative)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, bytes)?;
        tracing::debug!(path = %relative, bytes = bytes.len(), "wrote asset");
        Ok(self.addressing.uri(&relative))
    }

    fn url_for(&self, uri: &str) -> String {
        self.addressing.url_for(uri)
    }

    fn path_for(&self, uri: &str) -> Option<String> {
        self.addressing.path_for(uri)
    }
}

/// In-memory asset store for tests and dry runs.
#[derive(Debug)]
pub struct MemoryAssetStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
    addressing: Addressing,
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new("public://iiif/", "https://cdn.example.org/iiif/")
    }
}

impl MemoryAssetStore {
    pub fn new(uri_prefix: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            addressing: Addressing::new(uri_prefix, base_url),
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(&config.storage_uri_prefix, &config.public_base_url)
    }

    /// Contents at a store-relative path.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        let path = normalize(path).ok()?;
        self.files.read().get(&path).cloned()
    }

    /// Delete a file, returning whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        match normalize(path) {
            Ok(path) => self.files.write().remove(&path).is_some(),
            Err(_) => false,
        }
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl AssetStore for MemoryAssetStore {
    fn exists(&self, path: &str) -> bool {
        match normalize(path) {
            Ok(path) => self.files.read().contains_key(&path),
            Err(_) => false,
        }
    }

    fn write(&self, path: &str, bytes: &[u8]) -> AssetResult<String> {
        let path = normalize(path)?;
        self.files.write().insert(path.clone(), bytes.to_vec());
        Ok(self.addressing.uri(&path))
    }

    fn url_for(&self, uri: &str) -> String {
        self.addressing.url_for(uri)
    }

    fn path_for(&self, uri: &str) -> Option<String> {
        self.addressing.path_for(uri)
    }
}
