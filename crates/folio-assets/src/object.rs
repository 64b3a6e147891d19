//! Object storage search.
//!
//! Migrated collections keep their media in a bucket laid out by folder
//! (`covers/`, `episodes/`, ...). A locator like `covers/elife-cover-12`
//! names a key prefix rather than an exact object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{AssetError, AssetResult};

/// Read access to an object store.
pub trait ObjectIndex: Send + Sync {
    /// Keys starting with `prefix`, sorted.
    fn search(&self, prefix: &str) -> AssetResult<Vec<String>>;

    /// Object contents.
    fn read(&self, key: &str) -> AssetResult<Vec<u8>>;
}

/// Object index over a local mirror of the bucket.
///
/// Keys are paths relative to `root` with `/` separators.
#[derive(Debug, Clone)]
pub struct LocalObjectIndex {
    root: PathBuf,
}

impl LocalObjectIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> AssetResult<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type()?.is_dir() {
                // Only descend where a match is still possible.
                let dir_key = format!("{key}/");
                if dir_key.starts_with(prefix) || prefix.starts_with(&dir_key) {
                    self.walk(&path, prefix, out)?;
                }
            } else if key.starts_with(prefix) {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectIndex for LocalObjectIndex {
    fn search(&self, prefix: &str) -> AssetResult<Vec<String>> {
        let mut keys = Vec::new();
        if self.root.is_dir() {
            self.walk(&self.root, prefix, &mut keys)?;
        }
        keys.sort();
        Ok(keys)
    }

    fn read(&self, key: &str) -> AssetResult<Vec<u8>> {
        if key.split('/').any(|s| s == "..") {
            return Err(AssetError::invalid_path(key));
        }
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(AssetError::not_found(key));
        }
        Ok(std::fs::read(path)?)
    }
}

/// In-memory object index for tests.
#[derive(Debug, Default)]
pub struct MemoryObjectIndex {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.write().insert(key.into(), bytes.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_object(self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(key, bytes);
        self
    }
}

impl ObjectIndex for MemoryObjectIndex {
    fn search(&self, prefix: &str) -> AssetResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn read(&self, key: &str) -> AssetResult<Vec<u8>> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| AssetError::not_found(key))
    }
}
