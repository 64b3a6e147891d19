//! Asset resolution settings.
//!
//! Every knob has a default, so an empty `[assets]` table (or none at all)
//! yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a TOML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read and parse a TOML file, or `None` if it does not exist.
pub fn load_toml<T, P>(config_path: P) -> Result<Option<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let config_path = config_path.as_ref();
    if !config_path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(config_path).map_err(|source| ConfigError::ConfigReadError {
            config_path: config_path.to_path_buf(),
            source,
        })?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::ConfigParseError {
            config_path: config_path.to_path_buf(),
            source,
        })
}

/// Where assets come from and where they land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding files exported from the legacy CMS.
    pub legacy_root: PathBuf,

    /// Path fragment that marks a legacy file locator, e.g. `sites/default/files`.
    pub site_files_path: String,

    /// Hosts whose absolute URLs may point into the legacy file tree.
    pub legacy_hosts: Vec<String>,

    /// First path segments searched in object storage.
    pub object_folders: Vec<String>,

    /// Host substring of the photo service whose URLs carry no usable filename.
    pub photo_host_marker: String,

    /// Remote fetch timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Content type folder used when the caller gives none.
    pub default_content_type: String,

    /// Root directory of the managed asset store.
    pub storage_root: PathBuf,

    /// Prefix of storage URIs handed out by the asset store.
    pub storage_uri_prefix: String,

    /// Public URL that `storage_uri_prefix` maps to.
    pub public_base_url: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            legacy_root: PathBuf::from("legacy_cms_files"),
            site_files_path: "sites/default/files".to_string(),
            legacy_hosts: vec!["elifesciences.org".to_string()],
            object_folders: [
                "annual_reports",
                "collections",
                "covers",
                "episodes",
                "events",
                "labs",
                "labs_experiments",
                "subjects",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            photo_host_marker: "googleusercontent".to_string(),
            fetch_timeout_secs: 13,
            default_content_type: "content".to_string(),
            storage_root: PathBuf::from("files/iiif"),
            storage_uri_prefix: "public://iiif/".to_string(),
            public_base_url: "http://localhost/sites/default/files/iiif/".to_string(),
        }
    }
}

impl AssetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a standalone TOML file.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        load_toml(config_path)
    }

    /// Set the legacy file tree root.
    pub fn with_legacy_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.legacy_root = root.into();
        self
    }

    /// Set the legacy hosts.
    pub fn with_legacy_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the object storage folder allow-list.
    pub fn with_object_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_folders = folders.into_iter().map(Into::into).collect();
        self
    }

    /// Set the photo host marker.
    pub fn with_photo_host_marker(mut self, marker: impl Into<String>) -> Self {
        self.photo_host_marker = marker.into();
        self
    }

    /// Set the remote fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the managed storage root.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Set the public base URL.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
