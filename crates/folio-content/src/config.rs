//! Top-level folio configuration.
//!
//! ```toml
//! [assets]
//! legacy_root = "/srv/legacy_cms_files"
//! fetch_timeout_secs = 13
//!
//! [render]
//! site_origin = "https://elifesciences.org"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use folio_assets::{AssetConfig, ConfigError, load_toml};

/// Settings for the publication render step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Scheme and host prepended to root-relative image sources.
    pub site_origin: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            site_origin: "http://localhost".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn new(site_origin: impl Into<String>) -> Self {
        Self {
            site_origin: site_origin.into(),
        }
    }
}

/// Everything both transducers need, built once per run or request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub assets: AssetConfig,
    pub render: RenderConfig,
}

impl FolioConfig {
    /// Load from a TOML file, or `None` if it does not exist.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config: Option<Self> = load_toml(config_path)?;
        if let Some(config) = &config {
            tracing::debug!(
                origin = %config.render.site_origin,
                legacy_root = %config.assets.legacy_root.display(),
                "loaded folio config"
            );
        }
        Ok(config)
    }

    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }
}
