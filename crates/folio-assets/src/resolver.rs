//! Locator → managed asset.
//!
//! Three sources are tried in order and the first one that yields bytes
//! wins:
//!
//! 1. the legacy CMS file tree (locators under `sites/default/files`)
//! 2. object storage (locators whose first segment is a known folder)
//! 3. a single remote GET for absolute `http(s)` URLs
//!
//! Whatever wins is copied into the asset store under
//! `{content_type}/{YYYY}-{MM}/{filename}`. Every failure is logged and
//! reported as `None`; resolution never aborts the caller.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;

use folio_types::AssetRef;

use crate::config::AssetConfig;
use crate::error::AssetResult;
use crate::fetch::RemoteFetch;
use crate::object::ObjectIndex;
use crate::probe::probe;
use crate::store::AssetStore;
use crate::transliterate::{transliterate, url_filename};

/// What to resolve.
#[derive(Debug, Clone)]
pub struct AssetRequest<'a> {
    pub locator: &'a str,
    pub alt: Option<&'a str>,
    /// Destination folder; the configured default when `None`.
    pub content_type: Option<&'a str>,
    /// Dates the destination folder; now when `None`.
    pub timestamp: Option<DateTime<Utc>>,
}

impl<'a> AssetRequest<'a> {
    pub fn new(locator: &'a str) -> Self {
        Self {
            locator,
            alt: None,
            content_type: None,
            timestamp: None,
        }
    }

    pub fn with_alt(mut self, alt: Option<&'a str>) -> Self {
        self.alt = alt;
        self
    }

    pub fn with_content_type(mut self, content_type: &'a str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A materialized asset and the alt text to store with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub asset: AssetRef,
    /// May differ from the requested alt (photo host naming).
    pub alt: Option<String>,
}

/// Bytes found by one stage, with the filename they should be stored under.
struct Found {
    bytes: Vec<u8>,
    filename: String,
    alt: Option<String>,
}

pub struct AssetResolver {
    config: AssetConfig,
    store: Arc<dyn AssetStore>,
    objects: Arc<dyn ObjectIndex>,
    fetcher: Arc<dyn RemoteFetch>,
    site_files: Regex,
    photo_alt_ext: Regex,
    photo_alt_id: Regex,
}

impl AssetResolver {
    pub fn new(
        config: AssetConfig,
        store: Arc<dyn AssetStore>,
        objects: Arc<dyn ObjectIndex>,
        fetcher: Arc<dyn RemoteFetch>,
    ) -> AssetResult<Self> {
        let site_files = site_files_pattern(&config)?;
        Ok(Self {
            config,
            store,
            objects,
            fetcher,
            site_files,
            photo_alt_ext: Regex::new(r"(?i)\.(jpg|jpeg|png|gif)$")?,
            photo_alt_id: Regex::new(r"(?i)^[a-f0-9]{8}-")?,
        })
    }

    /// Public URL of a resolved asset.
    pub fn url_for(&self, asset: &AssetRef) -> String {
        self.store.url_for(&asset.storage_uri)
    }

    /// Resolve a locator into a stored asset, or `None` if no source has it.
    #[tracing::instrument(skip(self, request), fields(locator = %request.locator))]
    pub fn resolve(&self, request: &AssetRequest<'_>) -> Option<ResolvedAsset> {
        let locator = request.locator.trim();
        if locator.is_empty() {
            return None;
        }

        let alt = request.alt.filter(|a| !a.is_empty());
        let found = self
            .from_legacy(locator, alt)
            .or_else(|| self.from_objects(locator, alt))
            .or_else(|| self.from_remote(locator, alt));

        let Some(found) = found else {
            tracing::debug!("asset unresolved");
            return None;
        };

        let filename = transliterate(&found.filename);
        let path = self.destination(request, &filename);
        let uri = match self.store.write(&path, &found.bytes) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "failed to store asset");
                return None;
            }
        };

        let media = probe(&found.bytes, &filename);
        let mut asset = AssetRef::new(uri, filename, media.media_type);
        if let Some((w, h)) = media.size {
            asset = asset.with_size(w, h);
        }
        Some(ResolvedAsset {
            asset,
            alt: found.alt,
        })
    }

    /// `{content_type}/{YYYY}-{MM}/{filename}`.
    pub fn destination(&self, request: &AssetRequest<'_>, filename: &str) -> String {
        let content_type = request
            .content_type
            .unwrap_or(&self.config.default_content_type);
        let when = request.timestamp.unwrap_or_else(Utc::now);
        format!("{}/{}/{}", content_type, when.format("%Y-%m"), filename)
    }

    fn from_legacy(&self, locator: &str, alt: Option<&str>) -> Option<Found> {
        let captures = self.site_files.captures(locator)?;
        let relative = captures.name("file")?.as_str();
        let source = match safe_join(&self.config.legacy_root, relative) {
            Some(path) => path,
            None => {
                tracing::warn!(file = %relative, "legacy path escapes root");
                return None;
            }
        };
        if !source.is_file() {
            tracing::debug!(source = %source.display(), "no legacy file");
            return None;
        }
        match std::fs::read(&source) {
            Ok(bytes) => Some(Found {
                bytes,
                filename: url_filename(relative).to_string(),
                alt: alt.map(str::to_string),
            }),
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "failed to read legacy file");
                None
            }
        }
    }

    fn from_objects(&self, locator: &str, alt: Option<&str>) -> Option<Found> {
        let (folder, _) = locator.split_once('/')?;
        if !self.config.object_folders.iter().any(|f| f == folder) {
            return None;
        }
        let key = match self.objects.search(locator) {
            Ok(keys) => keys.into_iter().next()?,
            Err(e) => {
                tracing::warn!(prefix = %locator, error = %e, "object search failed");
                return None;
            }
        };
        match self.objects.read(&key) {
            Ok(bytes) => Some(Found {
                bytes,
                filename: url_filename(&key).to_string(),
                alt: alt.map(str::to_string),
            }),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read object");
                None
            }
        }
    }

    fn from_remote(&self, locator: &str, alt: Option<&str>) -> Option<Found> {
        let lower = locator.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return None;
        }
        let bytes = match self.fetcher.get(locator, self.config.fetch_timeout()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %locator, error = %e, "file didn't download");
                return None;
            }
        };

        let photo_alt = alt.filter(|a| {
            !self.config.photo_host_marker.is_empty()
                && host_of(locator).contains(self.config.photo_host_marker.as_str())
                && self.photo_alt_ext.is_match(a)
        });

        // Photo host URLs carry no filename; the alt text holds it.
        if let Some(original) = photo_alt {
            let stripped = self.photo_alt_ext.replace(original, "").into_owned();
            let alt = (!self.photo_alt_id.is_match(&stripped)).then_some(stripped);
            return Some(Found {
                bytes,
                filename: original.to_string(),
                alt,
            });
        }

        Some(Found {
            bytes,
            filename: url_filename(locator).to_string(),
            alt: alt.map(str::to_string),
        })
    }
}

/// `^(https?://<legacy host>/|/?)<site files path>/(?P<file>.+)$`
fn site_files_pattern(config: &AssetConfig) -> AssetResult<Regex> {
    let site_files = regex::escape(config.site_files_path.trim_matches('/'));
    let hosts: Vec<String> = config
        .legacy_hosts
        .iter()
        .map(|h| regex::escape(h))
        .collect();
    let pattern = if hosts.is_empty() {
        format!(r"^/?{site_files}/(?P<file>[^?#]+)")
    } else {
        format!(
            r"^(?:(?i:https?)://(?:[^/]*\.)?(?:{})/|/?){site_files}/(?P<file>[^?#]+)",
            hosts.join("|")
        )
    };
    Ok(Regex::new(&pattern)?)
}

/// Join without letting `relative` climb out of `root`.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(root.join(relative))
}

/// Host part of an absolute URL, lowercased.
fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or(authority);
    host.to_ascii_lowercase()
}
