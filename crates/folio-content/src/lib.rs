//! Content transducers for folio.
//!
//! Moves structured article content between its JSON wire form and the
//! persisted block graph:
//!
//! ```text
//!            ┌────────────┐   BlockRecord   ┌────────────┐
//!  JSON ───▶ │  Ingestor  │ ──────────────▶ │ BlockStore │
//!            └─────┬──────┘                 └─────┬──────┘
//!                  │ AssetResolver                │ load
//!                  ▼                              ▼
//!            ┌────────────┐    url_for     ┌────────────┐
//!            │ AssetStore │ ─────────────▶ │ Publisher  │ ───▶ JSON
//!            └────────────┘                └────────────┘
//! ```
//!
//! Rich text is sanitized on the way in ([`sanitize`]) and on the way out is
//! rendered ([`render`]) and split into paragraphs and lists
//! ([`normalize`]).

pub mod config;
pub mod error;
mod html;
pub mod ingest;
pub mod normalize;
pub mod publish;
pub mod render;
pub mod sanitize;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use folio_assets::{
    AssetResolver, AssetStore, HttpFetcher, LocalAssetStore, LocalObjectIndex, ObjectIndex,
    RemoteFetch,
};
use folio_store::BlockStore;

pub use config::{FolioConfig, RenderConfig};
pub use error::{IngestError, PublishError, SetupError};
pub use ingest::{AssetTarget, Ingested, Ingestor, ItemContext};
pub use normalize::{Fragment, ListEntry, ListFragment, split};
pub use publish::{
    ExpandContext, ImageSize, ImageSource, ListPrefix, PublishedBlock, PublishedImage,
    PublishedItem, Publisher,
};
pub use render::Renderer;
pub use sanitize::{BASIC_HTML, PLAIN_TEXT, Policy, PolicySanitizer, Sanitizer};

/// Both transducers wired to one set of collaborators.
pub struct Folio {
    ingestor: Ingestor,
    publisher: Publisher,
}

impl Folio {
    /// Assemble from explicit collaborators.
    pub fn new(
        config: &FolioConfig,
        blocks: Arc<dyn BlockStore>,
        assets: Arc<dyn AssetStore>,
        objects: Arc<dyn ObjectIndex>,
        fetcher: Arc<dyn RemoteFetch>,
    ) -> Result<Self, SetupError> {
        let resolver = AssetResolver::new(config.assets.clone(), assets.clone(), objects, fetcher)?;
        let ingestor = Ingestor::new(
            blocks.clone(),
            Arc::new(PolicySanitizer::new()),
            Arc::new(resolver),
        )?;
        let publisher = Publisher::new(blocks, assets, Renderer::new(&config.render)?)?;
        Ok(Self {
            ingestor,
            publisher,
        })
    }

    /// Assemble with filesystem-backed asset storage, an object index rooted
    /// at `object_root` and a real HTTP client.
    pub fn local(
        config: &FolioConfig,
        blocks: Arc<dyn BlockStore>,
        object_root: impl Into<PathBuf>,
    ) -> Result<Self, SetupError> {
        let object_root = object_root.into();
        tracing::info!(
            storage = %config.assets.storage_root.display(),
            objects = %object_root.display(),
            "assembling folio"
        );
        Self::new(
            config,
            blocks,
            Arc::new(LocalAssetStore::from_config(&config.assets)),
            Arc::new(LocalObjectIndex::new(object_root)),
            Arc::new(HttpFetcher::new()?),
        )
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// An ingestor that files assets under a document's content type and
    /// creation month.
    pub fn ingestor_for(&self, content_type: &str, created: DateTime<Utc>) -> Ingestor {
        self.ingestor
            .clone()
            .with_content_type(content_type)
            .with_timestamp(created)
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }
}
