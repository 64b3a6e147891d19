//! Asset resolution for folio.
//!
//! Turns the image locators found in migrated content into files in managed
//! storage. The [`AssetResolver`] owns the lookup order; everything it talks
//! to sits behind a trait so tests can swap in memory implementations:
//!
//! | Trait            | Production            | Tests                 |
//! |------------------|-----------------------|-----------------------|
//! | [`AssetStore`]   | [`LocalAssetStore`]   | [`MemoryAssetStore`]  |
//! | [`ObjectIndex`]  | [`LocalObjectIndex`]  | [`MemoryObjectIndex`] |
//! | [`RemoteFetch`]  | [`HttpFetcher`]       | [`StaticFetcher`]     |

pub mod config;
pub mod error;
pub mod fetch;
pub mod object;
pub mod probe;
pub mod resolver;
pub mod store;
pub mod transliterate;

pub use config::{AssetConfig, ConfigError, load_toml};
pub use error::{AssetError, AssetResult, FetchError};
pub use fetch::{HttpFetcher, RemoteFetch, StaticFetcher, StaticResponse};
pub use object::{LocalObjectIndex, MemoryObjectIndex, ObjectIndex};
pub use probe::{MediaInfo, probe};
pub use resolver::{AssetRequest, AssetResolver, ResolvedAsset};
pub use store::{AssetStore, LocalAssetStore, MemoryAssetStore};
pub use transliterate::{transliterate, url_filename};
