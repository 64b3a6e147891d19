//! Block schema for folio.
//!
//! This crate is the leaf of the workspace: typed ids, the wire tag enum, the
//! persisted block record and asset references. It has no internal folio
//! dependencies.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------------|
//! | Type              | Purpose                                            |
//! |-------------------|----------------------------------------------------|
//! | [`BlockId`]       | Store-assigned block identity (UUIDv7)             |
//! | [`RevisionId`]    | Store-wide revision counter                        |
//! | [`BlockRef`]      | `{id, revision}` reference returned on save        |
//! | [`BlockTag`]      | Wire discriminator (`"tag"`)                       |
//! | [`BlockRecord`]   | Persisted attribute set, one variant per tag       |
//! | [`AssetRef`]      | Materialized image/file embedded in image records  |
//! |-------------------|----------------------------------------------------|

pub mod asset;
pub mod block;
pub mod ids;

pub use asset::AssetRef;
pub use block::{BlockRecord, BlockTag, ImageRecord, ListItemContent};
pub use ids::{BlockId, BlockRef, RefParseError, RevisionId};
