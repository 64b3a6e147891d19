//! Block persistence for folio.
//!
//! The transducers only see the [`BlockStore`] trait. Two backends ship:
//!
//! - [`MemoryBlockStore`]: an arena keyed by block id, for tests and dry runs
//! - [`SqliteBlockStore`]: append-only revisions in SQLite
//!
//! # Semantics
//!
//! - `create` assigns a fresh [`BlockId`] and a new revision.
//! - `resave` appends a new revision to an existing block; earlier revisions
//!   stay readable and are never modified.
//! - Revision numbers are store-wide and strictly increasing.
//! - There is no multi-block transaction. A caller that fails halfway through
//!   a tree leaves the already-created children behind.

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::StoreError;
pub use memory::MemoryBlockStore;
pub use sqlite::SqliteBlockStore;
pub use store::{BlockStore, StoredBlock};

pub use folio_types::{BlockId, BlockRecord, BlockRef, RevisionId};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
