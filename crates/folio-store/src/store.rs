//! The persistence contract shared by all backends.

use serde::{Deserialize, Serialize};

use folio_types::{BlockId, BlockRecord, BlockRef};

use crate::Result;

/// One immutable revision of a block as read back from a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub reference: BlockRef,
    pub record: BlockRecord,
    /// Unix milliseconds when this revision was written.
    pub created_at: u64,
}

/// Persistence store for block records.
///
/// Implementations use interior mutability so a shared reference can be
/// handed to both transducers; publication only ever calls the read methods.
pub trait BlockStore: Send + Sync {
    /// Persist a new block and return its first reference.
    fn create(&self, record: &BlockRecord) -> Result<BlockRef>;

    /// Append a new revision to an existing block.
    fn resave(&self, id: BlockId, record: &BlockRecord) -> Result<BlockRef>;

    /// Load the exact revision a reference points at.
    fn load(&self, reference: BlockRef) -> Result<Option<StoredBlock>>;

    /// Load the newest revision of a block.
    fn latest(&self, id: BlockId) -> Result<Option<StoredBlock>>;

    /// Number of distinct blocks (not revisions).
    fn block_count(&self) -> Result<usize>;
}
