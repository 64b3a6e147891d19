//! In-memory block arena.
//!
//! Used for tests and dry-run migrations. All data is lost when dropped.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use folio_types::{BlockId, BlockRecord, BlockRef, RevisionId};

use crate::store::{BlockStore, StoredBlock};
use crate::{Result, StoreError, now_millis};

#[derive(Debug, Default)]
struct Arena {
    /// Revisions per block, oldest first.
    blocks: BTreeMap<BlockId, Vec<StoredBlock>>,
    /// Last revision number handed out.
    last_revision: u64,
}

impl Arena {
    fn next_revision(&mut self) -> RevisionId {
        self.last_revision += 1;
        RevisionId::new(self.last_revision)
    }

    fn push(&mut self, id: BlockId, record: &BlockRecord) -> BlockRef {
        let reference = BlockRef::new(id, self.next_revision());
        self.blocks.entry(id).or_default().push(StoredBlock {
            reference,
            record: record.clone(),
            created_at: now_millis(),
        });
        reference
    }
}

/// Thread-safe in-memory [`BlockStore`].
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    arena: RwLock<Arena>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total revisions across all blocks.
    pub fn revision_count(&self) -> usize {
        self.arena.read().blocks.values().map(Vec::len).sum()
    }

    /// Latest revision of every block, in id (creation) order.
    pub fn snapshot(&self) -> Vec<StoredBlock> {
        self.arena
            .read()
            .blocks
            .values()
            .filter_map(|revs| revs.last().cloned())
            .collect()
    }
}

impl BlockStore for MemoryBlockStore {
    fn create(&self, record: &BlockRecord) -> Result<BlockRef> {
        let mut arena = self.arena.write();
        let reference = arena.push(BlockId::new(), record);
        tracing::trace!(block = %reference, tag = record.tag_name(), "created block");
        Ok(reference)
    }

    fn resave(&self, id: BlockId, record: &BlockRecord) -> Result<BlockRef> {
        let mut arena = self.arena.write();
        if !arena.blocks.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(arena.push(id, record))
    }

    fn load(&self, reference: BlockRef) -> Result<Option<StoredBlock>> {
        let arena = self.arena.read();
        Ok(arena.blocks.get(&reference.id).and_then(|revs| {
            revs.iter()
                .find(|b| b.reference.revision == reference.revision)
                .cloned()
        }))
    }

    fn latest(&self, id: BlockId) -> Result<Option<StoredBlock>> {
        let arena = self.arena.read();
        Ok(arena.blocks.get(&id).and_then(|revs| revs.last().cloned()))
    }

    fn block_count(&self) -> Result<usize> {
        Ok(self.arena.read().blocks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(html: &str) -> BlockRecord {
        BlockRecord::Paragraph { html: html.into() }
    }

    #[test]
    fn test_create_then_load() {
        let store = MemoryBlockStore::new();
        let r = store.create(&para("<b>hi</b>")).unwrap();

        let loaded = store.load(r).unwrap().unwrap();
        assert_eq!(loaded.reference, r);
        assert_eq!(loaded.record, para("<b>hi</b>"));
        assert_eq!(store.block_count().unwrap(), 1);
    }

    #[test]
    fn test_revisions_are_store_wide_and_increasing() {
        let store = MemoryBlockStore::new();
        let a = store.create(&para("a")).unwrap();
        let b = store.create(&para("b")).unwrap();
        assert!(b.revision > a.revision);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_resave_keeps_old_revision_readable() {
        let store = MemoryBlockStore::new();
        let first = store.create(&para("v1")).unwrap();
        let second = store.resave(first.id, &para("v2")).unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.revision > first.revision);
        assert_eq!(store.load(first).unwrap().unwrap().record, para("v1"));
        assert_eq!(store.latest(first.id).unwrap().unwrap().record, para("v2"));
        assert_eq!(store.block_count().unwrap(), 1);
        assert_eq!(store.revision_count(), 2);
    }

    #[test]
    fn test_resave_unknown_block_fails() {
        let store = MemoryBlockStore::new();
        let err = store.resave(BlockId::new(), &para("x")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_load_missing_revision_is_none() {
        let store = MemoryBlockStore::new();
        let r = store.create(&para("x")).unwrap();
        let bogus = BlockRef::new(r.id, RevisionId::new(r.revision.get() + 10));
        assert!(store.load(bogus).unwrap().is_none());
    }
}
