//! SQLite persistence for block revisions.
//!
//! Append-only revisions table keyed by an autoincrement revision number,
//! plus a small `blocks` table recording which ids exist.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use folio_types::{BlockId, BlockRecord, BlockRef, RevisionId};

use crate::store::{BlockStore, StoredBlock};
use crate::{Result, StoreError, now_millis};

const SCHEMA: &str = r#"
-- Blocks (one row per id)
CREATE TABLE IF NOT EXISTS blocks (
    id TEXT PRIMARY KEY,
    tag TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- Revisions (append-only, immutable)
CREATE TABLE IF NOT EXISTS block_revisions (
    revision INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id TEXT NOT NULL REFERENCES blocks(id),
    data TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_revisions_block ON block_revisions(block_id, revision);
"#;

/// [`BlockStore`] backed by a SQLite database.
pub struct SqliteBlockStore {
    conn: Mutex<Connection>,
}

impl SqliteBlockStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn append_revision(
        conn: &Connection,
        id: BlockId,
        record: &BlockRecord,
        created_at: u64,
    ) -> Result<BlockRef> {
        let data = serde_json::to_string(record)?;
        conn.execute(
            "INSERT INTO block_revisions (block_id, data, created_at) VALUES (?1, ?2, ?3)",
            params![id.to_hex(), data, created_at as i64],
        )?;
        let revision = conn.last_insert_rowid();
        let revision = u64::try_from(revision)
            .map_err(|_| StoreError::Internal(format!("negative revision {revision}")))?;
        Ok(BlockRef::new(id, RevisionId::new(revision)))
    }

    fn decode(block_id: &str, revision: i64, data: &str, created_at: i64) -> Result<StoredBlock> {
        let id = BlockId::parse(block_id)
            .map_err(|e| StoreError::Internal(format!("bad block id {block_id:?}: {e}")))?;
        let record: BlockRecord = serde_json::from_str(data)?;
        Ok(StoredBlock {
            reference: BlockRef::new(id, RevisionId::new(revision as u64)),
            record,
            created_at: created_at as u64,
        })
    }
}

impl BlockStore for SqliteBlockStore {
    fn create(&self, record: &BlockRecord) -> Result<BlockRef> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let id = BlockId::new();
        let now = now_millis();
        tx.execute(
            "INSERT INTO blocks (id, tag, created_at) VALUES (?1, ?2, ?3)",
            params![id.to_hex(), record.tag_name(), now as i64],
        )?;
        let reference = Self::append_revision(&tx, id, record, now)?;
        tx.commit()?;
        tracing::trace!(block = %reference, tag = record.tag_name(), "created block");
        Ok(reference)
    }

    fn resave(&self, id: BlockId, record: &BlockRecord) -> Result<BlockRef> {
        let conn = self.conn.lock();
        let exists: Option<String> = conn
            .query_row(
                "SELECT id FROM blocks WHERE id = ?1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound(id));
        }
        Self::append_revision(&conn, id, record, now_millis())
    }

    fn load(&self, reference: BlockRef) -> Result<Option<StoredBlock>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT block_id, revision, data, created_at FROM block_revisions
                 WHERE block_id = ?1 AND revision = ?2",
                params![reference.id.to_hex(), reference.revision.get() as i64],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, rev, data, at)| Self::decode(&id, rev, &data, at))
            .transpose()
    }

    fn latest(&self, id: BlockId) -> Result<Option<StoredBlock>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT block_id, revision, data, created_at FROM block_revisions
                 WHERE block_id = ?1 ORDER BY revision DESC LIMIT 1",
                params![id.to_hex()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, rev, data, at)| Self::decode(&id, rev, &data, at))
            .transpose()
    }

    fn block_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{AssetRef, ImageRecord, ListItemContent};

    #[test]
    fn test_create_and_load() {
        let store = SqliteBlockStore::in_memory().unwrap();
        let rec = BlockRecord::Code {
            code: "fn main() {}".into(),
        };
        let r = store.create(&rec).unwrap();

        let loaded = store.load(r).unwrap().unwrap();
        assert_eq!(loaded.reference, r);
        assert_eq!(loaded.record, rec);
        assert_eq!(store.block_count().unwrap(), 1);
    }

    #[test]
    fn test_revisions_append() {
        let store = SqliteBlockStore::in_memory().unwrap();
        let v1 = BlockRecord::Paragraph { html: "one".into() };
        let v2 = BlockRecord::Paragraph { html: "two".into() };

        let first = store.create(&v1).unwrap();
        let second = store.resave(first.id, &v2).unwrap();
        assert!(second.revision > first.revision);

        assert_eq!(store.load(first).unwrap().unwrap().record, v1);
        assert_eq!(store.latest(first.id).unwrap().unwrap().record, v2);
        assert_eq!(store.block_count().unwrap(), 1);
    }

    #[test]
    fn test_resave_missing() {
        let store = SqliteBlockStore::in_memory().unwrap();
        let err = store
            .resave(BlockId::new(), &BlockRecord::Code { code: "x".into() })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_nested_records_roundtrip() {
        let store = SqliteBlockStore::in_memory().unwrap();
        let item = store
            .create(&BlockRecord::ListItem {
                content: ListItemContent::Text("a".into()),
            })
            .unwrap();
        let list = store
            .create(&BlockRecord::List {
                ordered: true,
                items: vec![item],
            })
            .unwrap();
        let image = BlockRecord::Image(ImageRecord {
            asset: AssetRef::new("public://image/2024-01/a.png", "a.png", "image/png")
                .with_size(10, 20),
            alt: Some("alt".into()),
            html: None,
            attribution: None,
        });
        let img = store.create(&image).unwrap();

        let loaded = store.load(list).unwrap().unwrap();
        assert_eq!(loaded.record.children(), vec![item]);
        assert_eq!(store.load(img).unwrap().unwrap().record, image);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.db");

        let r = {
            let store = SqliteBlockStore::open(&path).unwrap();
            store
                .create(&BlockRecord::Button {
                    uri: "https://example.org".into(),
                    title: "Go".into(),
                })
                .unwrap()
        };

        let store = SqliteBlockStore::open(&path).unwrap();
        let loaded = store.load(r).unwrap().unwrap();
        assert_eq!(loaded.record.tag_name(), "button");
    }
}
