//! Typed identifiers for persisted blocks.
//!
//! `BlockId` wraps a UUIDv7 (time-ordered, globally unique) assigned by the
//! store on creation. `RevisionId` is a store-wide counter that advances on
//! every create and every explicit re-save. Neither is ever minted by the
//! transducers; they only carry what the store hands back.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A persisted block identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(uuid::Uuid);

impl BlockId {
    /// Create a new time-ordered ID. Only stores should call this.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters, for log lines only.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Full 32-character hex string (no hyphens).
    pub fn to_hex(&self) -> String {
        self.0.as_simple().to_string()
    }

    /// Parse from a hex string or standard UUID format.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for BlockId {
    fn from(u: uuid::Uuid) -> Self {
        Self(u)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.short())
    }
}

/// A store-wide revision number. Strictly increasing per store.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Debug for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevisionId({})", self.0)
    }
}

/// Error parsing a [`BlockRef`] key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefParseError {
    #[error("malformed block key: {0}")]
    Malformed(String),
}

/// The `{id, revision}` pair handed back by the store when a block is saved.
///
/// Parents embed these to point at children; a reference always addresses
/// one immutable revision.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockRef {
    pub id: BlockId,
    pub revision: RevisionId,
}

impl BlockRef {
    pub fn new(id: BlockId, revision: RevisionId) -> Self {
        Self { id, revision }
    }

    /// Compact string key: `"{id_hex}:{revision}"`.
    pub fn to_key(&self) -> String {
        format!("{}:{}", self.id.to_hex(), self.revision.get())
    }

    /// Parse from `"{id_hex}:{revision}"`.
    pub fn from_key(key: &str) -> Result<Self, RefParseError> {
        let (id, rev) = key
            .split_once(':')
            .ok_or_else(|| RefParseError::Malformed(key.to_string()))?;
        let id = BlockId::parse(id).map_err(|_| RefParseError::Malformed(key.to_string()))?;
        let rev: u64 = rev
            .parse()
            .map_err(|_| RefParseError::Malformed(key.to_string()))?;
        Ok(Self::new(id, RevisionId::new(rev)))
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id.short(), self.revision)
    }
}

impl fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockRef({}@{})", self.id.short(), self.revision)
    }
}
