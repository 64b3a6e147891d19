//! Block schema: tag names and the persisted record form.
//!
//! ## Design: BlockTag + BlockRecord
//!
//! `BlockTag` is the discriminator as it appears on the wire (`"tag"` field).
//! `BlockRecord` is what the store keeps: one variant per tag, closed, so both
//! transducers match exhaustively and a new tag is a compile error in both
//! directions until it is handled.
//!
//! Interior blocks (section, list, question, nested list items) hold ordered
//! [`BlockRef`]s to children that were persisted before them. References only
//! point forward in creation order, so the graph cannot contain cycles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::asset::AssetRef;
use crate::ids::BlockRef;

/// Wire-level block tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(ascii_case_insensitive)]
pub enum BlockTag {
    #[strum(serialize = "paragraph")]
    Paragraph,
    /// `quote` is the publication name of a blockquote; accepted on input.
    #[strum(serialize = "blockquote", serialize = "quote")]
    Blockquote,
    #[strum(serialize = "youtube")]
    Youtube,
    #[strum(serialize = "image")]
    Image,
    #[strum(serialize = "table")]
    Table,
    #[strum(serialize = "section")]
    Section,
    #[strum(serialize = "list")]
    List,
    #[serde(alias = "list_item")]
    #[strum(serialize = "listItem", serialize = "list_item")]
    ListItem,
    #[strum(serialize = "question")]
    Question,
    #[strum(serialize = "code")]
    Code,
    #[strum(serialize = "button")]
    Button,
}

impl BlockTag {
    /// Parse from string (case-insensitive, accepts aliases).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Paragraph => "paragraph",
            BlockTag::Blockquote => "blockquote",
            BlockTag::Youtube => "youtube",
            BlockTag::Image => "image",
            BlockTag::Table => "table",
            BlockTag::Section => "section",
            BlockTag::List => "list",
            BlockTag::ListItem => "listItem",
            BlockTag::Question => "question",
            BlockTag::Code => "code",
            BlockTag::Button => "button",
        }
    }
}

impl std::fmt::Display for BlockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A list item holds text or exactly one nested list, never both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListItemContent {
    /// Sanitized rich text.
    Text(String),
    /// Reference to a persisted `List` record.
    Nested(BlockRef),
}

/// Persisted image payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub asset: AssetRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Caption or body rich text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Attribution lines joined with `\n`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

/// The persisted attribute set of one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockRecord {
    Paragraph {
        html: String,
    },
    Blockquote {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        citation: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Youtube {
        video_id: String,
        width: u32,
        height: u32,
    },
    Image(ImageRecord),
    Table {
        html: String,
    },
    Section {
        title: String,
        content: Vec<BlockRef>,
    },
    List {
        ordered: bool,
        items: Vec<BlockRef>,
    },
    ListItem {
        content: ListItemContent,
    },
    Question {
        prompt: String,
        answer: Vec<BlockRef>,
    },
    Code {
        code: String,
    },
    Button {
        uri: String,
        title: String,
    },
    /// A tag this schema does not know. Only the name survives.
    Unknown {
        name: String,
    },
}

impl BlockRecord {
    /// The tag of this record, `None` for `Unknown`.
    pub fn tag(&self) -> Option<BlockTag> {
        Some(match self {
            BlockRecord::Paragraph { .. } => BlockTag::Paragraph,
            BlockRecord::Blockquote { .. } => BlockTag::Blockquote,
            BlockRecord::Youtube { .. } => BlockTag::Youtube,
            BlockRecord::Image(_) => BlockTag::Image,
            BlockRecord::Table { .. } => BlockTag::Table,
            BlockRecord::Section { .. } => BlockTag::Section,
            BlockRecord::List { .. } => BlockTag::List,
            BlockRecord::ListItem { .. } => BlockTag::ListItem,
            BlockRecord::Question { .. } => BlockTag::Question,
            BlockRecord::Code { .. } => BlockTag::Code,
            BlockRecord::Button { .. } => BlockTag::Button,
            BlockRecord::Unknown { .. } => return None,
        })
    }

    /// Tag name for logging and storage columns.
    pub fn tag_name(&self) -> &str {
        match self {
            BlockRecord::Unknown { name } => name,
            other => other.tag().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    /// Direct child references in order.
    pub fn children(&self) -> Vec<BlockRef> {
        match self {
            BlockRecord::Section { content, .. } => content.clone(),
            BlockRecord::List { items, .. } => items.clone(),
            BlockRecord::Question { answer, .. } => answer.clone(),
            BlockRecord::ListItem {
                content: ListItemContent::Nested(r),
            } => vec![*r],
            _ => Vec::new(),
        }
    }
}
