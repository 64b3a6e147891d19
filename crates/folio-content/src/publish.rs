//! Publication: persisted block graph → wire JSON.
//!
//! Read-only. Every reference is expanded depth-first; dangling references,
//! unknown records and images whose file has gone missing are logged and
//! left out of the output instead of failing the document.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use folio_assets::AssetStore;
use folio_store::BlockStore;
use folio_types::{BlockRecord, BlockRef, ImageRecord, ListItemContent};

use crate::error::PublishError;
use crate::normalize::{Fragment, ListEntry, ListFragment, split};
use crate::render::Renderer;

/// Marker style of a published list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListPrefix {
    Number,
    Bullet,
}

impl ListPrefix {
    pub fn from_ordered(ordered: bool) -> Self {
        if ordered { Self::Number } else { Self::Bullet }
    }
}

/// One block of published output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "camelCase")]
pub enum PublishedBlock {
    Paragraph {
        text: String,
    },
    Quote {
        text: Vec<PublishedBlock>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cite: Option<String>,
    },
    Youtube {
        id: String,
        width: u32,
        height: u32,
    },
    Image {
        image: PublishedImage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribution: Option<Vec<String>>,
    },
    Table {
        tables: Vec<String>,
    },
    Section {
        title: String,
        content: Vec<PublishedBlock>,
    },
    List {
        prefix: ListPrefix,
        items: Vec<PublishedItem>,
    },
    Question {
        prompt: String,
        answer: Vec<PublishedBlock>,
    },
    Code {
        code: String,
    },
    Button {
        text: String,
        uri: String,
    },
}

/// An entry of a published list: rich text, or sub-content (usually a
/// nested list) wrapped in an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedItem {
    Text(String),
    Blocks(Vec<PublishedBlock>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedImage {
    pub uri: String,
    pub alt: String,
    pub source: ImageSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub media_type: String,
    pub uri: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Recursion context for [`Publisher::expand`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandContext {
    /// Expanding the items of a list.
    pub in_list: bool,
}

impl ExpandContext {
    pub fn block() -> Self {
        Self { in_list: false }
    }

    pub fn list() -> Self {
        Self { in_list: true }
    }
}

/// Expands stored references into wire blocks.
pub struct Publisher {
    store: Arc<dyn BlockStore>,
    assets: Arc<dyn AssetStore>,
    renderer: Renderer,
    first_table: Regex,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn BlockStore>,
        assets: Arc<dyn AssetStore>,
        renderer: Renderer,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            store,
            assets,
            renderer,
            first_table: Regex::new(r"(?s)<table[^>]*>.*?</table>")?,
        })
    }

    /// Publish a sequence of references in order.
    #[tracing::instrument(skip(self, refs), fields(count = refs.len()))]
    pub fn publish(&self, refs: &[BlockRef]) -> Result<Vec<PublishedBlock>, PublishError> {
        let mut out = Vec::with_capacity(refs.len());
        for reference in refs {
            out.extend(self.expand(*reference, ExpandContext::block())?);
        }
        Ok(out)
    }

    /// [`publish`](Self::publish), serialized to a JSON array.
    pub fn publish_json(&self, refs: &[BlockRef]) -> Result<serde_json::Value, PublishError> {
        let blocks = self.publish(refs)?;
        Ok(serde_json::to_value(blocks)?)
    }

    /// Expand one reference into zero or more blocks.
    ///
    /// A paragraph may fan out into several blocks when its body mixes
    /// paragraphs and lists.
    pub fn expand(
        &self,
        reference: BlockRef,
        ctx: ExpandContext,
    ) -> Result<Vec<PublishedBlock>, PublishError> {
        let Some(stored) = self.store.load(reference)? else {
            tracing::warn!(block = %reference, "dangling reference omitted");
            return Ok(Vec::new());
        };

        let block = match stored.record {
            BlockRecord::Paragraph { html } => return Ok(self.paragraphs(&html)),
            BlockRecord::Blockquote { html, citation } => {
                let text = self.renderer.render(&html).trim().to_string();
                PublishedBlock::Quote {
                    text: vec![PublishedBlock::Paragraph { text }],
                    cite: citation.filter(|c| !c.trim().is_empty()),
                }
            }
            BlockRecord::Youtube {
                video_id,
                width,
                height,
            } => PublishedBlock::Youtube {
                id: video_id,
                width,
                height,
            },
            BlockRecord::Image(image) => match self.image(&image) {
                Some(block) => block,
                None => {
                    tracing::warn!(
                        block = %reference,
                        uri = %image.asset.storage_uri,
                        "image file missing, omitted"
                    );
                    return Ok(Vec::new());
                }
            },
            BlockRecord::Table { html } => PublishedBlock::Table {
                tables: vec![self.table(&html)],
            },
            BlockRecord::Section { title, content } => PublishedBlock::Section {
                title,
                content: self.expand_all(&content, ExpandContext::block())?,
            },
            BlockRecord::List { ordered, items } => PublishedBlock::List {
                prefix: ListPrefix::from_ordered(ordered),
                items: self.expand_list_items(&items)?,
            },
            BlockRecord::ListItem { content } if !ctx.in_list => match content {
                ListItemContent::Text(html) => return Ok(self.paragraphs(&html)),
                ListItemContent::Nested(list) => return self.expand(list, ctx),
            },
            BlockRecord::ListItem { .. } => {
                tracing::warn!(block = %reference, "list item nested in list item, omitted");
                return Ok(Vec::new());
            }
            BlockRecord::Question { prompt, answer } => PublishedBlock::Question {
                prompt,
                answer: self.expand_all(&answer, ExpandContext::block())?,
            },
            BlockRecord::Code { code } => PublishedBlock::Code { code },
            BlockRecord::Button { uri, title } => PublishedBlock::Button { text: title, uri },
            BlockRecord::Unknown { name } => {
                tracing::debug!(block = %reference, tag = %name, "unknown record omitted");
                return Ok(Vec::new());
            }
        };
        Ok(vec![block])
    }

    fn expand_all(
        &self,
        refs: &[BlockRef],
        ctx: ExpandContext,
    ) -> Result<Vec<PublishedBlock>, PublishError> {
        let mut out = Vec::with_capacity(refs.len());
        for reference in refs {
            out.extend(self.expand(*reference, ctx)?);
        }
        Ok(out)
    }

    /// Expand the items of a list.
    pub fn expand_list_items(&self, refs: &[BlockRef]) -> Result<Vec<PublishedItem>, PublishError> {
        let mut items = Vec::with_capacity(refs.len());
        for &reference in refs {
            let Some(stored) = self.store.load(reference)? else {
                tracing::warn!(block = %reference, "dangling list item omitted");
                continue;
            };
            match stored.record {
                BlockRecord::ListItem {
                    content: ListItemContent::Text(html),
                } => items.push(PublishedItem::Text(self.renderer.render(&html))),
                BlockRecord::ListItem {
                    content: ListItemContent::Nested(list),
                } => {
                    let nested = self.expand(list, ExpandContext::list())?;
                    if !nested.is_empty() {
                        items.push(PublishedItem::Blocks(nested));
                    }
                }
                // Anything else is rich sub-content of the list.
                _ => {
                    let blocks = self.expand(reference, ExpandContext::list())?;
                    if !blocks.is_empty() {
                        items.push(PublishedItem::Blocks(blocks));
                    }
                }
            }
        }
        Ok(items)
    }

    /// Render a rich-text body and split it into paragraph and list blocks.
    fn paragraphs(&self, html: &str) -> Vec<PublishedBlock> {
        split(&self.renderer.render(html))
            .into_iter()
            .map(|fragment| match fragment {
                Fragment::Html(text) => PublishedBlock::Paragraph { text },
                Fragment::List(list) => list_block(list),
            })
            .collect()
    }

    fn image(&self, image: &ImageRecord) -> Option<PublishedBlock> {
        let asset = &image.asset;
        let present = self
            .assets
            .path_for(&asset.storage_uri)
            .is_some_and(|path| self.assets.exists(&path));
        if !present {
            return None;
        }

        let url = self.assets.url_for(&asset.storage_uri);
        let title = image
            .html
            .as_deref()
            .map(|html| self.renderer.render(html).trim().to_string())
            .filter(|t| !t.is_empty());
        let attribution = image.attribution.as_deref().map(attribution_lines);

        Some(PublishedBlock::Image {
            image: PublishedImage {
                uri: url.clone(),
                alt: image.alt.clone().unwrap_or_default(),
                source: ImageSource {
                    media_type: asset.media_type.clone(),
                    uri: url,
                    filename: asset.filename.clone(),
                },
                size: asset
                    .size()
                    .map(|(width, height)| ImageSize { width, height }),
            },
            title,
            attribution: attribution.filter(|lines| !lines.is_empty()),
        })
    }

    /// Flatten to one line and keep only the first table element.
    fn table(&self, html: &str) -> String {
        let flat = self.renderer.render(html).replace(['\r', '\n'], "");
        match self.first_table.find(&flat) {
            Some(table) => table.as_str().to_string(),
            None => format!("<table>{flat}</table>"),
        }
    }
}

fn list_block(list: ListFragment) -> PublishedBlock {
    PublishedBlock::List {
        prefix: ListPrefix::from_ordered(list.ordered),
        items: list
            .entries
            .into_iter()
            .map(|entry| match entry {
                ListEntry::Text(text) => PublishedItem::Text(text),
                ListEntry::Nested(nested) => PublishedItem::Blocks(vec![list_block(nested)]),
            })
            .collect(),
    }
}

fn attribution_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
