//! Ingestion: wire JSON → persisted block graph.
//!
//! The walk is depth-first and persists children before their parent, so
//! every interior record only references blocks that already exist. There
//! is no document-level transaction: when the store fails halfway, the
//! children created so far stay behind.
//!
//! Per-block problems never abort the walk. An image whose asset cannot be
//! resolved or a value without a tag is logged and skipped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use folio_assets::{AssetRequest, AssetResolver};
use folio_store::BlockStore;
use folio_types::{BlockRecord, BlockRef, BlockTag, ImageRecord, ListItemContent};

use crate::error::IngestError;
use crate::sanitize::{BASIC_HTML, Sanitizer};

/// Result of [`Ingestor::transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    Single(Option<BlockRef>),
    Many(Vec<BlockRef>),
}

/// Recursion context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemContext {
    /// Values are items of a list.
    pub list_item: bool,
}

impl ItemContext {
    pub fn block() -> Self {
        Self { list_item: false }
    }

    pub fn list() -> Self {
        Self { list_item: true }
    }
}

/// Where resolved assets of this document land.
#[derive(Debug, Clone, Default)]
pub struct AssetTarget {
    /// Destination folder; the resolver default when `None`.
    pub content_type: Option<String>,
    /// Creation time of the owning document; dates asset folders.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Walks wire JSON and persists blocks.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn BlockStore>,
    sanitizer: Arc<dyn Sanitizer>,
    resolver: Arc<AssetResolver>,
    target: AssetTarget,
    table_img: Regex,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn BlockStore>,
        sanitizer: Arc<dyn Sanitizer>,
        resolver: Arc<AssetResolver>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            store,
            sanitizer,
            resolver,
            target: AssetTarget::default(),
            table_img: Regex::new(r#"<img\s[^>]*?src="([^"]+)""#)?,
        })
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.target.content_type = Some(content_type.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.target.timestamp = Some(timestamp);
        self
    }

    /// Ingest one value, or with `multiple` every element of an array.
    #[tracing::instrument(skip(self, value))]
    pub fn transform(&self, value: &Value, multiple: bool) -> Result<Ingested, IngestError> {
        if multiple {
            self.ingest_many(value).map(Ingested::Many)
        } else {
            self.ingest(value).map(Ingested::Single)
        }
    }

    /// Ingest a single value into zero or one block.
    pub fn ingest(&self, value: &Value) -> Result<Option<BlockRef>, IngestError> {
        self.process(value, ItemContext::block())
    }

    /// Ingest every element of an array. A non-array is treated as a
    /// one-element sequence.
    pub fn ingest_many(&self, values: &Value) -> Result<Vec<BlockRef>, IngestError> {
        match values {
            Value::Array(items) => self.process_all(items, ItemContext::block()),
            other => Ok(self.ingest(other)?.into_iter().collect()),
        }
    }

    fn process_all(&self, items: &[Value], ctx: ItemContext) -> Result<Vec<BlockRef>, IngestError> {
        let mut refs = Vec::with_capacity(items.len());
        for item in items {
            if let Some(r) = self.process(item, ctx)? {
                refs.push(r);
            }
        }
        Ok(refs)
    }

    fn process(&self, value: &Value, ctx: ItemContext) -> Result<Option<BlockRef>, IngestError> {
        if is_empty(value) {
            return Ok(None);
        }

        match value {
            Value::String(text) if ctx.list_item => {
                let record = BlockRecord::ListItem {
                    content: ListItemContent::Text(self.rich_text(text)),
                };
                self.persist(&record).map(Some)
            }
            // Publication wraps a list item's sub-content as `[block]`.
            Value::Array(items) if ctx.list_item => match items.as_slice() {
                [inner] => self.process(inner, ctx),
                _ => {
                    tracing::warn!(len = items.len(), "array list item is not a single block, dropped");
                    Ok(None)
                }
            },
            Value::Object(map) => match tag_of(value) {
                Some(Ok(tag)) => self.process_tagged(tag, map, ctx),
                Some(Err(name)) => {
                    tracing::debug!(tag = %name, "unknown tag, content dropped");
                    self.persist(&BlockRecord::Unknown { name }).map(Some)
                }
                None => {
                    tracing::warn!("object without tag skipped");
                    Ok(None)
                }
            },
            other => {
                tracing::warn!(kind = json_kind(other), "untagged value skipped");
                Ok(None)
            }
        }
    }

    fn process_tagged(
        &self,
        tag: BlockTag,
        map: &Map<String, Value>,
        ctx: ItemContext,
    ) -> Result<Option<BlockRef>, IngestError> {
        if ctx.list_item {
            return self.process_list_entry(tag, map);
        }

        let record = match tag {
            BlockTag::Paragraph => BlockRecord::Paragraph {
                html: self.rich_text(str_field(map, &["text", "body"]).unwrap_or_default()),
            },
            BlockTag::Blockquote => BlockRecord::Blockquote {
                html: self.rich_text(&quote_body(map)),
                citation: str_field(map, &["citation", "cite"])
                    .filter(|c| !c.trim().is_empty())
                    .map(str::to_string),
            },
            BlockTag::Youtube => BlockRecord::Youtube {
                video_id: str_field(map, &["id", "videoId"])
                    .unwrap_or_default()
                    .to_string(),
                width: int_field(map, "width"),
                height: int_field(map, "height"),
            },
            BlockTag::Image => match self.image_record(map) {
                Some(image) => BlockRecord::Image(image),
                None => return Ok(None),
            },
            BlockTag::Table => BlockRecord::Table {
                html: self.table_html(map),
            },
            BlockTag::Section => BlockRecord::Section {
                title: str_field(map, &["title"]).unwrap_or_default().to_string(),
                content: self.children(map, "content", ItemContext::block())?,
            },
            BlockTag::List => self.list_record(map)?,
            BlockTag::ListItem => BlockRecord::ListItem {
                content: ListItemContent::Text(
                    self.rich_text(str_field(map, &["text", "body"]).unwrap_or_default()),
                ),
            },
            BlockTag::Question => BlockRecord::Question {
                prompt: str_field(map, &["prompt", "question"])
                    .unwrap_or_default()
                    .to_string(),
                answer: self.children(map, "answer", ItemContext::block())?,
            },
            BlockTag::Code => BlockRecord::Code {
                code: str_field(map, &["code", "text"]).unwrap_or_default().to_string(),
            },
            BlockTag::Button => BlockRecord::Button {
                title: str_field(map, &["text", "title"]).unwrap_or_default().to_string(),
                uri: str_field(map, &["uri"]).unwrap_or_default().to_string(),
            },
        };

        self.persist(&record).map(Some)
    }

    /// An object inside a list's `items`. Blocks other than list items and
    /// nested lists are persisted as themselves and referenced directly.
    fn process_list_entry(
        &self,
        tag: BlockTag,
        map: &Map<String, Value>,
    ) -> Result<Option<BlockRef>, IngestError> {
        let content = match tag {
            BlockTag::ListItem => ListItemContent::Text(
                self.rich_text(str_field(map, &["text", "body"]).unwrap_or_default()),
            ),
            BlockTag::List => {
                let nested = self.list_record(map)?;
                ListItemContent::Nested(self.persist(&nested)?)
            }
            other => return self.process_tagged(other, map, ItemContext::block()),
        };
        self.persist(&BlockRecord::ListItem { content }).map(Some)
    }

    fn list_record(&self, map: &Map<String, Value>) -> Result<BlockRecord, IngestError> {
        let ordered = match map.get("ordered") {
            Some(v) => truthy(v),
            None => map.get("prefix").and_then(Value::as_str) == Some("number"),
        };
        Ok(BlockRecord::List {
            ordered,
            items: self.children(map, "items", ItemContext::list())?,
        })
    }

    fn children(
        &self,
        map: &Map<String, Value>,
        key: &str,
        ctx: ItemContext,
    ) -> Result<Vec<BlockRef>, IngestError> {
        match map.get(key) {
            Some(Value::Array(items)) => self.process_all(items, ctx),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Ok(self.process(other, ctx)?.into_iter().collect()),
        }
    }

    fn image_record(&self, map: &Map<String, Value>) -> Option<ImageRecord> {
        let Some(locator) = image_locator(map) else {
            tracing::warn!("image without locator dropped");
            return None;
        };
        let alt = str_field(map, &["alt", "altText"]).or_else(|| {
            map.get("image")
                .and_then(|i| i.get("alt"))
                .and_then(Value::as_str)
        });

        let request = self.asset_request(locator).with_alt(alt);
        let Some(resolved) = self.resolver.resolve(&request) else {
            tracing::warn!(locator, "image asset unresolved, block dropped");
            return None;
        };

        let caption = str_field(map, &["caption", "title"]).filter(|c| !c.trim().is_empty());
        let body = str_field(map, &["text", "body"]).filter(|b| !b.trim().is_empty());
        let html = caption.or(body).map(|h| self.rich_text(h));

        Some(ImageRecord {
            asset: resolved.asset,
            alt: resolved.alt,
            html,
            attribution: attribution(map.get("attribution")),
        })
    }

    /// Sanitize, then copy every embedded image into the asset store and
    /// point it at the stored copy.
    fn table_html(&self, map: &Map<String, Value>) -> String {
        let raw = str_field(map, &["html"])
            .map(str::to_string)
            .or_else(|| {
                map.get("tables")
                    .and_then(Value::as_array)
                    .map(|t| t.iter().filter_map(Value::as_str).collect::<String>())
            })
            .unwrap_or_default();
        let mut html = self.rich_text(&raw);

        let sources: Vec<String> = self
            .table_img
            .captures_iter(&html)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        let mut seen = std::collections::HashSet::new();
        for src in sources {
            if !seen.insert(src.clone()) {
                continue;
            }
            let locator = src.replace("&amp;", "&");
            match self.resolver.resolve(&self.asset_request(&locator)) {
                Some(resolved) => {
                    let url = self.resolver.url_for(&resolved.asset);
                    html = html.replace(&format!("src=\"{src}\""), &format!("src=\"{url}\""));
                }
                None => tracing::debug!(src = %locator, "table image unresolved, kept as is"),
            }
        }
        html
    }

    fn asset_request<'a>(&'a self, locator: &'a str) -> AssetRequest<'a> {
        let mut request = AssetRequest::new(locator);
        if let Some(content_type) = &self.target.content_type {
            request = request.with_content_type(content_type);
        }
        if let Some(timestamp) = self.target.timestamp {
            request = request.with_timestamp(timestamp);
        }
        request
    }

    fn rich_text(&self, html: &str) -> String {
        self.sanitizer.sanitize(html, BASIC_HTML)
    }

    fn persist(&self, record: &BlockRecord) -> Result<BlockRef, IngestError> {
        let reference = self.store.create(record)?;
        tracing::trace!(block = %reference, tag = record.tag_name(), "persisted");
        Ok(reference)
    }
}

/// `Some(Ok(tag))` for a known tag, `Some(Err(name))` for an unknown one,
/// `None` when the value carries no tag.
fn tag_of(value: &Value) -> Option<Result<BlockTag, String>> {
    let name = value
        .get("tag")
        .or_else(|| value.get("type"))
        .and_then(Value::as_str)?;
    Some(BlockTag::from_str(name).ok_or_else(|| name.to_string()))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| map.get(*k).and_then(Value::as_str))
}

fn int_field(map: &Map<String, Value>, key: &str) -> u32 {
    match map.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(s.trim(), "" | "0" | "false"),
        _ => false,
    }
}

/// The `image` field is a locator string, or on re-ingest the published
/// image object whose source URI is the locator.
fn image_locator(map: &Map<String, Value>) -> Option<&str> {
    let locator = match map.get("image").or_else(|| map.get("locator"))? {
        Value::String(s) => Some(s.as_str()),
        Value::Object(image) => image
            .get("source")
            .and_then(|s| s.get("uri"))
            .or_else(|| image.get("uri"))
            .and_then(Value::as_str),
        _ => None,
    };
    locator.filter(|s| !s.trim().is_empty())
}

/// Blockquote body: a string, or the published `[{tag: paragraph, text}]` shape.
fn quote_body(map: &Map<String, Value>) -> String {
    match map.get("text").or_else(|| map.get("body")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            match texts.as_slice() {
                [single] => single.to_string(),
                many => many.iter().map(|t| format!("<p>{t}</p>")).collect(),
            }
        }
        _ => String::new(),
    }
}

/// Attribution as a string or a list of lines, stored newline-joined.
fn attribution(value: Option<&Value>) -> Option<String> {
    let joined = match value? {
        Value::String(s) => s.clone(),
        Value::Array(lines) => lines
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };
    (!joined.trim().is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_assets::{AssetConfig, MemoryAssetStore, MemoryObjectIndex, StaticFetcher};
    use folio_store::MemoryBlockStore;
    use serde_json::json;

    use crate::sanitize::PolicySanitizer;

    fn setup(fetcher: StaticFetcher) -> (Arc<MemoryBlockStore>, Ingestor) {
        let store = Arc::new(MemoryBlockStore::new());
        let resolver = AssetResolver::new(
            AssetConfig::default(),
            Arc::new(MemoryAssetStore::default()),
            Arc::new(MemoryObjectIndex::new()),
            Arc::new(fetcher),
        )
        .unwrap();
        let ingestor = Ingestor::new(
            store.clone(),
            Arc::new(PolicySanitizer::new()),
            Arc::new(resolver),
        )
        .unwrap();
        (store, ingestor)
    }

    fn record(store: &MemoryBlockStore, r: BlockRef) -> BlockRecord {
        store.load(r).unwrap().unwrap().record
    }

    #[test]
    fn test_empty_values_yield_nothing() {
        let (store, ing) = setup(StaticFetcher::new());
        for v in [json!(null), json!(""), json!([]), json!({})] {
            assert_eq!(ing.ingest(&v).unwrap(), None);
        }
        assert_eq!(store.block_count().unwrap(), 0);
    }

    #[test]
    fn test_paragraph_is_sanitized() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({"tag": "paragraph", "text": "<p onclick='x'>Hi</p><script>x</script>"}))
            .unwrap()
            .unwrap();
        assert_eq!(
            record(&store, r),
            BlockRecord::Paragraph {
                html: "<p>Hi</p>".into()
            }
        );
    }

    #[test]
    fn test_bare_strings_become_list_items() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({"tag": "list", "ordered": false, "items": ["a", "b"]}))
            .unwrap()
            .unwrap();
        let BlockRecord::List { ordered, items } = record(&store, r) else {
            panic!("expected list");
        };
        assert!(!ordered);
        assert_eq!(items.len(), 2);
        assert_eq!(
            record(&store, items[1]),
            BlockRecord::ListItem {
                content: ListItemContent::Text("b".into())
            }
        );
        assert_eq!(store.block_count().unwrap(), 3);
    }

    #[test]
    fn test_nested_list_is_wrapped_in_item() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({
                "tag": "list",
                "ordered": false,
                "items": ["x", [{"tag": "list", "prefix": "number", "items": ["y"]}]]
            }))
            .unwrap()
            .unwrap();
        let items = record(&store, r).children();
        assert_eq!(items.len(), 2);
        let BlockRecord::ListItem {
            content: ListItemContent::Nested(inner),
        } = record(&store, items[1])
        else {
            panic!("expected nested item");
        };
        assert!(matches!(
            record(&store, inner),
            BlockRecord::List { ordered: true, .. }
        ));
    }

    #[test]
    fn test_blocks_in_list_are_referenced_directly() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({
                "tag": "list",
                "items": [
                    "a",
                    {"tag": "code", "code": "x"},
                    [{"tag": "paragraph", "text": "p"}],
                    7
                ]
            }))
            .unwrap()
            .unwrap();
        let items = record(&store, r).children();
        assert_eq!(items.len(), 3);
        assert_eq!(
            record(&store, items[1]),
            BlockRecord::Code { code: "x".into() }
        );
        assert_eq!(
            record(&store, items[2]),
            BlockRecord::Paragraph { html: "p".into() }
        );
    }

    #[test]
    fn test_unresolvable_image_is_dropped_from_section() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({
                "tag": "section",
                "title": "S",
                "content": [
                    {"tag": "paragraph", "text": "before"},
                    {"tag": "image", "image": "https://unreachable.example/a.png", "caption": "lost"}
                ]
            }))
            .unwrap()
            .unwrap();
        assert_eq!(record(&store, r).children().len(), 1);
        assert_eq!(store.block_count().unwrap(), 2);
    }

    #[test]
    fn test_unknown_tag_keeps_only_name() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({"tag": "carousel", "slides": [1, 2]}))
            .unwrap()
            .unwrap();
        assert_eq!(
            record(&store, r),
            BlockRecord::Unknown {
                name: "carousel".into()
            }
        );
    }

    #[test]
    fn test_untagged_values_are_skipped() {
        let (_, ing) = setup(StaticFetcher::new());
        assert_eq!(ing.ingest(&json!("loose text")).unwrap(), None);
        assert_eq!(ing.ingest(&json!({"text": "no tag"})).unwrap(), None);
    }

    #[test]
    fn test_transform_many_skips_empty_results() {
        let (_, ing) = setup(StaticFetcher::new());
        let out = ing
            .transform(
                &json!([{"tag": "code", "code": "a"}, null, {"tag": "code", "code": "b"}]),
                true,
            )
            .unwrap();
        let Ingested::Many(refs) = out else {
            panic!("expected many");
        };
        assert_eq!(refs.len(), 2);
        assert!(refs[0].revision < refs[1].revision);
    }

    #[test]
    fn test_transform_single() {
        let (_, ing) = setup(StaticFetcher::new());
        assert_eq!(
            ing.transform(&json!(null), false).unwrap(),
            Ingested::Single(None)
        );
        assert!(matches!(
            ing.transform(&json!({"tag": "code", "code": "x"}), false).unwrap(),
            Ingested::Single(Some(_))
        ));
    }

    #[test]
    fn test_field_aliases() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({"tag": "youtube", "videoId": "abc", "width": "640", "height": 360}))
            .unwrap()
            .unwrap();
        assert_eq!(
            record(&store, r),
            BlockRecord::Youtube {
                video_id: "abc".into(),
                width: 640,
                height: 360
            }
        );

        let r = ing
            .ingest(&json!({"tag": "question", "question": "Why?", "answer": []}))
            .unwrap()
            .unwrap();
        assert!(matches!(record(&store, r), BlockRecord::Question { prompt, .. } if prompt == "Why?"));
    }

    #[test]
    fn test_quote_shape_is_accepted() {
        let (store, ing) = setup(StaticFetcher::new());
        let r = ing
            .ingest(&json!({
                "tag": "quote",
                "text": [{"tag": "paragraph", "text": "Said."}],
                "cite": "Someone"
            }))
            .unwrap()
            .unwrap();
        assert_eq!(
            record(&store, r),
            BlockRecord::Blockquote {
                html: "Said.".into(),
                citation: Some("Someone".into())
            }
        );
    }

    #[test]
    fn test_attribution_accepts_lines() {
        assert_eq!(
            attribution(Some(&json!(["a", "b"]))).as_deref(),
            Some("a\nb")
        );
        assert_eq!(attribution(Some(&json!("a"))).as_deref(), Some("a"));
        assert_eq!(attribution(Some(&json!([]))), None);
        assert_eq!(attribution(None), None);
    }
}
