//! Ingest wire JSON, publish it back, compare.

use std::sync::{Arc, Once};

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use folio_assets::{AssetStore, MemoryAssetStore, MemoryObjectIndex, StaticFetcher, StaticResponse};
use folio_content::{Folio, FolioConfig, Ingested, RenderConfig};
use folio_store::{BlockStore, MemoryBlockStore, SqliteBlockStore};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut b = b"\x89PNG\r\n\x1a\n".to_vec();
    b.extend_from_slice(&13u32.to_be_bytes());
    b.extend_from_slice(b"IHDR");
    b.extend_from_slice(&width.to_be_bytes());
    b.extend_from_slice(&height.to_be_bytes());
    b.extend_from_slice(&[8, 6, 0, 0, 0]);
    b
}

struct World {
    blocks: Arc<dyn BlockStore>,
    assets: Arc<MemoryAssetStore>,
    folio: Folio,
}

fn world_with(
    blocks: Arc<dyn BlockStore>,
    fetcher: StaticFetcher,
    objects: MemoryObjectIndex,
) -> World {
    init_tracing();
    let config = FolioConfig::default().with_render(RenderConfig::new("https://site.example"));
    let assets = Arc::new(MemoryAssetStore::default());
    let folio = Folio::new(
        &config,
        blocks.clone(),
        assets.clone(),
        Arc::new(objects),
        Arc::new(fetcher),
    )
    .unwrap();
    World {
        blocks,
        assets,
        folio,
    }
}

fn world() -> World {
    world_with(
        Arc::new(MemoryBlockStore::new()),
        StaticFetcher::new(),
        MemoryObjectIndex::new(),
    )
}

impl World {
    fn round_trip(&self, input: &Value) -> Value {
        let Ingested::Many(refs) = self.folio.ingestor().transform(input, true).unwrap() else {
            panic!("expected many");
        };
        self.folio.publisher().publish_json(&refs).unwrap()
    }
}

#[test]
fn bullet_list_round_trip() {
    let w = world();
    let input = json!([{"tag": "list", "ordered": false, "items": ["a", "b"]}]);
    assert_eq!(
        w.round_trip(&input),
        json!([{"tag": "list", "prefix": "bullet", "items": ["a", "b"]}])
    );
    assert_eq!(w.blocks.block_count().unwrap(), 3);
}

#[test]
fn paragraph_body_splits_into_list() {
    let w = world();
    let input = json!([{"tag": "paragraph", "text": "<p>Intro</p><ul><li>one</li><li>two</li></ul>"}]);
    assert_eq!(
        w.round_trip(&input),
        json!([
            {"tag": "paragraph", "text": "Intro"},
            {"tag": "list", "prefix": "bullet", "items": ["one", "two"]}
        ])
    );
}

#[test]
fn unreachable_image_leaves_section_shorter() {
    let fetcher = StaticFetcher::new()
        .with_response("https://down.example/a.png", StaticResponse::Timeout);
    let w = world_with(
        Arc::new(MemoryBlockStore::new()),
        fetcher,
        MemoryObjectIndex::new(),
    );
    let input = json!([{
        "tag": "section",
        "title": "Figures",
        "content": [
            {"tag": "paragraph", "text": "kept"},
            {"tag": "image", "image": "https://down.example/a.png"},
            {"tag": "code", "code": "also kept"}
        ]
    }]);
    let out = w.round_trip(&input);
    assert_eq!(out[0]["content"].as_array().unwrap().len(), 2);
    assert!(w.assets.paths().is_empty());
}

#[test]
fn nested_list_round_trip() {
    let w = world();
    let published = json!([{
        "tag": "list",
        "prefix": "bullet",
        "items": ["x", [{"tag": "list", "prefix": "number", "items": ["y"]}]]
    }]);
    assert_eq!(w.round_trip(&published), published);

    let from_markup = json!([{"tag": "paragraph", "text": "<ul><li>x<ol><li>y</li></ol></li></ul>"}]);
    assert_eq!(w.round_trip(&from_markup), published);
}

#[test]
fn blocks_inside_list_round_trip() {
    let w = world();
    let input = json!([{"tag": "list", "ordered": false, "items": ["a", {"tag": "code", "code": "x"}]}]);
    let published = json!([{"tag": "list", "prefix": "bullet", "items": ["a", [{"tag": "code", "code": "x"}]]}]);
    assert_eq!(w.round_trip(&input), published);
    assert_eq!(w.round_trip(&published), published);
}

#[test]
fn deep_mixed_list_round_trip() {
    let w = world();
    let published = json!([
        {"tag": "paragraph", "text": "Intro"},
        {"tag": "list", "prefix": "number", "items": [
            "one",
            [{"tag": "list", "prefix": "bullet", "items": [
                "two",
                [{"tag": "list", "prefix": "number", "items": ["three <em>deep</em>"]}],
                "four"
            ]}],
            "five"
        ]}
    ]);
    assert_eq!(w.round_trip(&published), published);

    let markup = json!([{
        "tag": "paragraph",
        "text": "<p>Intro</p><ol><li>one<ul><li>two<ol><li>three <em>deep</em></li></ol></li><li>four</li></ul></li><li>five</li></ol>"
    }]);
    assert_eq!(w.round_trip(&markup), published);
}

#[test]
fn simple_blocks_round_trip() {
    let w = world();
    let input = json!([
        {"tag": "code", "code": "fn main() {}"},
        {"tag": "youtube", "id": "dQw4w9WgXcQ", "width": 640, "height": 360},
        {"tag": "button", "text": "Read more", "uri": "https://site.example/more"},
        {"tag": "quote", "text": [{"tag": "paragraph", "text": "Quoted <em>words</em>."}], "cite": "Author"},
        {"tag": "question", "prompt": "Why?", "answer": [{"tag": "paragraph", "text": "Because."}]},
        {"tag": "section", "title": "Empty", "content": []}
    ]);
    assert_eq!(w.round_trip(&input), input);
}

#[test]
fn blockquote_input_publishes_as_quote() {
    let w = world();
    let input = json!([{"tag": "blockquote", "text": "Said.", "citation": "Someone"}]);
    assert_eq!(
        w.round_trip(&input),
        json!([{"tag": "quote", "text": [{"tag": "paragraph", "text": "Said."}], "cite": "Someone"}])
    );
}

#[test]
fn unknown_tags_vanish_on_publish() {
    let w = world();
    let input = json!([{"tag": "carousel", "slides": []}, {"tag": "paragraph", "text": "after"}]);
    assert_eq!(
        w.round_trip(&input),
        json!([{"tag": "paragraph", "text": "after"}])
    );
    assert_eq!(w.blocks.block_count().unwrap(), 2);
}

#[test]
fn remote_image_is_stored_and_published() {
    let url = "https://images.example/photos/Figure One.png?w=300";
    let w = world_with(
        Arc::new(MemoryBlockStore::new()),
        StaticFetcher::new().with_body(url, png(300, 200)),
        MemoryObjectIndex::new(),
    );
    let created = Utc.with_ymd_and_hms(2017, 3, 14, 9, 0, 0).unwrap();
    let ingestor = w.folio.ingestor_for("blog_article", created);

    let refs = ingestor
        .ingest_many(&json!([{
            "tag": "image",
            "image": url,
            "alt": "A figure",
            "caption": "<p>Caption</p>",
            "attribution": ["Photo: someone", "", "CC-BY"]
        }]))
        .unwrap();
    assert_eq!(w.assets.paths(), vec!["blog_article/2017-03/figure_one.png"]);

    let stored = "https://cdn.example.org/iiif/blog_article/2017-03/figure_one.png";
    let out = w.folio.publisher().publish_json(&refs).unwrap();
    assert_eq!(
        out,
        json!([{
            "tag": "image",
            "image": {
                "uri": stored,
                "alt": "A figure",
                "source": {"mediaType": "image/png", "uri": stored, "filename": "figure_one.png"},
                "size": {"width": 300, "height": 200}
            },
            "title": "<p>Caption</p>",
            "attribution": ["Photo: someone", "CC-BY"]
        }])
    );
}

#[test]
fn image_from_object_storage() {
    let objects = MemoryObjectIndex::new().with_object("covers/2019/cover.png", png(10, 10));
    let w = world_with(Arc::new(MemoryBlockStore::new()), StaticFetcher::new(), objects);
    let refs = w
        .folio
        .ingestor()
        .ingest_many(&json!([{"tag": "image", "image": "covers/2019/cover"}]))
        .unwrap();
    assert_eq!(refs.len(), 1);
    let out = w.folio.publisher().publish_json(&refs).unwrap();
    assert_eq!(out[0]["image"]["source"]["filename"], "cover.png");
    assert_eq!(out[0]["image"]["alt"], "");
}

#[test]
fn removed_asset_drops_image_on_publish() {
    let url = "https://images.example/a.png";
    let w = world_with(
        Arc::new(MemoryBlockStore::new()),
        StaticFetcher::new().with_body(url, png(1, 1)),
        MemoryObjectIndex::new(),
    );
    let refs = w
        .folio
        .ingestor()
        .ingest_many(&json!([{"tag": "image", "image": url}, {"tag": "code", "code": "x"}]))
        .unwrap();
    assert_eq!(refs.len(), 2);

    for path in w.assets.paths() {
        assert!(w.assets.remove(&path));
    }
    assert_eq!(
        w.folio.publisher().publish_json(&refs).unwrap(),
        json!([{"tag": "code", "code": "x"}])
    );
}

#[test]
fn table_images_point_at_stored_copies() {
    let url = "https://images.example/chart.png";
    let w = world_with(
        Arc::new(MemoryBlockStore::new()),
        StaticFetcher::new().with_body(url, png(2, 2)),
        MemoryObjectIndex::new(),
    );
    let input = json!([{
        "tag": "table",
        "html": format!("<table>\n<tr><td><img src=\"{url}\"><img src=\"https://gone.example/x.png\"></td></tr>\n</table>")
    }]);
    let out = w.round_trip(&input);
    let table = out[0]["tables"][0].as_str().unwrap();
    assert!(table.contains("src=\"https://cdn.example.org/iiif/content/"));
    assert!(table.contains("src=\"https://gone.example/x.png\""));
    assert!(!table.contains('\n'));
    assert!(w.assets.exists(&w.assets.paths()[0]));
}

#[test]
fn sqlite_backed_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let blocks: Arc<dyn BlockStore> =
        Arc::new(SqliteBlockStore::open(dir.path().join("blocks.db")).unwrap());
    let w = world_with(blocks, StaticFetcher::new(), MemoryObjectIndex::new());
    let input = json!([
        {"tag": "section", "title": "S", "content": [
            {"tag": "list", "ordered": true, "items": ["one", [{"tag": "list", "prefix": "bullet", "items": ["two"]}]]}
        ]}
    ]);
    assert_eq!(
        w.round_trip(&input),
        json!([{"tag": "section", "title": "S", "content": [
            {"tag": "list", "prefix": "number", "items": ["one", [{"tag": "list", "prefix": "bullet", "items": ["two"]}]]}
        ]}])
    );
}

#[test]
fn scripts_never_reach_output() {
    let w = world();
    let input = json!([{"tag": "paragraph", "text": "<p onmouseover=\"x()\">Safe</p><script>alert(1)</script>"}]);
    assert_eq!(
        w.round_trip(&input),
        json!([{"tag": "paragraph", "text": "Safe"}])
    );
}
