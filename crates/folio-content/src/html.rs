//! html5ever plumbing shared by the sanitizer and the list normalizer.
//!
//! Markup is always parsed as a full document and the children of `<body>`
//! are treated as the fragment. Serialization goes through html5ever so text
//! and attribute escaping stay consistent between the two directions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

/// Parsed markup. Owns the `RcDom`: dropping it empties every node below the
/// document, including `body`.
pub(crate) struct Parsed {
    _dom: RcDom,
    pub body: Handle,
}

/// Parse markup; the fragment is the children of `body`.
pub(crate) fn parse_body(html: &str) -> Parsed {
    let dom = html5ever::parse_document(RcDom::default(), Default::default()).one(html);
    let body = find_element(&dom.document, "body").unwrap_or_else(|| dom.document.clone());
    Parsed { _dom: dom, body }
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if is_element(child, &[tag]) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Local name of an element node.
pub(crate) fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub(crate) fn is_element(node: &Handle, tags: &[&str]) -> bool {
    match &node.data {
        NodeData::Element { name, .. } => tags.contains(&&*name.local),
        _ => false,
    }
}

/// Contents of a text node.
pub(crate) fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub(crate) fn is_comment(node: &Handle) -> bool {
    matches!(node.data, NodeData::Comment { .. })
}

/// Create a detached text node.
pub(crate) fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

/// Replace a node's children, fixing up parent links.
pub(crate) fn set_children(node: &Handle, children: Vec<Handle>) {
    for child in &children {
        child.parent.set(Some(Rc::downgrade(node)));
    }
    node.children.replace(children);
}

/// Serialize a node including its own tag.
pub(crate) fn outer_html(node: &Handle) -> String {
    serialize_with(node, TraversalScope::IncludeNode)
}

/// Serialize only a node's children.
pub(crate) fn inner_html(node: &Handle) -> String {
    serialize_with(node, TraversalScope::ChildrenOnly(None))
}

fn serialize_with(node: &Handle, traversal_scope: TraversalScope) -> String {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    let serializable = SerializableHandle::from(node.clone());
    if let Err(e) = serialize(&mut output, &serializable, opts) {
        tracing::warn!(error = %e, "HTML serialization failed");
        return String::new();
    }
    String::from_utf8_lossy(&output).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_holds_fragment() {
        let parsed = parse_body("<p>a</p>text<b>bold</b>");
        let body = &parsed.body;
        assert_eq!(tag_name(body).as_deref(), Some("body"));
        assert_eq!(body.children.borrow().len(), 3);
        assert_eq!(inner_html(body), "<p>a</p>text<b>bold</b>");
    }

    #[test]
    fn test_outer_html_escapes_text() {
        let parsed = parse_body("<p>1 &lt; 2 &amp; 3</p>");
        let p = parsed.body.children.borrow()[0].clone();
        assert!(is_element(&p, &["p", "div"]));
        assert_eq!(outer_html(&p), "<p>1 &lt; 2 &amp; 3</p>");
    }

    #[test]
    fn test_created_text_serializes_escaped() {
        let t = create_text("a < b");
        assert_eq!(text_of(&t).as_deref(), Some("a < b"));
        assert_eq!(outer_html(&t), "a &lt; b");
    }
}
