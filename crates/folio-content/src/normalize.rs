//! HTML list normalization.
//!
//! A stored paragraph body may hold several paragraphs and lists merged into
//! one blob of markup. [`split`] cuts it back into fragments and converts
//! every top-level `<ul>`/`<ol>` into a structured [`ListFragment`].
//!
//! Boundaries fall around every block-level element and at line breaks in
//! top-level text. A list that is not made purely of `<li>` children is
//! passed through verbatim as [`Fragment::Html`].

use markup5ever_rcdom::Handle;

use crate::html::{
    create_text, inner_html, is_comment, is_element, outer_html, parse_body, set_children,
    tag_name, text_of,
};

const LISTS: &[&str] = &["ul", "ol"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dialog", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// One piece of a split body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Markup that is not a list, trimmed.
    Html(String),
    List(ListFragment),
}

/// A structured list recovered from markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFragment {
    pub ordered: bool,
    pub entries: Vec<ListEntry>,
}

/// One item of a [`ListFragment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    /// Inline markup of an `<li>`, trimmed and never empty.
    Text(String),
    /// A list nested in the preceding `<li>`.
    Nested(ListFragment),
}

impl ListFragment {
    pub fn new(ordered: bool) -> Self {
        Self {
            ordered,
            entries: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.entries.push(ListEntry::Text(text.into()));
        self
    }

    pub fn with_nested(mut self, list: ListFragment) -> Self {
        self.entries.push(ListEntry::Nested(list));
        self
    }

    /// Serialize back to markup. Nested lists are placed inside the `<li>`
    /// of the text entry before them.
    pub fn to_html(&self) -> String {
        let tag = if self.ordered { "ol" } else { "ul" };
        let mut out = format!("<{tag}>");
        let mut open = false;
        for entry in &self.entries {
            match entry {
                ListEntry::Text(text) => {
                    if open {
                        out.push_str("</li>");
                    }
                    out.push_str("<li>");
                    out.push_str(text);
                    open = true;
                }
                ListEntry::Nested(list) => {
                    if !open {
                        out.push_str("<li>");
                        open = true;
                    }
                    out.push_str(&list.to_html());
                }
            }
        }
        if open {
            out.push_str("</li>");
        }
        out.push_str(&format!("</{tag}>"));
        out
    }
}

/// Split rich text into paragraph markup and structured lists.
pub fn split(html: &str) -> Vec<Fragment> {
    let parsed = parse_body(html);
    let mut out = Vec::new();
    let mut inline = String::new();

    let children: Vec<Handle> = parsed.body.children.borrow().clone();
    for node in &children {
        if let Some(text) = text_of(node) {
            let mut lines = text.split(['\n', '\r']);
            if let Some(first) = lines.next() {
                inline.push_str(&outer_html(&create_text(first)));
            }
            for line in lines {
                flush(&mut inline, &mut out);
                inline.push_str(&outer_html(&create_text(line)));
            }
        } else if is_element(node, BLOCK_ELEMENTS) {
            flush(&mut inline, &mut out);
            out.extend(block_fragment(node));
        } else if !is_comment(node) {
            inline.push_str(&outer_html(node));
        }
    }
    flush(&mut inline, &mut out);
    out
}

fn flush(inline: &mut String, out: &mut Vec<Fragment>) {
    let trimmed = inline.trim();
    if !trimmed.is_empty() {
        out.push(Fragment::Html(trimmed.to_string()));
    }
    inline.clear();
}

fn block_fragment(node: &Handle) -> Option<Fragment> {
    if is_element(node, LISTS) {
        strip_formatting_whitespace(node);
        return match list_fragment(node) {
            Some(list) => Some(Fragment::List(list)),
            None => {
                tracing::debug!("malformed list markup passed through");
                Some(Fragment::Html(outer_html(node)))
            }
        };
    }

    let html = if is_element(node, &["p"]) {
        inner_html(node)
    } else {
        outer_html(node)
    };
    let trimmed = html.trim();
    (!trimmed.is_empty()).then(|| Fragment::Html(trimmed.to_string()))
}

/// Drop whitespace-only text that is layout: anything holding a line break
/// or tab, and anything sitting directly under a list element.
fn strip_formatting_whitespace(node: &Handle) {
    let under_list = is_element(node, LISTS);
    let children = node.children.take();
    let kept: Vec<Handle> = children
        .into_iter()
        .filter(|child| match text_of(child) {
            Some(text) if text.trim().is_empty() => {
                !(under_list || text.contains(['\n', '\r', '\t']))
            }
            _ => true,
        })
        .collect();
    for child in &kept {
        strip_formatting_whitespace(child);
    }
    set_children(node, kept);
}

fn list_fragment(node: &Handle) -> Option<ListFragment> {
    let mut list = ListFragment::new(tag_name(node).as_deref() == Some("ol"));

    for child in node.children.borrow().iter() {
        if is_comment(child) {
            continue;
        }
        if !is_element(child, &["li"]) {
            return None;
        }

        let mut text = String::new();
        let mut nested = Vec::new();
        for part in child.children.borrow().iter() {
            if is_element(part, LISTS) {
                nested.push(list_fragment(part)?);
            } else if !is_comment(part) {
                text.push_str(&outer_html(part));
            }
        }

        let text = text.trim();
        if !text.is_empty() {
            list.entries.push(ListEntry::Text(text.to_string()));
        }
        list.entries.extend(nested.into_iter().map(ListEntry::Nested));
    }

    Some(list)
}
