//! Rich-text sanitization.
//!
//! Ingestion passes every rich-text field through a [`Sanitizer`] under a
//! named policy. [`PolicySanitizer`] implements allow-list policies on top
//! of html5ever: disallowed elements are unwrapped (their children kept),
//! dangerous ones are dropped with their content, and only allow-listed
//! attributes survive.

use std::collections::HashMap;

use markup5ever_rcdom::{Handle, NodeData};

use crate::html::{inner_html, parse_body, set_children};

/// The policy ingestion applies to all rich text.
pub const BASIC_HTML: &str = "basic_html";

/// Policy that strips every tag and keeps only text.
pub const PLAIN_TEXT: &str = "plain_text";

/// Markup cleaning under a named policy.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str, policy: &str) -> String;
}

/// Elements removed together with everything inside them.
const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "head", "title",
    "textarea", "select", "svg", "math",
];

/// Attributes holding URLs that need a scheme check.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Allow-list of elements and their permitted attributes.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    name: String,
    tags: HashMap<String, Vec<String>>,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: HashMap::new(),
        }
    }

    /// Allow an element with the given attributes.
    pub fn allow(mut self, tag: &str, attributes: &[&str]) -> Self {
        self.tags.insert(
            tag.to_string(),
            attributes.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn attributes_for(&self, tag: &str) -> Option<&[String]> {
        self.tags.get(tag).map(Vec::as_slice)
    }

    /// Inline formatting, links, lists, headings, images and tables.
    pub fn basic_html() -> Self {
        let cell = &["colspan", "rowspan", "scope"];
        Self::new(BASIC_HTML)
            .allow("a", &["href", "hreflang", "title"])
            .allow("em", &[])
            .allow("strong", &[])
            .allow("i", &[])
            .allow("b", &[])
            .allow("u", &[])
            .allow("s", &[])
            .allow("sub", &[])
            .allow("sup", &[])
            .allow("cite", &[])
            .allow("code", &[])
            .allow("span", &[])
            .allow("blockquote", &["cite"])
            .allow("p", &[])
            .allow("br", &[])
            .allow("hr", &[])
            .allow("ul", &["type"])
            .allow("ol", &["start", "type"])
            .allow("li", &[])
            .allow("dl", &[])
            .allow("dt", &[])
            .allow("dd", &[])
            .allow("h2", &["id"])
            .allow("h3", &["id"])
            .allow("h4", &["id"])
            .allow("h5", &["id"])
            .allow("h6", &["id"])
            .allow("img", &["src", "alt", "width", "height", "data-align", "data-caption"])
            .allow("table", &[])
            .allow("caption", &[])
            .allow("thead", &[])
            .allow("tbody", &[])
            .allow("tfoot", &[])
            .allow("tr", &[])
            .allow("th", cell)
            .allow("td", cell)
    }

    /// No elements at all.
    pub fn plain_text() -> Self {
        Self::new(PLAIN_TEXT)
    }
}

enum Action {
    Keep,
    Unwrap,
    Drop,
}

/// [`Sanitizer`] over a registry of named [`Policy`] values.
///
/// Ships with `basic_html` and `plain_text`. An unknown policy name falls
/// back to `plain_text`.
#[derive(Debug, Clone)]
pub struct PolicySanitizer {
    policies: HashMap<String, Policy>,
}

impl Default for PolicySanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicySanitizer {
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
        }
        .with_policy(Policy::basic_html())
        .with_policy(Policy::plain_text())
    }

    /// Register (or replace) a policy under its own name.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.insert(policy.name.clone(), policy);
        self
    }

    fn clean(node: &Handle, policy: &Policy) {
        let children = node.children.take();
        let mut kept = Vec::with_capacity(children.len());

        for child in children {
            let action = match &child.data {
                NodeData::Text { .. } => Action::Keep,
                NodeData::Element { name, attrs, .. } => {
                    let tag = &*name.local;
                    if DROP_WITH_CONTENT.contains(&tag) {
                        Action::Drop
                    } else if let Some(allowed) = policy.attributes_for(tag) {
                        attrs.borrow_mut().retain(|attr| {
                            let attr_name = &*attr.name.local;
                            allowed.iter().any(|a| a == attr_name)
                                && (!URL_ATTRIBUTES.contains(&attr_name) || safe_url(&attr.value))
                        });
                        Action::Keep
                    } else {
                        Action::Unwrap
                    }
                }
                _ => Action::Drop,
            };

            match action {
                Action::Keep => {
                    Self::clean(&child, policy);
                    kept.push(child);
                }
                Action::Unwrap => {
                    Self::clean(&child, policy);
                    kept.extend(child.children.take());
                }
                Action::Drop => {}
            }
        }

        set_children(node, kept);
    }
}

fn safe_url(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    !BLOCKED_SCHEMES.iter().any(|s| normalized.starts_with(s))
}

impl Sanitizer for PolicySanitizer {
    fn sanitize(&self, html: &str, policy: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let policy = match self.policies.get(policy) {
            Some(p) => p,
            None => {
                tracing::warn!(policy, "unknown sanitizer policy, stripping markup");
                match self.policies.get(PLAIN_TEXT) {
                    Some(p) => p,
                    None => return String::new(),
                }
            }
        };

        let parsed = parse_body(html);
        Self::clean(&parsed.body, policy);
        inner_html(&parsed.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(html: &str) -> String {
        PolicySanitizer::new().sanitize(html, BASIC_HTML)
    }

    #[test]
    fn test_keeps_allowed_markup() {
        assert_eq!(
            basic(r#"<p>Hi <strong>there</strong> <a href="https://x.org" title="t">link</a></p>"#),
            r#"<p>Hi <strong>there</strong> <a href="https://x.org" title="t">link</a></p>"#
        );
    }

    #[test]
    fn test_nested_markup_survives() {
        let html = "<p>a</p><ul><li>x<ol><li>y <em>z</em></li></ol></li></ul>tail";
        assert_eq!(basic(html), html);
    }

    #[test]
    fn test_drops_script_with_content() {
        assert_eq!(basic("<p>a</p><script>alert(1)</script><p>b</p>"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_strips_event_handlers_and_styles() {
        assert_eq!(
            basic(r#"<p onclick="x()" style="color:red" class="c">a</p>"#),
            "<p>a</p>"
        );
    }

    #[test]
    fn test_unwraps_disallowed_elements() {
        assert_eq!(basic("<div><font>a</font> <em>b</em></div>"), "a <em>b</em>");
    }

    #[test]
    fn test_blocks_javascript_urls() {
        assert_eq!(
            basic(r#"<a href=" JavaScript:alert(1)">x</a><img src="/a.png" alt="a">"#),
            r#"<a>x</a><img src="/a.png" alt="a">"#
        );
    }

    #[test]
    fn test_drops_comments() {
        assert_eq!(basic("a<!-- note -->b"), "ab");
    }

    #[test]
    fn test_escapes_text() {
        assert_eq!(basic("fish & chips"), "fish &amp; chips");
    }

    #[test]
    fn test_unknown_policy_strips_everything() {
        let s = PolicySanitizer::new();
        assert_eq!(s.sanitize("<p>a <b>b</b></p>", "full_html"), "a b");
    }

    #[test]
    fn test_custom_policy() {
        let s = PolicySanitizer::new().with_policy(Policy::new("bold_only").allow("b", &[]));
        assert_eq!(s.sanitize("<p>a <b>b</b></p>", "bold_only"), "a <b>b</b>");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(basic("   "), "");
    }
}
