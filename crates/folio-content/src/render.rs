//! Display rendering of stored rich text.

use regex::Regex;

use crate::config::RenderConfig;

/// Turns stored rich text into the markup clients receive.
///
/// Pure: the output depends only on the input and the config the renderer
/// was built from.
#[derive(Debug, Clone)]
pub struct Renderer {
    origin: String,
    img_src: Regex,
}

impl Renderer {
    pub fn new(config: &RenderConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            origin: config.site_origin.trim_end_matches('/').to_string(),
            // Root-relative only; protocol-relative `//host/...` is left alone.
            img_src: Regex::new(r#"(<img\s[^>]*?src=")(/[^/"][^"]*)"#)?,
        })
    }

    pub fn render(&self, html: &str) -> String {
        let replacement = format!("${{1}}{}${{2}}", self.origin.replace('$', "$$"));
        let absolute = self.img_src.replace_all(html, replacement.as_str());
        absolute
            .replace('\u{a0}', " ")
            .replace("&nbsp;", " ")
            .replace("&#160;", " ")
    }
}
