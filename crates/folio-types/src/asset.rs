//! Resolved asset references.

use serde::{Deserialize, Serialize};

/// A materialized asset: where it lives in managed storage and what it is.
///
/// Never persisted as its own block; embedded in an image record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    /// URI returned by the asset store, e.g. `public://iiif/content/2017-03/a.jpg`.
    pub storage_uri: String,
    pub filename: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl AssetRef {
    pub fn new(
        storage_uri: impl Into<String>,
        filename: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            storage_uri: storage_uri.into(),
            filename: filename.into(),
            media_type: media_type.into(),
            width: None,
            height: None,
        }
    }

    /// Set pixel dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Both dimensions, when known.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_requires_both_dimensions() {
        let asset = AssetRef::new("public://a.png", "a.png", "image/png");
        assert_eq!(asset.size(), None);
        let asset = asset.with_size(10, 20);
        assert_eq!(asset.size(), Some((10, 20)));
    }

    #[test]
    fn test_serializes_camel_case_without_missing_size() {
        let asset = AssetRef::new("public://a.png", "a.png", "image/png");
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["storageUri"], "public://a.png");
        assert_eq!(json["mediaType"], "image/png");
        assert!(json.get("width").is_none());
    }
}
