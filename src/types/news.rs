use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed entry after normalization. Only values of this type leave the
/// collector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NormalizedArticle {
    pub title: String,
    pub summary_plain: String,
    pub summary_html: String,
    pub link: String,
    /// Empty when no image could be resolved.
    pub image_url: String,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

impl NormalizedArticle {
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}
