use serde::{Deserialize, Serialize};

use super::FeedItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub title: String,
    /// Final URL after all redirects; identity key for upserts.
    pub link: String,
    pub google_link: String,
    pub source_name: String,
    pub source_url: String,
    #[serde(default)]
    pub og_image: Option<String>,
}

impl ResultRecord {
    pub fn from_feed_item(item: &FeedItem, final_url: String) -> Self {
        Self {
            title: item.title.clone(),
            link: final_url,
            google_link: item.tracking_link.clone(),
            source_name: item.source_name.clone(),
            source_url: item.source_url.clone(),
            og_image: None,
        }
    }

    /// An empty string counts as missing, same as `null`.
    pub fn needs_preview(&self) -> bool {
        self.og_image.as_deref().map_or(true, str::is_empty)
    }
}
