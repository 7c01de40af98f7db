/// One `<item>` of the RSS channel, validated at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    /// Redirector URL handed out by the feed, not the article address.
    pub tracking_link: String,
    pub source_name: String,
    pub source_url: String,
}
