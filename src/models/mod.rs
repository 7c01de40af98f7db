mod feed_item;
mod record;

pub use feed_item::FeedItem;
pub use record::ResultRecord;
