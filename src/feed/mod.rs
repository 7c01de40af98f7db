mod fetcher;
mod parser;

pub use fetcher::FeedFetcher;
pub use parser::parse_rss;
