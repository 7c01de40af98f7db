use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::FeedItem;

use super::parse_rss;

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!(
                "Failed to fetch feed {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Fetch(format!("{}: {}", url, e)))?;
        let items = parse_rss(&bytes[..])?;

        tracing::debug!("Fetched {} items from {}", items.len(), url);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const FEED: &str = r#"<rss version="2.0"><channel>
        <item>
          <title>Story</title>
          <link>https://news.google.com/rss/articles/T1</link>
          <source url="https://one.example">One</source>
        </item>
    </channel></rss>"#;

    #[tokio::test]
    async fn test_fetch_parses_feed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(&Config::default()).unwrap();
        let items = fetcher
            .fetch(&format!("{}/rss", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tracking_link, "https://news.google.com/rss/articles/T1");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_fetch_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(&Config::default()).unwrap();
        let result = fetcher.fetch(&format!("{}/rss", mock_server.uri())).await;

        match result {
            Err(AppError::Fetch(msg)) => assert!(msg.contains("503"), "{}", msg),
            other => panic!("Expected Fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(&Config::default()).unwrap();
        let result = fetcher.fetch(&format!("{}/rss", mock_server.uri())).await;

        assert!(matches!(result, Err(AppError::Parse(_))));
    }
}
