use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Best-effort source of Open Graph preview images.
#[async_trait]
pub trait PreviewSource: Sync {
    /// Never fails: anything that goes wrong is logged and reported as `None`.
    async fn og_image(&self, page_url: &str) -> Option<String>;
}

pub struct PreviewFetcher {
    client: Client,
}

impl PreviewFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the raw markup of `page_url` (no script execution) and read its
    /// `og:image` meta tag.
    pub async fn fetch_og_image(&self, page_url: &str) -> Result<Option<String>> {
        let response = self.client.get(page_url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!(
                "{} returned HTTP {}",
                page_url,
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(extract_og_image(&html, page_url))
    }
}

#[async_trait]
impl PreviewSource for PreviewFetcher {
    async fn og_image(&self, page_url: &str) -> Option<String> {
        match self.fetch_og_image(page_url).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Could not read page {}: {}", page_url, e);
                None
            }
        }
    }
}

/// Read the `og:image` content from a page, resolving relative URLs
/// against the page address.
pub fn extract_og_image(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let content = ["meta[property=\"og:image\"]", "meta[name=\"og:image\"]"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .filter_map(|m| m.value().attr("content"))
                .map(str::trim)
                .find(|c| !c.is_empty())
                .map(str::to_string)
        })?;

    match Url::parse(page_url).and_then(|base| base.join(&content)) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(content),
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_extracts_og_image() {
        let html = r#"<html><head>
            <meta property="og:title" content="Story">
            <meta property="og:image" content="https://cdn.example/img.jpg">
        </head></html>"#;
        assert_eq!(
            extract_og_image(html, "https://news.example/a").as_deref(),
            Some("https://cdn.example/img.jpg")
        );
    }

    #[test]
    fn test_relative_og_image_is_resolved() {
        let html = r#"<meta name="og:image" content="/media/cover.png">"#;
        assert_eq!(
            extract_og_image(html, "https://news.example/world/a").as_deref(),
            Some("https://news.example/media/cover.png")
        );
    }

    #[test]
    fn test_missing_or_empty_og_image_is_none() {
        assert_eq!(extract_og_image("<html><head></head></html>", "https://a"), None);
        assert_eq!(
            extract_og_image(r#"<meta property="og:image" content="  ">"#, "https://a"),
            None
        );
    }

    #[tokio::test]
    async fn test_og_image_from_live_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta property="og:image" content="/img/1.jpg"></head></html>"#,
            ))
            .mount(&mock_server)
            .await;

        let fetcher = PreviewFetcher::new(&Config::default()).unwrap();
        let image = fetcher
            .og_image(&format!("{}/story", mock_server.uri()))
            .await;

        assert_eq!(image, Some(format!("{}/img/1.jpg", mock_server.uri())));
    }

    #[tokio::test]
    async fn test_failed_fetch_degrades_to_none() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = PreviewFetcher::new(&Config::default()).unwrap();

        assert!(matches!(
            fetcher.fetch_og_image(&format!("{}/gone", mock_server.uri())).await,
            Err(AppError::Fetch(_))
        ));
        assert_eq!(fetcher.og_image(&format!("{}/gone", mock_server.uri())).await, None);
        assert_eq!(fetcher.og_image("http://127.0.0.1:1/down").await, None);
    }
}
