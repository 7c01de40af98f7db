use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use scraper::{Html, Selector};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};

const MAX_HTTP_REDIRECTS: usize = 10;

static REFRESH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[\d.]*\s*[;,]\s*(?:url\s*=\s*)?(.*?)\s*$").unwrap()
});

/// A page that can be pointed at a URL and asked where it ended up.
#[async_trait]
pub trait Navigator: Send {
    /// Navigate to `url`, let the page settle and return the URL the page
    /// reports afterwards.
    async fn goto(&mut self, url: &str) -> Result<String>;

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Browser-like page driven over plain HTTP.
///
/// Server redirects are followed by the client; a meta refresh is reported
/// as the page's new URL so the caller navigates to it next. No JavaScript
/// runs, so links that only redirect from script settle on the script page.
pub struct HttpNavigator {
    client: Client,
}

impl HttpNavigator {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .redirect(redirect::Policy::limited(MAX_HTTP_REDIRECTS))
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn goto(&mut self, url: &str) -> Result<String> {
        let navigation_error = |e: reqwest::Error| AppError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(navigation_error)?;
        let landed = response.url().clone();

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |v| v.contains("html"));
        if !is_html {
            return Ok(landed.to_string());
        }

        let body = response.text().await.map_err(navigation_error)?;
        Ok(client_side_redirect(&body, &landed).unwrap_or_else(|| landed.to_string()))
    }
}

/// Where a `<meta http-equiv="refresh">` tag sends the browser, if anywhere.
///
/// Script-driven navigation is not detected: without running the script
/// there is no telling whether a `location` assignment ever executes.
fn client_side_redirect(html: &str, page_url: &Url) -> Option<String> {
    let target = meta_refresh_target(html)?;
    let resolved = page_url.join(&target).ok()?;

    if !matches!(resolved.scheme(), "http" | "https") || resolved == *page_url {
        return None;
    }
    Some(resolved.to_string())
}

fn meta_refresh_target(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[http-equiv]").ok()?;

    document
        .select(&selector)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })
        // browsers with scripting on ignore <noscript> content
        .filter(|m| {
            !m.ancestors()
                .filter_map(|n| n.value().as_element())
                .any(|e| e.name() == "noscript")
        })
        .filter_map(|m| m.value().attr("content"))
        .find_map(refresh_url)
}

/// `"0; url='https://x'"` -> `https://x`
fn refresh_url(content: &str) -> Option<String> {
    REFRESH_PATTERN
        .captures(content)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '\'' || c == '"').trim().to_string())
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn page_url() -> Url {
        Url::parse("https://news.example/articles/1").unwrap()
    }

    #[test]
    fn test_meta_refresh_is_followed() {
        let html = r#"<html><head>
            <meta http-equiv="Refresh" content="0; URL='/final?id=7'">
        </head><body></body></html>"#;
        assert_eq!(
            client_side_redirect(html, &page_url()).as_deref(),
            Some("https://news.example/final?id=7")
        );
    }

    #[test]
    fn test_refresh_without_url_is_ignored() {
        let html = r#"<meta http-equiv="refresh" content="30">"#;
        assert_eq!(client_side_redirect(html, &page_url()), None);
    }

    #[test]
    fn test_location_in_event_handler_is_not_a_redirect() {
        let html = r#"<html><body><article>Story</article>
            <button id="share">Share</button>
            <script>document.getElementById('share').onclick = function () { window.location.href = 'https://twitter.com/intent/tweet'; };</script>
        </body></html>"#;
        let page = Url::parse("https://publisher.example/story").unwrap();
        assert_eq!(client_side_redirect(html, &page), None);
    }

    #[test]
    fn test_script_location_replace_is_not_followed() {
        let html = r#"<script>window.location.replace("https://publisher.example/story");</script>"#;
        assert_eq!(client_side_redirect(html, &page_url()), None);
    }

    #[test]
    fn test_refresh_inside_noscript_is_ignored() {
        let html = r#"<html><head>
            <noscript><meta http-equiv="refresh" content="0;url=/no-js"></noscript>
        </head><body></body></html>"#;
        assert_eq!(client_side_redirect(html, &page_url()), None);
    }

    #[test]
    fn test_refresh_url_forms() {
        assert_eq!(refresh_url("0;url=https://a.example/x").as_deref(), Some("https://a.example/x"));
        assert_eq!(refresh_url("5, URL = \"/b\"").as_deref(), Some("/b"));
        assert_eq!(refresh_url("0; /c").as_deref(), Some("/c"));
        assert_eq!(refresh_url("0;url="), None);
        assert_eq!(refresh_url("10"), None);
    }

    #[test]
    fn test_plain_page_has_no_redirect() {
        let html = r#"<html><head><title>Story</title></head>
            <body><a href="https://elsewhere.example">link</a>
            <script>console.log("location");</script></body></html>"#;
        assert_eq!(client_side_redirect(html, &page_url()), None);
    }

    #[test]
    fn test_redirect_to_self_or_non_http_is_ignored() {
        let to_self = r#"<meta http-equiv="refresh" content="0;url=https://news.example/articles/1">"#;
        assert_eq!(client_side_redirect(to_self, &page_url()), None);

        let to_js = r#"<meta http-equiv="refresh" content="0;url=javascript:void(0)">"#;
        assert_eq!(client_side_redirect(to_js, &page_url()), None);
    }

    #[tokio::test]
    async fn test_goto_reports_url_after_http_redirects() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/t1"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/f1", mock_server.uri()).as_str()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/f1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/html")
                    .set_body_string("<html><body>article</body></html>"),
            )
            .mount(&mock_server)
            .await;

        let mut navigator = HttpNavigator::new(&Config::default()).unwrap();
        let landed = navigator
            .goto(&format!("{}/t1", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(landed, format!("{}/f1", mock_server.uri()));
    }

    #[tokio::test]
    async fn test_goto_unreachable_host_is_navigation_error() {
        let mut navigator = HttpNavigator::new(&Config::default()).unwrap();
        let result = navigator.goto("http://127.0.0.1:1/unreachable").await;
        assert!(matches!(result, Err(AppError::Navigation { .. })));
    }
}
