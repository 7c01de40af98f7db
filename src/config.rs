use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{AppError, Result};

const DEFAULT_FEED_URL: &str = "https://news.google.com/rss/topics/CAAqIQgKIhtDQkFTRGdvSUwyMHZNREZ0ZHpFU0FuUnlLQUFQAQ?hl=tr&gl=TR&ceid=TR:tr";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default = "default_redirect_timeout_ms")]
    pub redirect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("results.json")
}

fn default_redirect_timeout_ms() -> u64 {
    60_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            output_path: default_output_path(),
            redirect_timeout_ms: default_redirect_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the per-user config file when no path is
    /// given. A missing per-user file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let config_path = Self::config_path();
                if config_path.exists() {
                    Self::load_from(&config_path)
                } else {
                    let config = Config::default();
                    config.save(&config_path)?;
                    Ok(config)
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("news-resolver")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.feed_url)
            .map_err(|e| AppError::Config(format!("invalid feed_url {:?}: {}", self.feed_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "feed_url must be http(s), got {:?}",
                url.scheme()
            )));
        }
        if self.redirect_timeout_ms == 0 {
            return Err(AppError::Config("redirect_timeout_ms must be greater than zero".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }
}
