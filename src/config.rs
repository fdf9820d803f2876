use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// NewsAPI key; `NEWS_API_KEY` overrides it
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Country code for the breaking-news feed
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Skip the host connectivity check
    #[serde(default)]
    pub assume_online: bool,
}

fn default_base_url() -> String {
    "https://newsapi.org".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_database_url() -> String {
    "sqlite:news_reader.db?mode=rwc".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            country: default_country(),
            database_url: default_database_url(),
            listen: default_listen(),
            request_timeout_secs: default_request_timeout(),
            assume_online: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Applies `NEWS_API_KEY` and `DATABASE_URL` on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("NEWS_API_KEY").ok(),
            std::env::var("DATABASE_URL").ok(),
        )
    }

    fn with_overrides(mut self, api_key: Option<String>, database_url: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = database_url.filter(|u| !u.is_empty()) {
            self.database_url = url;
        }
        self
    }
}
