use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::model::{NewsResponse, PAGE_SIZE};

const TOP_HEADLINES_PATH: &str = "/v2/top-headlines";
const SEARCH_PATH: &str = "/v2/everything";

/// Client for a NewsAPI-compatible service.
///
/// Both endpoints return `Ok(None)` when the server answers 2xx with an empty
/// body. Nothing is retried here.
pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("NewsReader/1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn top_headlines(
        &self,
        country_code: &str,
        page: u32,
    ) -> Result<Option<NewsResponse>, ApiError> {
        self.get_page(TOP_HEADLINES_PATH, ("country", country_code), page)
            .await
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<Option<NewsResponse>, ApiError> {
        self.get_page(SEARCH_PATH, ("q", query), page).await
    }

    async fn get_page(
        &self,
        path: &str,
        filter: (&str, &str),
        page: u32,
    ) -> Result<Option<NewsResponse>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Fetching {} {}={} page {}", path, filter.0, filter.1, page);

        let page = page.to_string();
        let page_size = PAGE_SIZE.to_string();
        let mut request = self.client.get(&url).query(&[
            filter,
            ("page", page.as_str()),
            ("pageSize", page_size.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await?;
        Self::parse_page(response).await
    }

    async fn parse_page(response: Response) -> Result<Option<NewsResponse>, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unknown").to_string();
            warn!("News API returned {}", status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        let bytes = response.bytes().await?;
        Self::decode_body(&bytes)
    }

    /// Decodes a 2xx body; blank bodies (and a JSON `null`) mean "no content".
    pub fn decode_body(bytes: &[u8]) -> Result<Option<NewsResponse>, ApiError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let parsed: Option<NewsResponse> = serde_json::from_slice(bytes)?;
        Ok(parsed)
    }
}
