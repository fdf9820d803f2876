use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::api::NewsApiClient;
use crate::db::ArticleStore;
use crate::error::{ApiError, StoreError};
use crate::model::{Article, NewsResponse};

/// Data access used by the feed accumulator: remote pages on one side, saved
/// articles on the other.
#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn get_breaking_news(
        &self,
        country_code: &str,
        page: u32,
    ) -> Result<Option<NewsResponse>, ApiError>;

    async fn search_news(&self, query: &str, page: u32) -> Result<Option<NewsResponse>, ApiError>;

    async fn upsert(&self, article: &Article) -> Result<(), StoreError>;

    async fn delete_article(&self, article: &Article) -> Result<(), StoreError>;

    fn saved_news(&self) -> watch::Receiver<Vec<Article>>;
}

pub struct Repository {
    api: NewsApiClient,
    store: Arc<ArticleStore>,
}

impl Repository {
    pub fn new(api: NewsApiClient, store: Arc<ArticleStore>) -> Self {
        Self { api, store }
    }
}

#[async_trait]
impl NewsRepository for Repository {
    async fn get_breaking_news(
        &self,
        country_code: &str,
        page: u32,
    ) -> Result<Option<NewsResponse>, ApiError> {
        self.api.top_headlines(country_code, page).await
    }

    async fn search_news(&self, query: &str, page: u32) -> Result<Option<NewsResponse>, ApiError> {
        self.api.search(query, page).await
    }

    async fn upsert(&self, article: &Article) -> Result<(), StoreError> {
        self.store.upsert(article).await
    }

    async fn delete_article(&self, article: &Article) -> Result<(), StoreError> {
        self.store.delete(article).await
    }

    fn saved_news(&self) -> watch::Receiver<Vec<Article>> {
        self.store.subscribe()
    }
}
