use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::accumulator::FeedAccumulator;
use crate::error::FeedError;
use crate::model::{dedup_by_url, AccumulatedFeed, Article, FeedKind, FeedState, NewsResponse};

pub struct AppState {
    pub feeds: Arc<FeedAccumulator>,
    /// Country used when `/news/breaking/next` is called without one
    pub default_country: String,
}

/// What a feed screen needs to render one feed.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedView {
    pub state: String,
    pub message: Option<String>,
    pub articles: Vec<Article>,
    pub total_results: u32,
    pub next_page: u32,
    pub last_page: bool,
}

impl FeedView {
    pub fn new(state: Option<&FeedState<NewsResponse>>, feed: &AccumulatedFeed) -> Self {
        let (label, message) = match state {
            None => ("idle", None),
            Some(FeedState::Loading) => ("loading", None),
            Some(FeedState::Success(_)) => ("success", None),
            Some(FeedState::Error(message)) => ("error", message.clone()),
        };
        let articles = feed
            .response
            .as_ref()
            .map(|r| dedup_by_url(&r.articles))
            .unwrap_or_default();

        Self {
            state: label.to_string(),
            message,
            articles,
            total_results: feed.total_results(),
            next_page: feed.current_page,
            last_page: feed.is_last_page(),
        }
    }
}

// Custom error type
pub struct AppError(FeedError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.0.user_message().to_string(),
            }),
        )
            .into_response()
    }
}

impl<E: Into<FeedError>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/news/breaking", get(breaking))
        .route("/news/breaking/next", post(breaking_next))
        .route("/news/search", get(search).delete(search_reset))
        .route("/news/search/next", post(search_next))
        .route(
            "/saved",
            get(saved_list).post(saved_add).delete(saved_remove),
        )
        .with_state(state)
}

async fn view(feeds: &FeedAccumulator, kind: FeedKind) -> FeedView {
    let feed = feeds.snapshot(kind).await;
    FeedView::new(feeds.state(kind).as_ref(), &feed)
}

// The fetch runs in its own task so a client disconnect does not cancel it.
async fn next_page(feeds: &Arc<FeedAccumulator>, kind: FeedKind, query: &str) -> Response {
    let fetched = feeds.spawn_next_page(kind, query.to_string()).await;
    let feed = feeds.snapshot(kind).await;

    match fetched {
        Ok(Some(state)) => Json(FeedView::new(Some(&state), &feed)).into_response(),
        Ok(None) => (
            StatusCode::CONFLICT,
            Json(FeedView::new(feeds.state(kind).as_ref(), &feed)),
        )
            .into_response(),
        Err(e) => {
            error!("{} fetch task failed: {}", kind.as_str(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "Fetch task failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

// Route handlers
pub async fn health() -> &'static str {
    "OK"
}

pub async fn breaking(State(state): State<Arc<AppState>>) -> Json<FeedView> {
    Json(view(&state.feeds, FeedKind::Breaking).await)
}

#[derive(Debug, Deserialize)]
pub struct BreakingQuery {
    pub country: Option<String>,
}

pub async fn breaking_next(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BreakingQuery>,
) -> Response {
    let country = query
        .country
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.default_country.clone());
    next_page(&state.feeds, FeedKind::Breaking, &country).await
}

pub async fn search(State(state): State<Arc<AppState>>) -> Json<FeedView> {
    Json(view(&state.feeds, FeedKind::Search).await)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_next(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let q = query.q.trim();
    if q.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "Missing search query".to_string(),
            }),
        )
            .into_response();
    }
    next_page(&state.feeds, FeedKind::Search, q).await
}

pub async fn search_reset(State(state): State<Arc<AppState>>) -> StatusCode {
    state.feeds.reset(FeedKind::Search).await;
    StatusCode::NO_CONTENT
}

pub async fn saved_list(State(state): State<Arc<AppState>>) -> Json<Vec<Article>> {
    let saved = state.feeds.saved_articles().borrow().clone();
    Json(saved)
}

pub async fn saved_add(
    State(state): State<Arc<AppState>>,
    Json(article): Json<Article>,
) -> Result<StatusCode, AppError> {
    state.feeds.save_article(&article).await?;
    Ok(StatusCode::CREATED)
}

pub async fn saved_remove(
    State(state): State<Arc<AppState>>,
    Json(article): Json<Article>,
) -> Result<StatusCode, AppError> {
    state.feeds.delete_article(&article).await?;
    Ok(StatusCode::NO_CONTENT)
}
