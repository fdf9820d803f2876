use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::connectivity::Connectivity;
use crate::error::FeedError;
use crate::model::{AccumulatedFeed, Article, FeedKind, FeedState, NewsResponse};
use crate::repository::NewsRepository;

/// Observable state of one feed. `None` until the first fetch starts.
pub type FeedStream = watch::Receiver<Option<FeedState<NewsResponse>>>;

struct FeedContext {
    feed: Mutex<AccumulatedFeed>,
    fetching: AtomicBool,
    state: watch::Sender<Option<FeedState<NewsResponse>>>,
}

impl FeedContext {
    fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            feed: Mutex::new(AccumulatedFeed::default()),
            fetching: AtomicBool::new(false),
            state,
        }
    }

    fn publish(&self, state: FeedState<NewsResponse>) {
        self.state.send_replace(Some(state));
    }

    /// Claims the feed for one fetch, or `None` if another fetch holds it.
    fn begin_fetch(&self) -> Option<InFlight<'_>> {
        self.fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(InFlight {
            ctx: self,
            previous: self.state.borrow().clone(),
            finished: false,
        })
    }
}

/// Releases the in-flight claim when dropped. A fetch dropped before it
/// published its result puts the stream back where it was.
struct InFlight<'a> {
    ctx: &'a FeedContext,
    previous: Option<FeedState<NewsResponse>>,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Fetch dropped before completion, restoring previous feed state");
            self.ctx.state.send_replace(self.previous.take());
        }
        self.ctx.fetching.store(false, Ordering::Release);
    }
}

/// Session-wide owner of the breaking-news and search feeds.
///
/// Each feed keeps its own page counter and running article list. Pages are
/// merged append-only; the counter moves only when a page is merged. A fetch
/// requested while the same feed is still fetching is dropped.
pub struct FeedAccumulator {
    repository: Arc<dyn NewsRepository>,
    connectivity: Arc<dyn Connectivity>,
    breaking: FeedContext,
    search: FeedContext,
}

impl FeedAccumulator {
    pub fn new(repository: Arc<dyn NewsRepository>, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            repository,
            connectivity,
            breaking: FeedContext::new(),
            search: FeedContext::new(),
        }
    }

    fn context(&self, kind: FeedKind) -> &FeedContext {
        match kind {
            FeedKind::Breaking => &self.breaking,
            FeedKind::Search => &self.search,
        }
    }

    pub fn subscribe(&self, kind: FeedKind) -> FeedStream {
        self.context(kind).state.subscribe()
    }

    pub fn state(&self, kind: FeedKind) -> Option<FeedState<NewsResponse>> {
        self.context(kind).state.borrow().clone()
    }

    pub fn saved_articles(&self) -> watch::Receiver<Vec<Article>> {
        self.repository.saved_news()
    }

    pub async fn snapshot(&self, kind: FeedKind) -> AccumulatedFeed {
        self.context(kind).feed.lock().await.clone()
    }

    pub async fn current_page(&self, kind: FeedKind) -> u32 {
        self.context(kind).feed.lock().await.current_page
    }

    /// Fetches the feed's next page and merges it.
    ///
    /// `query` is the country code for [`FeedKind::Breaking`] and the search
    /// text for [`FeedKind::Search`]. Returns the state that was published, or
    /// `None` when a fetch for this feed was already running.
    pub async fn fetch_next_page(
        &self,
        kind: FeedKind,
        query: &str,
    ) -> Option<FeedState<NewsResponse>> {
        let ctx = self.context(kind);
        let Some(in_flight) = ctx.begin_fetch() else {
            info!("{} fetch already in progress, skipping", kind.as_str());
            return None;
        };

        let state = self.run_fetch(ctx, kind, query).await;

        in_flight.finish();
        Some(state)
    }

    async fn run_fetch(
        &self,
        ctx: &FeedContext,
        kind: FeedKind,
        query: &str,
    ) -> FeedState<NewsResponse> {
        ctx.publish(FeedState::Loading);

        let mut feed = ctx.feed.lock().await;
        let state = match self.load_page(&mut feed, kind, query).await {
            Ok(merged) => FeedState::Success(merged),
            Err(e) => {
                warn!("{} fetch failed: {}", kind.as_str(), e);
                FeedState::Error(Some(e.user_message().to_string()))
            }
        };
        ctx.publish(state.clone());
        state
    }

    async fn load_page(
        &self,
        feed: &mut AccumulatedFeed,
        kind: FeedKind,
        query: &str,
    ) -> Result<NewsResponse, FeedError> {
        if !self.is_online().await {
            return Err(FeedError::NoConnectivity);
        }

        let page = feed.current_page;
        let fetched = match kind {
            FeedKind::Breaking => self.repository.get_breaking_news(query, page).await?,
            FeedKind::Search => self.repository.search_news(query, page).await?,
        }
        .ok_or(FeedError::EmptyBody)?;

        let merged = feed.merge(fetched);
        info!(
            "{} page {} merged, {} of {} articles loaded",
            kind.as_str(),
            page,
            merged.articles.len(),
            merged.total_results
        );
        Ok(merged)
    }

    /// Runs the connectivity check on the blocking pool; it may touch the filesystem.
    async fn is_online(&self) -> bool {
        let connectivity = self.connectivity.clone();
        match tokio::task::spawn_blocking(move || connectivity.is_online()).await {
            Ok(online) => online,
            Err(e) => {
                warn!("Connectivity check failed: {}", e);
                false
            }
        }
    }

    /// Starts a new lifetime for the feed: page 1, nothing accumulated, no state.
    pub async fn reset(&self, kind: FeedKind) {
        let ctx = self.context(kind);
        let mut feed = ctx.feed.lock().await;
        *feed = AccumulatedFeed::default();
        ctx.state.send_replace(None);
        info!("{} feed reset", kind.as_str());
    }

    pub async fn save_article(&self, article: &Article) -> Result<(), FeedError> {
        self.repository.upsert(article).await?;
        Ok(())
    }

    pub async fn delete_article(&self, article: &Article) -> Result<(), FeedError> {
        self.repository.delete_article(article).await?;
        Ok(())
    }

    pub fn spawn_next_page(
        self: &Arc<Self>,
        kind: FeedKind,
        query: String,
    ) -> JoinHandle<Option<FeedState<NewsResponse>>> {
        let this = self.clone();
        tokio::spawn(async move { this.fetch_next_page(kind, &query).await })
    }

    pub fn spawn_save(self: &Arc<Self>, article: Article) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.save_article(&article).await {
                error!("Failed to save article '{}': {}", article.url, e);
            }
        })
    }

    pub fn spawn_delete(self: &Arc<Self>, article: Article) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.delete_article(&article).await {
                error!("Failed to delete article '{}': {}", article.url, e);
            }
        })
    }
}
