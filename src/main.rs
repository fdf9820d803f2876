use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_reader::accumulator::FeedAccumulator;
use news_reader::api::NewsApiClient;
use news_reader::config::Config;
use news_reader::connectivity::{AssumeOnline, Connectivity, SysfsConnectivity};
use news_reader::db::ArticleStore;
use news_reader::model::FeedKind;
use news_reader::repository::Repository;
use news_reader::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_reader=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWS_READER_CONFIG").unwrap_or_else(|_| "news.toml".to_string());
    let config = Config::load(&config_path)?.with_env_overrides();
    info!("Loaded configuration from {}", config_path);
    if config.api_key.is_none() {
        info!("No API key configured, requests will be unauthenticated");
    }

    // Initialize saved-articles store
    let store = ArticleStore::new(&config.database_url).await?;
    store.initialize().await?;
    let store = Arc::new(store);

    let api = NewsApiClient::new(&config)?;
    let repository = Arc::new(Repository::new(api, store));

    let connectivity: Arc<dyn Connectivity> = if config.assume_online {
        Arc::new(AssumeOnline)
    } else {
        Arc::new(SysfsConnectivity::default())
    };

    let feeds = Arc::new(FeedAccumulator::new(repository, connectivity));

    // First page of breaking news, as the app does on launch
    feeds.spawn_next_page(FeedKind::Breaking, config.country.clone());

    let state = Arc::new(AppState {
        feeds,
        default_country: config.country.clone(),
    });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("Server starting on http://{}", config.listen);

    axum::serve(listener, app).await?;

    Ok(())
}
