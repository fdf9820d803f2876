use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::model::{Article, Source};

/// Version stamped into `PRAGMA user_version`. Any other non-zero version
/// found on disk is discarded.
pub const SCHEMA_VERSION: i64 = 2;

#[derive(Debug, Clone, FromRow)]
struct ArticleRow {
    url: String,
    source_id: Option<String>,
    source_name: Option<String>,
    author: Option<String>,
    title: String,
    description: Option<String>,
    url_to_image: Option<String>,
    published_at: String,
    content: Option<String>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            source: Source {
                id: row.source_id,
                name: row.source_name,
            },
            author: row.author,
            title: row.title,
            description: row.description,
            url: row.url,
            url_to_image: row.url_to_image,
            published_at: row.published_at,
            content: row.content,
        }
    }
}

/// Saved articles, keyed by URL, with a live snapshot for subscribers.
pub struct ArticleStore {
    pool: SqlitePool,
    saved: watch::Sender<Vec<Article>>,
    publishing: Mutex<()>,
}

impl ArticleStore {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = if database_url.contains(":memory:") {
            // every connection to :memory: is a separate database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(database_url).await?;
        let (saved, _) = watch::channel(Vec::new());

        Ok(Self {
            pool,
            saved,
            publishing: Mutex::new(()),
        })
    }

    pub async fn initialize(&self) -> Result<(), StoreError> {
        let version = self.schema_version().await?;
        if version != 0 && version != SCHEMA_VERSION {
            warn!(
                found = version,
                expected = SCHEMA_VERSION,
                "Saved articles schema mismatch, discarding local data"
            );
            sqlx::query("DROP TABLE IF EXISTS articles")
                .execute(&self.pool)
                .await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                url TEXT PRIMARY KEY NOT NULL,
                source_id TEXT,
                source_name TEXT,
                author TEXT,
                title TEXT NOT NULL,
                description TEXT,
                url_to_image TEXT,
                published_at TEXT NOT NULL,
                content TEXT,
                saved_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_saved_at
            ON articles(saved_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .execute(&self.pool)
            .await?;

        self.publish().await?;
        info!("Saved articles store ready (schema v{})", SCHEMA_VERSION);
        Ok(())
    }

    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        let version = sqlx::query_scalar::<_, i64>("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Inserts the article, or replaces the stored one with the same URL.
    pub async fn upsert(&self, article: &Article) -> Result<(), StoreError> {
        let saved_at = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO articles (
                url, source_id, source_name, author, title, description,
                url_to_image, published_at, content, saved_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                source_id = excluded.source_id,
                source_name = excluded.source_name,
                author = excluded.author,
                title = excluded.title,
                description = excluded.description,
                url_to_image = excluded.url_to_image,
                published_at = excluded.published_at,
                content = excluded.content,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&article.url)
        .bind(&article.source.id)
        .bind(&article.source.name)
        .bind(&article.author)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.url_to_image)
        .bind(&article.published_at)
        .bind(&article.content)
        .bind(&saved_at)
        .execute(&self.pool)
        .await?;

        debug!("Saved article {}", article.url);
        self.publish().await
    }

    /// Removes the stored article with the same URL. Absent articles are not an error.
    pub async fn delete(&self, article: &Article) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE url = ?")
            .bind(&article.url)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            debug!("Article {} was not saved, nothing to delete", article.url);
            return Ok(());
        }

        debug!("Deleted article {}", article.url);
        self.publish().await
    }

    pub async fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT url, source_id, source_name, author, title, description,
                   url_to_image, published_at, content
            FROM articles
            ORDER BY saved_at DESC, url
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Live view of [`list_all`](Self::list_all), refreshed after every write.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Article>> {
        self.saved.subscribe()
    }

    async fn publish(&self) -> Result<(), StoreError> {
        let _guard = self.publishing.lock().await;
        let articles = self.list_all().await?;
        self.saved.send_replace(articles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::article;

    async fn create_test_store() -> ArticleStore {
        let store = ArticleStore::new("sqlite::memory:").await.unwrap();
        store.initialize().await.unwrap();
        store
    }

    mod initialization_tests {
        use super::*;

        #[tokio::test]
        async fn test_store_creation() {
            let store = ArticleStore::new("sqlite::memory:").await;
            assert!(store.is_ok());
        }

        #[tokio::test]
        async fn test_store_initialization() {
            let store = create_test_store().await;
            let articles = store.list_all().await.unwrap();
            assert!(articles.is_empty());
            assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
        }

        #[tokio::test]
        async fn test_double_initialization_keeps_data() {
            let store = create_test_store().await;
            store.upsert(&article("https://a.com", "A")).await.unwrap();

            let result = store.initialize().await;
            assert!(result.is_ok());
            assert_eq!(store.list_all().await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_schema_mismatch_discards_data() {
            let store = ArticleStore::new("sqlite::memory:").await.unwrap();

            sqlx::query("CREATE TABLE articles (id INTEGER PRIMARY KEY, url TEXT)")
                .execute(&store.pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO articles (url) VALUES ('https://old.com')")
                .execute(&store.pool)
                .await
                .unwrap();
            sqlx::query("PRAGMA user_version = 1")
                .execute(&store.pool)
                .await
                .unwrap();

            store.initialize().await.unwrap();

            assert!(store.list_all().await.unwrap().is_empty());
            assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
            // new schema is usable
            store.upsert(&article("https://new.com", "New")).await.unwrap();
            assert_eq!(store.list_all().await.unwrap().len(), 1);
        }
    }

    mod upsert_tests {
        use super::*;

        #[tokio::test]
        async fn test_save_then_list() {
            let store = create_test_store().await;
            let a = article("https://a.com", "A");

            store.upsert(&a).await.unwrap();

            let articles = store.list_all().await.unwrap();
            assert_eq!(articles.len(), 1);
            assert_eq!(articles[0], a);
        }

        #[tokio::test]
        async fn test_resave_replaces_record() {
            let store = create_test_store().await;

            store
                .upsert(&article("https://a.com", "Original Title"))
                .await
                .unwrap();
            store
                .upsert(&article("https://a.com", "Updated Title"))
                .await
                .unwrap();

            let articles = store.list_all().await.unwrap();
            assert_eq!(articles.len(), 1);
            assert_eq!(articles[0].url, "https://a.com");
            assert_eq!(articles[0].title, "Updated Title");
        }

        #[tokio::test]
        async fn test_round_trip_keeps_all_fields() {
            let store = create_test_store().await;
            let a = Article {
                source: Source {
                    id: Some("bbc-news".to_string()),
                    name: Some("BBC News".to_string()),
                },
                author: Some("Reporter".to_string()),
                title: "Title".to_string(),
                description: Some("Description".to_string()),
                url: "https://bbc.example.com/1".to_string(),
                url_to_image: Some("https://bbc.example.com/1.jpg".to_string()),
                published_at: "2024-12-09T12:00:00Z".to_string(),
                content: Some("Content".to_string()),
            };

            store.upsert(&a).await.unwrap();

            assert_eq!(store.list_all().await.unwrap(), vec![a]);
        }

        #[tokio::test]
        async fn test_upsert_multiple_articles() {
            let store = create_test_store().await;

            for i in 1..=5 {
                store
                    .upsert(&article(
                        &format!("https://article{}.com", i),
                        &format!("Title {}", i),
                    ))
                    .await
                    .unwrap();
            }

            assert_eq!(store.list_all().await.unwrap().len(), 5);
        }
    }

    mod delete_tests {
        use super::*;

        #[tokio::test]
        async fn test_delete_then_list() {
            let store = create_test_store().await;
            let a = article("https://a.com", "A");
            let b = article("https://b.com", "B");
            store.upsert(&a).await.unwrap();
            store.upsert(&b).await.unwrap();

            store.delete(&a).await.unwrap();

            let articles = store.list_all().await.unwrap();
            assert_eq!(articles, vec![b]);
        }

        #[tokio::test]
        async fn test_delete_matches_by_url_only() {
            let store = create_test_store().await;
            store
                .upsert(&article("https://a.com", "Stored Title"))
                .await
                .unwrap();

            store
                .delete(&article("https://a.com", "Different Title"))
                .await
                .unwrap();

            assert!(store.list_all().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_delete_absent_is_noop() {
            let store = create_test_store().await;
            let result = store.delete(&article("https://missing.com", "Nope")).await;
            assert!(result.is_ok());
        }
    }

    mod subscription_tests {
        use super::*;

        #[tokio::test]
        async fn test_subscribers_see_writes() {
            let store = create_test_store().await;
            let mut rx = store.subscribe();
            assert!(rx.borrow_and_update().is_empty());

            let a = article("https://a.com", "A");
            store.upsert(&a).await.unwrap();
            assert!(rx.has_changed().unwrap());
            assert_eq!(*rx.borrow_and_update(), vec![a.clone()]);

            store.delete(&a).await.unwrap();
            assert!(rx.has_changed().unwrap());
            assert!(rx.borrow_and_update().is_empty());
        }

        #[tokio::test]
        async fn test_initialize_publishes_existing_rows() {
            let store = create_test_store().await;
            store.upsert(&article("https://a.com", "A")).await.unwrap();

            let rx = store.subscribe();
            store.initialize().await.unwrap();
            assert_eq!(rx.borrow().len(), 1);
        }
    }
}
