use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Page size assumed for both remote endpoints.
pub const PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A single news article, as returned by the remote API and as stored locally.
///
/// Two articles are the *same item* when their URLs match; `PartialEq` compares
/// every field and is what decides whether a stored copy changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// One page of results from the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    #[serde(default)]
    pub articles: Vec<Article>,
    pub status: String,
    #[serde(default)]
    pub total_results: u32,
}

/// State of a fetch as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedState<T> {
    Loading,
    Success(T),
    Error(Option<String>),
}

impl<T> FeedState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FeedState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FeedState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            FeedState::Error(message) => message.as_deref(),
            _ => None,
        }
    }
}

/// The independently paginated feeds a session holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Breaking,
    Search,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Breaking => "breaking",
            FeedKind::Search => "search",
        }
    }
}

/// Running concatenation of every page fetched so far for one feed.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedFeed {
    /// Next page to request (1-based).
    pub current_page: u32,
    pub response: Option<NewsResponse>,
}

impl Default for AccumulatedFeed {
    fn default() -> Self {
        Self {
            current_page: 1,
            response: None,
        }
    }
}

impl AccumulatedFeed {
    /// Folds a freshly fetched page into the feed and advances the page counter.
    ///
    /// The first page is kept verbatim (including its `status` and
    /// `totalResults`); later pages only contribute their articles, appended in
    /// order. Duplicates are kept.
    pub fn merge(&mut self, page: NewsResponse) -> NewsResponse {
        let merged = match self.response.take() {
            Some(mut accumulated) => {
                accumulated.articles.extend(page.articles);
                accumulated
            }
            None => page,
        };
        self.current_page += 1;
        self.response.insert(merged).clone()
    }

    pub fn article_count(&self) -> usize {
        self.response.as_ref().map_or(0, |r| r.articles.len())
    }

    pub fn total_results(&self) -> u32 {
        self.response.as_ref().map_or(0, |r| r.total_results)
    }

    /// Whether the caller should stop asking for more pages.
    pub fn is_last_page(&self) -> bool {
        self.response.is_some() && is_last_page(self.current_page, self.total_results())
    }
}

/// Estimated page count for a result set, offset for a 1-based counter that
/// points at the next page to fetch.
pub fn total_pages(total_results: u32) -> u32 {
    total_results / PAGE_SIZE + 2
}

pub fn is_last_page(current_page: u32, total_results: u32) -> bool {
    current_page >= total_pages(total_results)
}

/// Keeps the first article for each URL, preserving order.
pub fn dedup_by_url(articles: &[Article]) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .iter()
        .filter(|&a| seen.insert(a.url.as_str()))
        .cloned()
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    mod wire_format_tests {
        use super::*;

        #[test]
        fn test_parse_news_api_response() {
            let json = r#"{
                "status": "ok",
                "totalResults": 38,
                "articles": [
                    {
                        "source": { "id": "bbc-news", "name": "BBC News" },
                        "author": "BBC",
                        "title": "Something happened",
                        "description": "Details",
                        "url": "https://bbc.example.com/1",
                        "urlToImage": "https://bbc.example.com/1.jpg",
                        "publishedAt": "2024-12-09T12:00:00Z",
                        "content": "Body"
                    }
                ]
            }"#;

            let response: NewsResponse = serde_json::from_str(json).unwrap();
            assert_eq!(response.status, "ok");
            assert_eq!(response.total_results, 38);
            assert_eq!(response.articles.len(), 1);

            let article = &response.articles[0];
            assert_eq!(article.source.id.as_deref(), Some("bbc-news"));
            assert_eq!(article.source.name.as_deref(), Some("BBC News"));
            assert_eq!(
                article.url_to_image.as_deref(),
                Some("https://bbc.example.com/1.jpg")
            );
            assert_eq!(article.published_at, "2024-12-09T12:00:00Z");
        }

        #[test]
        fn test_parse_article_with_null_fields() {
            let json = r#"{
                "source": { "id": null, "name": "Example" },
                "author": null,
                "title": "Title",
                "description": null,
                "url": "https://example.com/a",
                "urlToImage": null,
                "publishedAt": "2024-12-09T12:00:00Z",
                "content": null
            }"#;

            let article: Article = serde_json::from_str(json).unwrap();
            assert!(article.author.is_none());
            assert!(article.source.id.is_none());
            assert!(article.content.is_none());
        }

        #[test]
        fn test_article_without_url_is_rejected() {
            let json = r#"{ "title": "No url" }"#;
            assert!(serde_json::from_str::<Article>(json).is_err());
        }

        #[test]
        fn test_serializes_camel_case_keys() {
            let value = serde_json::to_value(article("https://a.com", "A")).unwrap();
            assert!(value.get("urlToImage").is_some());
            assert!(value.get("publishedAt").is_some());
            assert!(value.get("url_to_image").is_none());
        }
    }

    mod identity_tests {
        use super::*;

        #[test]
        fn test_same_url_is_one_item() {
            let a = article("https://a.com", "Original");
            let b = article("https://a.com", "Edited");
            assert_ne!(a, b);

            let distinct = dedup_by_url(&[a.clone(), b]);
            assert_eq!(distinct, vec![a]);
        }

        #[test]
        fn test_source_structural_equality() {
            let a = Source {
                id: Some("x".to_string()),
                name: Some("X".to_string()),
            };
            let b = a.clone();
            let c = Source {
                id: None,
                name: Some("X".to_string()),
            };
            assert_eq!(a, b);
            assert_ne!(a, c);
        }

        #[test]
        fn test_dedup_keeps_first_occurrence() {
            let articles = vec![
                article("https://a.com", "A1"),
                article("https://b.com", "B"),
                article("https://a.com", "A2"),
            ];
            let distinct = dedup_by_url(&articles);
            assert_eq!(distinct.len(), 2);
            assert_eq!(distinct[0].title, "A1");
            assert_eq!(distinct[1].title, "B");
        }
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn test_first_page_kept_verbatim() {
            let mut feed = AccumulatedFeed::default();
            let first = page(1..=20, 40);

            let merged = feed.merge(first.clone());
            assert_eq!(merged, first);
            assert_eq!(feed.current_page, 2);
        }

        #[test]
        fn test_later_pages_append_in_order() {
            let mut feed = AccumulatedFeed::default();
            feed.merge(NewsResponse {
                articles: vec![article("https://a1", "a1"), article("https://a2", "a2")],
                status: "ok".to_string(),
                total_results: 4,
            });
            let merged = feed.merge(NewsResponse {
                articles: vec![article("https://a3", "a3"), article("https://a4", "a4")],
                status: "ok".to_string(),
                total_results: 4,
            });

            let urls: Vec<_> = merged.articles.iter().map(|a| a.url.as_str()).collect();
            assert_eq!(urls, vec!["https://a1", "https://a2", "https://a3", "https://a4"]);
            assert_eq!(feed.current_page, 3);
        }

        #[test]
        fn test_duplicates_survive_merge() {
            let mut feed = AccumulatedFeed::default();
            feed.merge(page(1..=2, 4));
            let merged = feed.merge(page(2..=3, 4));
            assert_eq!(merged.articles.len(), 4);
        }

        #[test]
        fn test_counts_sum_over_pages() {
            let mut feed = AccumulatedFeed::default();
            let sizes = [20, 20, 7];
            let mut start = 1;
            for size in sizes {
                feed.merge(page(start..=start + size - 1, 47));
                start += size;
            }
            assert_eq!(feed.article_count(), 47);
            assert_eq!(feed.current_page, sizes.len() as u32 + 1);
        }
    }

    mod pagination_tests {
        use super::*;

        #[test]
        fn test_total_pages() {
            assert_eq!(total_pages(0), 2);
            assert_eq!(total_pages(40), 4);
            assert_eq!(total_pages(45), 4);
        }

        #[test]
        fn test_last_page_detection() {
            let mut feed = AccumulatedFeed::default();
            assert!(!feed.is_last_page());

            feed.merge(page(1..=20, 40));
            assert!(!feed.is_last_page());
            feed.merge(page(21..=40, 40));
            assert!(!feed.is_last_page());
            feed.merge(page(41..=40, 40));
            assert!(feed.is_last_page());
        }
    }

    mod feed_state_tests {
        use super::*;

        #[test]
        fn test_accessors() {
            let loading: FeedState<u32> = FeedState::Loading;
            assert!(loading.is_loading());
            assert!(loading.data().is_none());

            let ok = FeedState::Success(5);
            assert_eq!(ok.data(), Some(&5));
            assert!(ok.message().is_none());

            let err: FeedState<u32> = FeedState::Error(Some("boom".to_string()));
            assert_eq!(err.message(), Some("boom"));
        }
    }
}
