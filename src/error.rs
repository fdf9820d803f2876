use thiserror::Error;

/// Failures talking to the remote news API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures in the local saved-articles store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// Everything that can go wrong behind a feed or saved-articles command.
///
/// Each variant carries a fixed message suitable for showing to a user; see
/// [`FeedError::user_message`].
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no internet connection")]
    NoConnectivity,

    #[error("network failure: {0}")]
    Transport(#[source] ApiError),

    #[error("conversion error: {0}")]
    Malformed(#[source] ApiError),

    #[error("empty response body")]
    EmptyBody,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl FeedError {
    pub fn user_message(&self) -> &'static str {
        match self {
            FeedError::NoConnectivity => "No internet connection",
            FeedError::Transport(_) => "Network failure",
            FeedError::Malformed(_) => "Conversion Error",
            FeedError::EmptyBody => "Empty response body",
            FeedError::Storage(_) => "Storage unavailable",
        }
    }
}

impl From<ApiError> for FeedError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Malformed(_) => FeedError::Malformed(err),
            ApiError::Transport(_) | ApiError::Status { .. } => FeedError::Transport(err),
        }
    }
}
