use std::time::Duration;
use thiserror::Error;

/// Failures that escape `PlaceFetcher::fetch_places`.
///
/// An unreachable, slow or non-2xx primary backend is not represented here: that is
/// logged and the open-data fallback runs instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The primary backend answered with an explicit `{"error": ...}` payload.
    #[error("backend rejected the request: {0}")]
    BackendRejected(String),

    #[error("open data API returned status {status}")]
    FallbackStatus { status: reqwest::StatusCode },

    #[error("open data API request failed: {0}")]
    FallbackRequest(#[from] reqwest::Error),

    #[error("open data API request timed out after {0:?}")]
    FallbackTimeout(Duration),

    #[error("failed to decode open data API response: {0}")]
    FallbackDecode(#[source] serde_json::Error),

    #[error("invalid open data URL {0}")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to (de)serialize cached value: {0}")]
    Serialization(#[from] serde_json::Error),
}
