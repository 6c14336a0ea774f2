//! HTTP client creation and the open-data API tier.

use reqwest::header;
use serde_json::Value;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::transform::transform_records;
use super::types::{Place, APP_TOKEN_HEADER, FALLBACK_TIMEOUT, PAGE_LIMIT};
use crate::environment::Config;
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

const USER_AGENT: &str = concat!("dime/", env!("CARGO_PKG_VERSION"));

/// Create the HTTP client shared by both fetch tiers.
pub fn create_http_client() -> Result<reqwest::Client, FetchError> {
    debug!(target: TARGET_WEB_REQUEST, "Creating HTTP client");
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// Client for the public open-data endpoint that serves raw place records.
#[derive(Clone, Debug)]
pub struct OpenDataClient {
    client: reqwest::Client,
    url: String,
    app_token: Option<String>,
    page_limit: u32,
    where_clause: Option<String>,
    timeout: Duration,
}

impl OpenDataClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            app_token: None,
            page_limit: PAGE_LIMIT,
            where_clause: None,
            timeout: FALLBACK_TIMEOUT,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        let mut open_data = Self::new(client, config.open_data_url.clone())
            .with_page_limit(config.page_limit)
            .with_timeout(config.fallback_timeout);
        open_data.app_token = config.app_token.clone();
        open_data
    }

    pub fn with_app_token(mut self, token: impl Into<String>) -> Self {
        self.app_token = Some(token.into());
        self
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server-side SoQL filter sent as `$where`.
    pub fn with_where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Request URL including the page-size limit and the optional filter.
    pub fn request_url(&self) -> Result<url::Url, FetchError> {
        let mut url = url::Url::parse(&self.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("$limit", &self.page_limit.to_string());
            if let Some(clause) = &self.where_clause {
                query.append_pair("$where", clause);
            }
        }
        Ok(url)
    }

    /// Fetch the raw records. Non-2xx, transport errors, timeouts and undecodable
    /// bodies are errors; a body of an unexpected shape is an empty list.
    pub async fn fetch_records(&self) -> Result<Vec<Value>, FetchError> {
        let url = self.request_url()?;
        info!(target: TARGET_WEB_REQUEST, "Fetching places from open data API {}", url);

        let mut request = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.app_token {
            request = request.header(APP_TOKEN_HEADER, token);
        }

        let fetch = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                warn!(target: TARGET_WEB_REQUEST, "Non-success status {} from {}", status, url);
                return Err(FetchError::FallbackStatus { status });
            }
            Ok::<_, FetchError>(response.bytes().await?)
        };

        let body = timeout(self.timeout, fetch)
            .await
            .map_err(|_| FetchError::FallbackTimeout(self.timeout))??;

        let payload: Value = serde_json::from_slice(&body).map_err(FetchError::FallbackDecode)?;
        let records = extract_records(payload);
        debug!(target: TARGET_WEB_REQUEST, "Received {} records from {}", records.len(), url);
        Ok(records)
    }

    /// Fetch and transform in one step.
    pub async fn fetch_places(&self) -> Result<Vec<Place>, FetchError> {
        let records = self.fetch_records().await?;
        let places = transform_records(&Value::Array(records));
        info!(target: TARGET_WEB_REQUEST, "Open data API yielded {} valid places", places.len());
        Ok(places)
    }
}

/// Accepts a bare array or an object wrapping the array in `data`.
fn extract_records(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(records)) => records,
            _ => {
                warn!(target: TARGET_WEB_REQUEST, "Open data response has no record array, treating as empty");
                Vec::new()
            }
        },
        _ => {
            warn!(target: TARGET_WEB_REQUEST, "Unexpected open data response shape, treating as empty");
            Vec::new()
        }
    }
}
