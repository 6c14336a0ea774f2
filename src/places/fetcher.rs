//! Two-tier place retrieval: the DIME backend first, the open-data API as fallback.

use reqwest::header;
use serde_json::Value;
use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::client::{create_http_client, is_valid_url, OpenDataClient};
use super::types::{BackendError, Place, PRIMARY_TIMEOUT};
use crate::environment::Config;
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Anything that can produce the current list of places.
pub trait PlaceSource {
    fn fetch_places(&self) -> impl Future<Output = Result<Vec<Place>, FetchError>> + Send;
}

/// Outcome of asking the primary backend.
#[derive(Debug)]
enum BackendOutcome {
    Places(Vec<Place>),
    /// Unreachable, slow, non-2xx or unusable; the fallback tier takes over.
    Unavailable(String),
}

#[derive(Clone, Debug)]
pub struct PlaceFetcher {
    client: reqwest::Client,
    backend_url: String,
    public_host: String,
    local_hosts: Vec<String>,
    primary_timeout: Duration,
    open_data: OpenDataClient,
}

impl PlaceFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = create_http_client()?;
        let open_data = OpenDataClient::from_config(client.clone(), config);
        Ok(Self {
            client,
            backend_url: config.backend_url.clone(),
            public_host: config.public_host.clone(),
            local_hosts: config.local_hosts.clone(),
            primary_timeout: config.primary_timeout,
            open_data,
        })
    }

    /// Build a fetcher from explicit parts, used when the client is shared.
    pub fn with_parts(
        client: reqwest::Client,
        backend_url: impl Into<String>,
        open_data: OpenDataClient,
    ) -> Self {
        Self {
            client,
            backend_url: backend_url.into(),
            public_host: "localhost".to_string(),
            local_hosts: Vec::new(),
            primary_timeout: PRIMARY_TIMEOUT,
            open_data,
        }
    }

    pub fn with_public_host(mut self, public_host: impl Into<String>) -> Self {
        self.public_host = public_host.into();
        self
    }

    pub fn with_primary_timeout(mut self, primary_timeout: Duration) -> Self {
        self.primary_timeout = primary_timeout;
        self
    }

    /// Fetch places, trying the backend first unless it cannot be reached from here.
    ///
    /// Only an explicit backend rejection or a failed fallback request is returned as an
    /// error.
    pub async fn fetch_places(&self) -> Result<Vec<Place>, FetchError> {
        if !is_valid_url(&self.backend_url) {
            warn!(target: TARGET_WEB_REQUEST, "Invalid backend URL '{}', using open data API", self.backend_url);
        } else if should_skip_backend(&self.public_host, &self.backend_url, &self.local_hosts) {
            info!(
                target: TARGET_WEB_REQUEST,
                "Production host {} with local backend {}, using open data API",
                self.public_host,
                self.backend_url
            );
        } else {
            match self.fetch_from_backend().await? {
                BackendOutcome::Places(places) => {
                    info!(target: TARGET_WEB_REQUEST, "Fetched {} places from backend", places.len());
                    return Ok(places);
                }
                BackendOutcome::Unavailable(reason) => {
                    warn!(target: TARGET_WEB_REQUEST, "Backend unavailable ({}), using open data API", reason);
                }
            }
        }

        self.open_data.fetch_places().await
    }

    async fn fetch_from_backend(&self) -> Result<BackendOutcome, FetchError> {
        debug!(target: TARGET_WEB_REQUEST, "Attempting backend request to {}", self.backend_url);

        let request = async {
            let response = self
                .client
                .get(&self.backend_url)
                .header(header::ACCEPT, "application/json")
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match timeout(self.primary_timeout, request).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                return Ok(BackendOutcome::Unavailable(format!("request failed: {}", err)));
            }
            Err(_) => {
                return Ok(BackendOutcome::Unavailable(format!(
                    "timed out after {:?}",
                    self.primary_timeout
                )));
            }
        };

        if !status.is_success() {
            return Ok(BackendOutcome::Unavailable(format!("status {}", status)));
        }

        let payload: Value = match serde_json::from_slice(&body) {
            Ok(payload) => payload,
            Err(err) => {
                return Ok(BackendOutcome::Unavailable(format!("invalid JSON: {}", err)));
            }
        };

        match payload {
            Value::Array(_) => match serde_json::from_value::<Vec<Place>>(payload) {
                Ok(places) => Ok(BackendOutcome::Places(places)),
                Err(err) => Ok(BackendOutcome::Unavailable(format!(
                    "unexpected place shape: {}",
                    err
                ))),
            },
            Value::Object(ref object) if has_error_message(object) => {
                let message = serde_json::from_value::<BackendError>(payload.clone())
                    .map(|rejection| rejection.error)
                    .unwrap_or_else(|_| object["error"].to_string());
                warn!(target: TARGET_WEB_REQUEST, "Backend rejected request: {}", message);
                Err(FetchError::BackendRejected(message))
            }
            _ => Ok(BackendOutcome::Unavailable(
                "response is neither a place list nor an error".to_string(),
            )),
        }
    }
}

/// Only a non-empty string `error` counts; `null` or `""` is an unusable response.
fn has_error_message(object: &serde_json::Map<String, Value>) -> bool {
    object
        .get("error")
        .and_then(Value::as_str)
        .map_or(false, |message| !message.trim().is_empty())
}

/// Runs a place pipeline under an outer deadline. An expired deadline drops the
/// pipeline, cancelling any in-flight request, and yields no places.
pub async fn fetch_with_deadline<F>(deadline: Duration, pipeline: F) -> Result<Vec<Place>, FetchError>
where
    F: Future<Output = Result<Vec<Place>, FetchError>>,
{
    match timeout(deadline, pipeline).await {
        Ok(result) => result,
        Err(_) => {
            warn!(target: TARGET_WEB_REQUEST, "Fetching places timed out after {:?}", deadline);
            Ok(Vec::new())
        }
    }
}

impl PlaceSource for PlaceFetcher {
    async fn fetch_places(&self) -> Result<Vec<Place>, FetchError> {
        PlaceFetcher::fetch_places(self).await
    }
}

/// Whether the application runs on a public host while the backend is configured on
/// localhost, in which case the backend cannot be reached and is not attempted.
pub fn should_skip_backend(public_host: &str, backend_url: &str, local_hosts: &[String]) -> bool {
    is_production_host(public_host, local_hosts) && is_localhost_url(backend_url)
}

fn is_production_host(host: &str, local_hosts: &[String]) -> bool {
    let host = host.trim().to_lowercase();
    !(host == "localhost"
        || host == "127.0.0.1"
        || host.contains("192.168.")
        || local_hosts.iter().any(|local| local.eq_ignore_ascii_case(&host)))
}

fn is_localhost_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.host_str(), Some("localhost")),
        Err(_) => url.contains("localhost"),
    }
}
