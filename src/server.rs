//! HTTP API serving normalized places, the backend `PlaceFetcher` tries first.

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::environment::Config;
use crate::places::{create_http_client, OpenDataClient};
use crate::TARGET_WEB_REQUEST;

/// Only records carrying some form of coordinates are requested.
pub const RECORDS_WITH_COORDINATES: &str =
    "coordenadas IS NOT NULL OR geo_loc IS NOT NULL OR (latitud IS NOT NULL AND longitud IS NOT NULL)";

/// Development origins always allowed next to the configured ones.
const LOCAL_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

const UPSTREAM_FAILURE: &str = "Failed to connect to the open data API";

pub struct AppState {
    pub open_data: OpenDataClient,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/api/places", get(list_places))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .map(String::as_str)
        .chain(LOCAL_ORIGINS.iter().copied())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "DIME online",
    })
}

/// Failures are reported as a 200 with an `error` field, the payload clients treat
/// as an explicit rejection.
async fn list_places(State(state): State<Arc<AppState>>) -> Response {
    match state.open_data.fetch_places().await {
        Ok(places) => {
            info!(target: TARGET_WEB_REQUEST, "Serving {} places", places.len());
            Json(places).into_response()
        }
        Err(e) => {
            error!(target: TARGET_WEB_REQUEST, "Failed to load places: {}", e);
            Json(ErrorResponse {
                error: UPSTREAM_FAILURE.to_string(),
            })
            .into_response()
        }
    }
}

/// Runs the API server on `0.0.0.0:<port>` until the process is stopped.
pub async fn serve(config: &Config) -> Result<()> {
    let client = create_http_client()?;
    let open_data = OpenDataClient::from_config(client, config)
        .with_where_clause(RECORDS_WITH_COORDINATES);
    let state = Arc::new(AppState { open_data });
    let app = router(state, &config.allowed_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(target: TARGET_WEB_REQUEST, "Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::places::PlaceFetcher;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn upstream() -> Router {
        Router::new()
            .route(
                "/resource.json",
                get(|| async {
                    Json(json!([
                        {
                            "infraestructura": "VILLA Olimpica",
                            "categoria": "DEPORTE",
                            "zona": "urbana",
                            "geo_loc": {"type": "Point", "coordinates": [-75.58, 9.52]}
                        },
                        {"infraestructura": "sin ubicacion", "latitud": 0, "longitud": 0}
                    ]))
                }),
            )
            .route(
                "/broken.json",
                get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
            )
    }

    async fn spawn_dime(upstream_base: &str, path: &str, origins: &[String]) -> String {
        let open_data = OpenDataClient::new(reqwest::Client::new(), format!("{}{}", upstream_base, path))
            .with_where_clause(RECORDS_WITH_COORDINATES);
        spawn(router(Arc::new(AppState { open_data }), origins)).await
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let upstream = spawn(upstream()).await;
        let dime = spawn_dime(&upstream, "/resource.json", &[]).await;

        let body: Value = reqwest::get(format!("{}/", dime)).await.unwrap().json().await.unwrap();
        assert_eq!(body, json!({"status": "DIME online"}));
    }

    #[tokio::test]
    async fn test_places_endpoint_serves_normalized_places() {
        let upstream = spawn(upstream()).await;
        let dime = spawn_dime(&upstream, "/resource.json", &[]).await;

        let body: Value = reqwest::get(format!("{}/api/places", dime))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            body,
            json!([{
                "id": 1,
                "name": "Villa Olímpica",
                "category": "Deporte",
                "location": {"lat": 9.52, "lng": -75.58},
                "address": "Zone: Urbana"
            }])
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_is_an_error_payload() {
        let upstream = spawn(upstream()).await;
        let dime = spawn_dime(&upstream, "/broken.json", &[]).await;

        let response = reqwest::get(format!("{}/api/places", dime)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": UPSTREAM_FAILURE}));
    }

    #[tokio::test]
    async fn test_fetcher_uses_server_as_backend() {
        let upstream = spawn(upstream()).await;
        let client = reqwest::Client::new();

        let dime = spawn_dime(&upstream, "/resource.json", &[]).await;
        let fallback = OpenDataClient::new(client.clone(), format!("{}/broken.json", upstream));
        let places = PlaceFetcher::with_parts(client.clone(), format!("{}/api/places", dime), fallback.clone())
            .fetch_places()
            .await
            .unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Villa Olímpica");

        // an error payload from the backend is final, the fallback is not consulted
        let failing = spawn_dime(&upstream, "/broken.json", &[]).await;
        let result = PlaceFetcher::with_parts(client, format!("{}/api/places", failing), fallback)
            .fetch_places()
            .await;
        assert!(matches!(result, Err(FetchError::BackendRejected(_))));
    }

    #[tokio::test]
    async fn test_cors_origins() {
        let upstream = spawn(upstream()).await;
        let client = reqwest::Client::new();

        let open = spawn_dime(&upstream, "/resource.json", &[]).await;
        let response = client
            .get(format!("{}/", open))
            .header("Origin", "https://anywhere.example")
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );

        let restricted = spawn_dime(
            &upstream,
            "/resource.json",
            &["https://dime.example.org".to_string()],
        )
        .await;
        let allowed = client
            .get(format!("{}/", restricted))
            .header("Origin", "http://localhost:5173")
            .send()
            .await
            .unwrap();
        assert_eq!(
            allowed.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
        let denied = client
            .get(format!("{}/", restricted))
            .header("Origin", "https://evil.example")
            .send()
            .await
            .unwrap();
        assert!(denied.headers().get("access-control-allow-origin").is_none());
    }
}
