//! HTTP server for the photo frame endpoints
//!
//! Provides /health, /files, /files/list, /files/{name} and /cache/stats.

use crate::lookup::{fetch_photo, Lookup};
use crate::source::PhotoSource;
use crate::types::{ErrorResponse, HealthResponse};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use photo_cache::{CacheKey, CacheStats, PhotoCache};
use rand::seq::IteratorRandom;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: Arc<PhotoCache>,
    pub source: Arc<dyn PhotoSource>,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: Arc<PhotoCache>, source: Arc<dyn PhotoSource>) -> Self {
        Self {
            cache,
            source,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/files", get(random_file))
        .route("/files/list", get(list_files))
        .route("/files/{name}", get(get_file))
        .route("/cache/stats", get(cache_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server, returning once `shutdown` resolves
pub async fn start_server(
    state: SharedState,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: uptime_secs(state.started_at, Utc::now()),
        cache: state.cache.stats(),
    })
}

/// Whole seconds since `started_at`, clamped at zero if the clock stepped back
fn uptime_secs(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - started_at).num_seconds().max(0) as u64
}

/// Serve a random photo from the album
async fn random_file(State(state): State<SharedState>) -> Response {
    let picked = state.cache.keys().into_iter().choose(&mut rand::rng());

    match picked {
        Some(key) => serve_photo(&state, key).await,
        None => error_response(StatusCode::NOT_FOUND, "No photos available"),
    }
}

/// List every photo in the album as `<cache_key>.jpg`
async fn list_files(State(state): State<SharedState>) -> Json<Vec<String>> {
    Json(
        state
            .cache
            .keys()
            .iter()
            .map(|key| format!("{}.jpg", key))
            .collect(),
    )
}

/// Serve a photo by name, with or without its `.jpg` suffix
async fn get_file(State(state): State<SharedState>, Path(name): Path<String>) -> Response {
    let key = CacheKey::from(name.strip_suffix(".jpg").unwrap_or(&name));

    if !state.cache.contains_key(&key) {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Photo '{}' not found", key),
        );
    }

    serve_photo(&state, key).await
}

async fn cache_stats(State(state): State<SharedState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

async fn serve_photo(state: &ServerState, key: CacheKey) -> Response {
    match fetch_photo(&state.cache, state.source.as_ref(), &key).await {
        Ok(Lookup::Hit(data)) => photo_response(&key, data, true),
        Ok(Lookup::Fetched(data)) => photo_response(&key, data, false),
        // Delisted by a sync between the catalog check and the lookup
        Ok(Lookup::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            format!("Photo '{}' not found", key),
        ),
        Err(e) => {
            warn!(cache_key = %key, error = %e, "Failed to fetch photo");
            error_response(StatusCode::BAD_GATEWAY, "Failed to fetch photo")
        }
    }
}

fn photo_response(key: &CacheKey, data: Bytes, from_cache: bool) -> Response {
    let cache_header = if from_cache { "HIT" } else { "MISS" };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.jpg\"", key),
            ),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            (HeaderName::from_static("x-cache"), cache_header.to_string()),
        ],
        Body::from(data),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}
