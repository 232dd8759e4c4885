//! Router assembly for the annotation server.
//!
//! `main.rs` and the integration tests both go through [`build_app_router`],
//! so every test request crosses the same layers as production traffic.

use std::time::Duration;

use axum::http::header::{
    ACCEPT_RANGES, AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE, RETRY_AFTER,
};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// How long browsers may cache a preflight answer.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Headers the web player and annotation editor send.
const CLIENT_REQUEST_HEADERS: [HeaderName; 3] = [CONTENT_TYPE, AUTHORIZATION, RANGE];

/// Response headers a cross-origin client must be able to read. A seeking
/// player needs the range headers of a 206 and the editor backs off on 429.
const CLIENT_VISIBLE_HEADERS: [HeaderName; 4] =
    [CONTENT_RANGE, ACCEPT_RANGES, CONTENT_LENGTH, RETRY_AFTER];

/// Build the annotation server: `/health` at the root, the video,
/// annotation and assignment resources under `/api/v1`.
///
/// Layers from the outside in:
///
/// | Layer | Purpose |
/// |-------|---------|
/// | CORS | browser player on another origin |
/// | request id | `x-request-id` assigned, echoed back |
/// | trace | one span per request |
/// | timeout | 408 when handlers stall (stream bodies are not bounded) |
/// | catch panic | 500 instead of a dropped connection |
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(trace)
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the browser clients listed in `CORS_ORIGINS`.
///
/// Panics at startup on an origin that is not a valid header value.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{origin}': {e}"))
        })
        .collect();

    // Annotation writes use PUT and PATCH, assignment admin uses POST and DELETE.
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ];

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(CLIENT_REQUEST_HEADERS)
        .expose_headers(CLIENT_VISIBLE_HEADERS)
        .allow_credentials(true)
        .max_age(PREFLIGHT_MAX_AGE)
}
