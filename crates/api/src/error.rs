use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rinkmark_core::annotation_store::AnnotationError;
use rinkmark_core::assignment::AssignmentError;
use rinkmark_core::byte_range::unsatisfied_content_range;
use rinkmark_core::error::CoreError;
use rinkmark_core::ffmpeg::FfmpegError;
use rinkmark_core::streamer::StreamError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the core error enums and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent `{ "error", "code" }` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Probe failure on the metadata read path.
    #[error(transparent)]
    Probe(#[from] FfmpegError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Rate limit exceeded, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Annotation(err) => match err {
                AnnotationError::Probe { video, source } => classify_probe_error(video, source),
                AnnotationError::ProbeTimeout { video, limit } => {
                    tracing::warn!(video, ?limit, "Probe timed out");
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        "PROBE_TIMEOUT",
                        format!("Reading video {video} timed out"),
                    )
                }
                AnnotationError::OutOfRange { index, length } => (
                    StatusCode::BAD_REQUEST,
                    "OUT_OF_RANGE",
                    format!("Frame index {index} outside 0..{length}"),
                ),
                AnnotationError::Invalid(core) => classify_core_error(core),
                AnnotationError::Io(e) => internal("Annotation I/O error", e),
            },

            AppError::Stream(err) => match err {
                StreamError::UnsupportedFormat(name) => (
                    StatusCode::BAD_REQUEST,
                    "UNSUPPORTED_FORMAT",
                    format!("Unsupported video format: {name}"),
                ),
                StreamError::NotFound(name) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Video {name} not found"),
                ),
                StreamError::Io(e) => internal("Stream I/O error", e),
                // Not a failure: empty body, size in Content-Range.
                StreamError::RangeNotSatisfiable { size } => {
                    return (
                        StatusCode::RANGE_NOT_SATISFIABLE,
                        [(header::CONTENT_RANGE, unsatisfied_content_range(*size))],
                        Body::empty(),
                    )
                        .into_response();
                }
            },

            AppError::Probe(err) => classify_probe_error("", err),

            AppError::Assignment(err) => internal("Assignment storage error", err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal("Internal error", msg),
            AppError::RateLimited { retry_after } => {
                let secs = retry_after.as_secs().max(1);
                let body = json!({
                    "error": format!("Too many requests, retry in {secs}s"),
                    "code": "RATE_LIMITED",
                });
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, secs.to_string())],
                    axum::Json(body),
                )
                    .into_response();
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => internal("Internal core error", msg),
    }
}

/// Missing assets are 404; anything else the probe reports means the asset
/// exists but cannot be read as video.
fn classify_probe_error(video: &str, err: &FfmpegError) -> (StatusCode, &'static str, String) {
    match err {
        FfmpegError::VideoNotFound(_) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            if video.is_empty() {
                "Video not found".to_string()
            } else {
                format!("Video {video} not found")
            },
        ),
        FfmpegError::Timeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "PROBE_TIMEOUT",
            "Reading video metadata timed out".to_string(),
        ),
        FfmpegError::NotFound(_) | FfmpegError::IoError(_) => internal("Probe unavailable", err),
        FfmpegError::ExecutionFailed { .. } | FfmpegError::ParseError(_) => {
            tracing::warn!(video, error = %err, "Video probe failed");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PROBE_FAILED",
                "Video could not be read".to_string(),
            )
        }
    }
}

fn internal(
    context: &'static str,
    err: impl std::fmt::Display,
) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
