//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly; no router is involved.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use rinkmark_api::error::AppError;
use rinkmark_core::annotation_store::AnnotationError;
use rinkmark_core::assignment::AssignmentError;
use rinkmark_core::error::CoreError;
use rinkmark_core::ffmpeg::FfmpegError;
use rinkmark_core::streamer::StreamError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Assignment",
        id: "42".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Assignment with id 42 not found");
}

#[tokio::test]
async fn out_of_range_returns_400() {
    let err = AppError::Annotation(AnnotationError::OutOfRange {
        index: -1,
        length: 900,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "OUT_OF_RANGE");
    assert_eq!(json["error"], "Frame index -1 outside 0..900");
}

#[tokio::test]
async fn invalid_label_returns_validation_error() {
    let err = AppError::Annotation(AnnotationError::Invalid(CoreError::Validation(
        "Label must not be empty".into(),
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn probe_timeout_returns_504() {
    let err = AppError::Annotation(AnnotationError::ProbeTimeout {
        video: "a.mp4".into(),
        limit: Duration::from_secs(5),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["code"], "PROBE_TIMEOUT");
}

#[tokio::test]
async fn missing_video_probe_returns_404_without_path() {
    let err = AppError::Annotation(AnnotationError::Probe {
        video: "a.mp4".into(),
        source: FfmpegError::VideoNotFound("/srv/videos/a.mp4".into()),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Video a.mp4 not found");
}

#[tokio::test]
async fn unreadable_video_returns_422() {
    let err = AppError::Probe(FfmpegError::ParseError("no streams".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "PROBE_FAILED");
}

#[tokio::test]
async fn unsupported_format_returns_400() {
    let err = AppError::Stream(StreamError::UnsupportedFormat("notes.txt".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn range_not_satisfiable_has_empty_body_and_content_range() {
    let response =
        AppError::Stream(StreamError::RangeNotSatisfiable { size: 1000 }).into_response();

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()["content-range"], "bytes */1000");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn rate_limited_returns_429_with_retry_after() {
    let response = AppError::RateLimited {
        retry_after: Duration::from_millis(12_400),
    }
    .into_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "12");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn assignment_storage_error_is_sanitized() {
    let err = AppError::Assignment(AssignmentError::Storage(
        "password authentication failed for user rinkmark".into(),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn forbidden_returns_403() {
    let err = AppError::Core(CoreError::Forbidden("Admin role required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}
