//! Handlers for the `/videos` resource.
//!
//! Listing is filtered by the caller's assignments; streaming and metadata
//! require access to the specific video.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{self, HeaderMap};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use rinkmark_core::assignment::{self, ParsedVideo};
use rinkmark_core::metadata_cache::CachedVideoMetadata;
use rinkmark_core::types::{Timestamp, VideoId};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::handlers::ensure_video_access;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VideoSummary {
    pub video_id: VideoId,
    /// Structured name, absent for non-conforming file names.
    pub identity: Option<ParsedVideo>,
    /// Zero-padded form of a conforming name, for spotting files to rename.
    pub canonical_name: Option<String>,
    /// Most recent annotation write by any user.
    pub last_annotated: Option<Timestamp>,
}

/// GET /api/v1/videos
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<VideoSummary>>>> {
    let all = state
        .library
        .list()
        .await
        .map_err(|e| AppError::InternalError(format!("Cannot list videos: {e}")))?;

    let visible = if user.is_privileged() {
        all
    } else {
        state.matcher.assigned_videos(user.user_id, &all).await
    };

    let mut summaries = Vec::with_capacity(visible.len());
    for video_id in visible {
        let last_annotated = state.metadata_cache.latest_annotation_time(&video_id).await;
        let identity = assignment::parse_identity(&video_id);
        summaries.push(VideoSummary {
            canonical_name: identity.as_ref().map(assignment::format_identity),
            identity,
            video_id,
            last_annotated,
        });
    }

    Ok(Json(DataResponse { data: summaries }))
}

/// GET /api/v1/videos/{video_id}/stream
///
/// Byte stream with single-range support. The body owns its file handle.
pub async fn stream_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    ensure_video_access(&state, &user, &video_id).await?;
    let path = state.library.resolve(&video_id)?;

    // A Range value that is not visible ASCII is ignored like any other
    // unparseable range.
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let served = state.streamer.serve(&path, range).await?;

    let status = StatusCode::from_u16(served.status.code())
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let mut builder = Response::builder().status(status);
    for (name, value) in served.headers() {
        builder = builder.header(name, value);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(served.body)))
        .map_err(|e| AppError::InternalError(format!("Cannot build stream response: {e}")))
}

/// GET /api/v1/videos/{video_id}/metadata
///
/// Served from the metadata cache while the asset is unchanged, probed
/// otherwise.
pub async fn get_metadata(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
) -> AppResult<Json<DataResponse<CachedVideoMetadata>>> {
    ensure_video_access(&state, &user, &video_id).await?;
    let path = state.library.resolve(&video_id)?;

    let metadata = state
        .metadata_cache
        .metadata_for(
            &video_id,
            &path,
            state.probe.as_ref(),
            state.config.probe_timeout(),
        )
        .await?;

    Ok(Json(DataResponse { data: metadata }))
}
