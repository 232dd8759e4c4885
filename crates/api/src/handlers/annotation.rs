//! Handlers for the `/annotations` resource.
//!
//! Every record belongs to the caller: the user id always comes from the
//! token, never from the path.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rinkmark_core::annotation_store::AnnotationRecord;
use rinkmark_core::segments::Segment;
use rinkmark_core::types::VideoId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::{check_write_budget, ensure_video_access};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReplaceAnnotation {
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFrame {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRange {
    pub start_frame: i64,
    pub end_frame: i64,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct AnnotationSegments {
    pub video_id: VideoId,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Serialize)]
pub struct SavedAnnotation {
    pub video_id: VideoId,
    pub frame_count: usize,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/annotations
pub async fn list_annotations(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<VideoId>>>> {
    let videos = state.annotations.list(user.user_id).await?;
    Ok(Json(DataResponse { data: videos }))
}

/// GET /api/v1/annotations/{video_id}
///
/// First access initializes an all-`NONE` array sized to the video.
pub async fn get_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
) -> AppResult<Json<DataResponse<AnnotationRecord>>> {
    ensure_video_access(&state, &user, &video_id).await?;
    let record = state.annotations.record(user.user_id, &video_id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v1/annotations/{video_id}/segments
pub async fn get_segments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
) -> AppResult<Json<DataResponse<AnnotationSegments>>> {
    ensure_video_access(&state, &user, &video_id).await?;
    let segments = state.annotations.segments(user.user_id, &video_id).await?;
    Ok(Json(DataResponse {
        data: AnnotationSegments { video_id, segments },
    }))
}

/// GET /api/v1/annotations/{video_id}/stats
pub async fn get_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
) -> AppResult<Json<DataResponse<BTreeMap<String, usize>>>> {
    ensure_video_access(&state, &user, &video_id).await?;
    let stats = state.annotations.stats(user.user_id, &video_id).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// PUT /api/v1/annotations/{video_id}
///
/// Replaces the whole array. Last writer wins.
pub async fn replace_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
    Json(input): Json<ReplaceAnnotation>,
) -> AppResult<Json<DataResponse<SavedAnnotation>>> {
    ensure_video_access(&state, &user, &video_id).await?;
    check_write_budget(&state, &user)?;

    state
        .annotations
        .update_batch(user.user_id, &video_id, &input.labels)
        .await?;

    Ok(Json(DataResponse {
        data: SavedAnnotation {
            video_id,
            frame_count: input.labels.len(),
        },
    }))
}

/// PATCH /api/v1/annotations/{video_id}/frames/{index}
pub async fn update_frame(
    State(state): State<AppState>,
    user: AuthUser,
    Path((video_id, index)): Path<(VideoId, i64)>,
    Json(input): Json<UpdateFrame>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    ensure_video_access(&state, &user, &video_id).await?;
    check_write_budget(&state, &user)?;

    let labels = state
        .annotations
        .update_frame(user.user_id, &video_id, index, &input.label)
        .await?;
    Ok(Json(DataResponse { data: labels }))
}

/// PATCH /api/v1/annotations/{video_id}/range
///
/// Labels the inclusive range `[start_frame, end_frame]`.
pub async fn update_range(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
    Json(input): Json<UpdateRange>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    ensure_video_access(&state, &user, &video_id).await?;
    check_write_budget(&state, &user)?;

    let labels = state
        .annotations
        .update_range(
            user.user_id,
            &video_id,
            input.start_frame,
            input.end_frame,
            &input.label,
        )
        .await?;
    Ok(Json(DataResponse { data: labels }))
}

/// DELETE /api/v1/annotations/{video_id}
///
/// Idempotent: deleting a missing record is still 204.
pub async fn delete_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<VideoId>,
) -> AppResult<StatusCode> {
    ensure_video_access(&state, &user, &video_id).await?;
    check_write_budget(&state, &user)?;

    state.annotations.delete(user.user_id, &video_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
