//! Route definitions for video listing, streaming, and metadata.
//!
//! Mounted at `/videos`.
//!
//! ```text
//! GET  /                          list_videos
//! GET  /{video_id}/stream         stream_video
//! GET  /{video_id}/metadata       get_metadata
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(video::list_videos))
        .route("/{video_id}/stream", get(video::stream_video))
        .route("/{video_id}/metadata", get(video::get_metadata))
}
