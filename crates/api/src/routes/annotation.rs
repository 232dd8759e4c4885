//! Route definitions for the caller's frame annotations.
//!
//! Mounted at `/annotations`.
//!
//! ```text
//! GET    /                                list_annotations
//! GET    /{video_id}                      get_annotation
//! PUT    /{video_id}                      replace_annotation
//! DELETE /{video_id}                      delete_annotation
//! GET    /{video_id}/segments             get_segments
//! GET    /{video_id}/stats                get_stats
//! PATCH  /{video_id}/frames/{index}       update_frame
//! PATCH  /{video_id}/range                update_range
//! ```

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::annotation;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(annotation::list_annotations))
        .route(
            "/{video_id}",
            get(annotation::get_annotation)
                .put(annotation::replace_annotation)
                .delete(annotation::delete_annotation),
        )
        .route("/{video_id}/segments", get(annotation::get_segments))
        .route("/{video_id}/stats", get(annotation::get_stats))
        .route(
            "/{video_id}/frames/{index}",
            patch(annotation::update_frame),
        )
        .route("/{video_id}/range", patch(annotation::update_range))
}
