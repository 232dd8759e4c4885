pub mod annotation;
pub mod assignment;
pub mod health;
pub mod video;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /videos                                         list visible videos
/// /videos/{video_id}/stream                       range-capable byte stream
/// /videos/{video_id}/metadata                     cached/probed metadata
///
/// /annotations                                    caller's annotated videos
/// /annotations/{video_id}                         get, replace (PUT), delete
/// /annotations/{video_id}/segments                run-length segments
/// /annotations/{video_id}/stats                   label counts
/// /annotations/{video_id}/frames/{index}          single frame (PATCH)
/// /annotations/{video_id}/range                   inclusive range (PATCH)
///
/// /admin/users/{user_id}/assignments              list, create (admin only)
/// /admin/assignments/{id}                         delete (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/videos", video::router())
        .nest("/annotations", annotation::router())
        .nest("/admin", assignment::router())
}
