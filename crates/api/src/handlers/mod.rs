//! Request handlers, one module per resource.

pub mod annotation;
pub mod assignment;
pub mod video;

use rinkmark_core::error::CoreError;
use rinkmark_core::video_library::validate_video_id;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Reject callers without an assignment granting `video`. Admins pass.
pub(crate) async fn ensure_video_access(
    state: &AppState,
    user: &AuthUser,
    video: &str,
) -> AppResult<()> {
    validate_video_id(video)?;
    if user.is_privileged() || state.matcher.has_access(user.user_id, video).await {
        return Ok(());
    }
    tracing::info!(user = user.user_id, video, "Video access denied");
    Err(AppError::Core(CoreError::Forbidden(format!(
        "Video {video} is not assigned to you"
    ))))
}

/// Count one annotation write against the caller's budget.
pub(crate) fn check_write_budget(state: &AppState, user: &AuthUser) -> AppResult<()> {
    state
        .rate_limiter
        .check(user.user_id)
        .map_err(|retry_after| AppError::RateLimited { retry_after })
}
