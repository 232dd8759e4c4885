//! Admin handlers for per-user video assignment rules.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rinkmark_core::assignment::{self, Assignment, AssignmentRule};
use rinkmark_core::error::CoreError;
use rinkmark_core::types::{DbId, UserId};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/users/{user_id}/assignments
pub async fn list_assignments(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<DataResponse<Vec<Assignment>>>> {
    let assignments = state.assignments.list_for_user(user_id).await?;
    Ok(Json(DataResponse { data: assignments }))
}

/// POST /api/v1/admin/users/{user_id}/assignments
///
/// Body is a rule: `{"type": "explicit", "video_id": ...}` or
/// `{"type": "pattern", "competition"?, "gender"?, "number_start"?, "number_end"?}`.
pub async fn create_assignment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<UserId>,
    Json(rule): Json<AssignmentRule>,
) -> AppResult<(StatusCode, Json<DataResponse<Assignment>>)> {
    assignment::validate_rule(&rule)?;
    let created = state.assignments.create(user_id, &rule).await?;

    tracing::info!(
        admin = admin.user_id,
        user_id,
        assignment_id = created.id,
        "Assignment created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// DELETE /api/v1/admin/assignments/{id}
pub async fn delete_assignment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.assignments.delete(id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Assignment",
            id: id.to_string(),
        }));
    }
    tracing::info!(admin = admin.user_id, assignment_id = id, "Assignment deleted");
    Ok(StatusCode::NO_CONTENT)
}
