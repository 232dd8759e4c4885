//! Route definitions for assignment administration.
//!
//! Mounted at `/admin`. All routes require the admin role.
//!
//! ```text
//! GET    /users/{user_id}/assignments     list_assignments
//! POST   /users/{user_id}/assignments     create_assignment
//! DELETE /assignments/{id}                delete_assignment
//! ```

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::assignment;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users/{user_id}/assignments",
            get(assignment::list_assignments).post(assignment::create_assignment),
        )
        .route("/assignments/{id}", delete(assignment::delete_assignment))
}
