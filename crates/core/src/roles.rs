//! Role names carried in access tokens.

/// Sees and annotates every video regardless of assignments.
pub const ROLE_ADMIN: &str = "admin";

/// Sees only the videos granted by their assignment rules.
pub const ROLE_ANNOTATOR: &str = "annotator";

/// Whether `role` bypasses assignment checks.
pub fn is_privileged(role: &str) -> bool {
    role == ROLE_ADMIN
}
