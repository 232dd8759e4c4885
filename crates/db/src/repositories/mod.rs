//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. `PgAssignmentSource` adapts the
//! assignment repository to the core `AssignmentSource` seam.

pub mod assignment_repo;

pub use assignment_repo::{AssignmentRepo, PgAssignmentSource};
