//! Repository for the `video_assignments` table.

use async_trait::async_trait;
use rinkmark_core::assignment::{Assignment, AssignmentError, AssignmentRule, AssignmentSource};
use rinkmark_core::types::{DbId, UserId};
use sqlx::PgPool;

use crate::models::assignment::{AssignmentColumns, AssignmentRow};

/// Column list for video_assignments queries.
const COLUMNS: &str = "id, user_id, assignment_type, video_id, competition, gender, \
    number_start, number_end, created_at";

/// Provides CRUD operations for assignment rules.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Insert a rule, returning the created row.
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        cols: &AssignmentColumns,
    ) -> Result<AssignmentRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO video_assignments
                (user_id, assignment_type, video_id, competition, gender, number_start, number_end)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(user_id)
            .bind(cols.assignment_type)
            .bind(&cols.video_id)
            .bind(&cols.competition)
            .bind(&cols.gender)
            .bind(cols.number_start)
            .bind(cols.number_end)
            .fetch_one(pool)
            .await
    }

    /// List a user's rules, oldest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<AssignmentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM video_assignments
             WHERE user_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a rule by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM video_assignments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// [`AssignmentSource`] backed by Postgres.
#[derive(Clone)]
pub struct PgAssignmentSource {
    pool: PgPool,
}

impl PgAssignmentSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage(e: sqlx::Error) -> AssignmentError {
    AssignmentError::Storage(e.to_string())
}

#[async_trait]
impl AssignmentSource for PgAssignmentSource {
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Assignment>, AssignmentError> {
        AssignmentRepo::list_by_user(&self.pool, user)
            .await
            .map_err(storage)?
            .into_iter()
            .map(Assignment::try_from)
            .collect()
    }

    async fn create(
        &self,
        user: UserId,
        rule: &AssignmentRule,
    ) -> Result<Assignment, AssignmentError> {
        let cols = AssignmentColumns::from_rule(rule)?;
        let row = AssignmentRepo::create(&self.pool, user, &cols)
            .await
            .map_err(storage)?;
        Assignment::try_from(row)
    }

    async fn delete(&self, id: DbId) -> Result<bool, AssignmentError> {
        AssignmentRepo::delete(&self.pool, id).await.map_err(storage)
    }

    async fn is_healthy(&self) -> bool {
        crate::health_check(&self.pool).await.is_ok()
    }
}
