//! Video assignment rows.

use rinkmark_core::assignment::{Assignment, AssignmentError, AssignmentRule, PatternRule};
use rinkmark_core::types::{DbId, Timestamp, UserId};
use sqlx::FromRow;

pub const TYPE_EXPLICIT: &str = "explicit";
pub const TYPE_PATTERN: &str = "pattern";

/// A row from the `video_assignments` table.
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: DbId,
    pub user_id: UserId,
    pub assignment_type: String,
    pub video_id: Option<String>,
    pub competition: Option<String>,
    pub gender: Option<String>,
    pub number_start: Option<i32>,
    pub number_end: Option<i32>,
    pub created_at: Timestamp,
}

/// Column values for inserting one rule.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AssignmentColumns {
    pub assignment_type: &'static str,
    pub video_id: Option<String>,
    pub competition: Option<String>,
    pub gender: Option<String>,
    pub number_start: Option<i32>,
    pub number_end: Option<i32>,
}

impl AssignmentColumns {
    pub fn from_rule(rule: &AssignmentRule) -> Result<Self, AssignmentError> {
        Ok(match rule {
            AssignmentRule::Explicit { video_id } => Self {
                assignment_type: TYPE_EXPLICIT,
                video_id: Some(video_id.clone()),
                ..Default::default()
            },
            AssignmentRule::Pattern(pattern) => Self {
                assignment_type: TYPE_PATTERN,
                video_id: None,
                competition: pattern.competition.clone(),
                gender: pattern.gender.clone(),
                number_start: pattern.number_start.map(to_column).transpose()?,
                number_end: pattern.number_end.map(to_column).transpose()?,
            },
        })
    }
}

fn to_column(number: u32) -> Result<i32, AssignmentError> {
    i32::try_from(number)
        .map_err(|_| AssignmentError::Storage(format!("starting number {number} out of range")))
}

fn from_column(id: DbId, number: Option<i32>) -> Result<Option<u32>, AssignmentError> {
    number
        .map(|n| {
            u32::try_from(n).map_err(|_| AssignmentError::Malformed {
                id,
                reason: format!("negative starting number {n}"),
            })
        })
        .transpose()
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = AssignmentError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let rule = match row.assignment_type.as_str() {
            TYPE_EXPLICIT => AssignmentRule::Explicit {
                video_id: row.video_id.ok_or_else(|| AssignmentError::Malformed {
                    id: row.id,
                    reason: "explicit assignment without video_id".into(),
                })?,
            },
            TYPE_PATTERN => AssignmentRule::Pattern(PatternRule {
                competition: row.competition,
                gender: row.gender,
                number_start: from_column(row.id, row.number_start)?,
                number_end: from_column(row.id, row.number_end)?,
            }),
            other => {
                return Err(AssignmentError::Malformed {
                    id: row.id,
                    reason: format!("unknown assignment_type '{other}'"),
                })
            }
        };
        Ok(Assignment {
            id: row.id,
            user_id: row.user_id,
            rule,
            created_at: row.created_at,
        })
    }
}
