//! Video assignment rules and access decisions.
//!
//! Videos are named `{Competition}_{Gender}_SP#{Number}_{Name}.{ext}`.
//! A user sees a video when one of their rules grants it: either an
//! explicit rule naming the exact file, or a pattern over the parsed name.
//! Any failure while reading rules denies access.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp, UserId, VideoId};
use crate::video_library::validate_video_id;

/// Filename grammar for competition videos.
pub const IDENTITY_PATTERN: &str =
    r"^(?P<competition>[A-Za-z]+)_(?P<gender>[A-Za-z]+)_SP#(?P<number>\d{1,4})_(?P<name>.+)\.(?P<ext>[A-Za-z0-9]+)$";

static IDENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IDENTITY_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Structured view of a conforming video file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedVideo {
    pub competition: String,
    pub gender: String,
    /// Starting number in the short program.
    pub number: u32,
    pub name: String,
    pub extension: String,
}

/// Pattern rule; each present field narrows the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternRule {
    pub competition: Option<String>,
    pub gender: Option<String>,
    pub number_start: Option<u32>,
    pub number_end: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssignmentRule {
    Explicit { video_id: VideoId },
    Pattern(PatternRule),
}

/// A stored rule owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub id: DbId,
    pub user_id: UserId,
    pub rule: AssignmentRule,
    pub created_at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("assignment storage failed: {0}")]
    Storage(String),

    #[error("malformed assignment {id}: {reason}")]
    Malformed { id: DbId, reason: String },
}

// ---------------------------------------------------------------------------
// Filename grammar
// ---------------------------------------------------------------------------

/// Parse a competition video file name. Non-conforming names yield `None`.
pub fn parse_identity(filename: &str) -> Option<ParsedVideo> {
    let caps = IDENTITY_RE.captures(filename)?;
    Some(ParsedVideo {
        competition: caps["competition"].to_string(),
        gender: caps["gender"].to_string(),
        number: caps["number"].parse().ok()?,
        name: caps["name"].to_string(),
        extension: caps["ext"].to_string(),
    })
}

/// Canonical file name for a parsed video (two-digit starting number).
pub fn format_identity(video: &ParsedVideo) -> String {
    format!(
        "{}_{}_SP#{:02}_{}.{}",
        video.competition, video.gender, video.number, video.name, video.extension
    )
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Whether `video` satisfies every field present in `pattern`.
pub fn matches(video: &ParsedVideo, pattern: &PatternRule) -> bool {
    if let Some(competition) = &pattern.competition {
        if *competition != video.competition {
            return false;
        }
    }
    if let Some(gender) = &pattern.gender {
        if *gender != video.gender {
            return false;
        }
    }
    if let Some(start) = pattern.number_start {
        if video.number < start {
            return false;
        }
    }
    if let Some(end) = pattern.number_end {
        if video.number > end {
            return false;
        }
    }
    true
}

/// Whether a single rule grants access to `video`.
pub fn rule_grants(rule: &AssignmentRule, video: &str) -> bool {
    match rule {
        AssignmentRule::Explicit { video_id } => video_id == video,
        AssignmentRule::Pattern(pattern) => {
            parse_identity(video).is_some_and(|parsed| matches(&parsed, pattern))
        }
    }
}

/// Videos from `all_videos` granted by any rule, in library order.
pub fn assigned_videos(rules: &[AssignmentRule], all_videos: &[VideoId]) -> Vec<VideoId> {
    let mut seen = std::collections::HashSet::new();
    all_videos
        .iter()
        .filter(|video| rules.iter().any(|rule| rule_grants(rule, video)))
        .filter(|video| seen.insert(video.as_str()))
        .cloned()
        .collect()
}

/// Reject rules that can never match or name an invalid file.
pub fn validate_rule(rule: &AssignmentRule) -> Result<(), CoreError> {
    match rule {
        AssignmentRule::Explicit { video_id } => validate_video_id(video_id),
        AssignmentRule::Pattern(pattern) => {
            if let (Some(start), Some(end)) = (pattern.number_start, pattern.number_end) {
                if start > end {
                    return Err(CoreError::Validation(format!(
                        "number_start {start} is greater than number_end {end}"
                    )));
                }
            }
            for (field, value) in [
                ("competition", &pattern.competition),
                ("gender", &pattern.gender),
            ] {
                if value.as_deref().is_some_and(str::is_empty) {
                    return Err(CoreError::Validation(format!(
                        "{field} must be omitted rather than empty"
                    )));
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Rule storage seam
// ---------------------------------------------------------------------------

/// Where assignment rules live.
#[async_trait]
pub trait AssignmentSource: Send + Sync {
    /// Every assignment of one user, oldest first.
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Assignment>, AssignmentError>;

    async fn create(
        &self,
        user: UserId,
        rule: &AssignmentRule,
    ) -> Result<Assignment, AssignmentError>;

    /// Returns `false` when no assignment had that id.
    async fn delete(&self, id: DbId) -> Result<bool, AssignmentError>;

    async fn is_healthy(&self) -> bool {
        true
    }

    async fn rules_for_user(&self, user: UserId) -> Result<Vec<AssignmentRule>, AssignmentError> {
        Ok(self
            .list_for_user(user)
            .await?
            .into_iter()
            .map(|a| a.rule)
            .collect())
    }
}

/// Process-local rule storage.
#[derive(Default)]
pub struct InMemoryAssignments {
    inner: RwLock<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    next_id: DbId,
    by_id: HashMap<DbId, Assignment>,
}

impl InMemoryAssignments {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentSource for InMemoryAssignments {
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Assignment>, AssignmentError> {
        let state = self.inner.read().unwrap_or_else(|p| p.into_inner());
        let mut found: Vec<Assignment> = state
            .by_id
            .values()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.id);
        Ok(found)
    }

    async fn create(
        &self,
        user: UserId,
        rule: &AssignmentRule,
    ) -> Result<Assignment, AssignmentError> {
        let mut state = self.inner.write().unwrap_or_else(|p| p.into_inner());
        state.next_id += 1;
        let assignment = Assignment {
            id: state.next_id,
            user_id: user,
            rule: rule.clone(),
            created_at: chrono::Utc::now(),
        };
        state.by_id.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn delete(&self, id: DbId) -> Result<bool, AssignmentError> {
        let mut state = self.inner.write().unwrap_or_else(|p| p.into_inner());
        Ok(state.by_id.remove(&id).is_some())
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Access decisions for one rule source. Fails closed.
#[derive(Clone)]
pub struct AssignmentMatcher {
    source: Arc<dyn AssignmentSource>,
}

impl AssignmentMatcher {
    pub fn new(source: Arc<dyn AssignmentSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn AssignmentSource> {
        &self.source
    }

    /// True on the first rule granting `video`; false on any error.
    pub async fn has_access(&self, user: UserId, video: &str) -> bool {
        match self.source.rules_for_user(user).await {
            Ok(rules) => rules.iter().any(|rule| rule_grants(rule, video)),
            Err(e) => {
                tracing::warn!(user, video, error = %e, "Assignment lookup failed, denying access");
                false
            }
        }
    }

    /// Videos of `all_videos` visible to `user`; empty on any error.
    pub async fn assigned_videos(&self, user: UserId, all_videos: &[VideoId]) -> Vec<VideoId> {
        match self.source.rules_for_user(user).await {
            Ok(rules) => assigned_videos(&rules, all_videos),
            Err(e) => {
                tracing::warn!(user, error = %e, "Assignment lookup failed, showing no videos");
                Vec::new()
            }
        }
    }
}
