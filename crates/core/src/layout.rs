//! Deterministic on-disk layout for annotation records and caches.
//!
//! ```text
//! {root}/cache/video_metadata.json
//! {root}/annotations/user_{id}/{video_id}.txt
//! {root}/annotations/user_{id}/annotation_cache.json
//! ```

use std::path::{Path, PathBuf};

use crate::types::UserId;

/// Extension of persisted frame-label files.
pub const ANNOTATION_EXTENSION: &str = "txt";

/// File name of the per-user "last annotated at" cache.
pub const USER_CACHE_FILE: &str = "annotation_cache.json";

/// File name of the shared video metadata cache.
pub const METADATA_CACHE_FILE: &str = "video_metadata.json";

const USER_DIR_PREFIX: &str = "user_";

/// Resolves every persisted path from a single data root.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.root.join("annotations")
    }

    pub fn user_dir(&self, user: UserId) -> PathBuf {
        self.annotations_dir()
            .join(format!("{USER_DIR_PREFIX}{user}"))
    }

    /// Path of the frame-label file for `(user, video)`.
    ///
    /// `video` must already be validated as a bare file name.
    pub fn annotation_file(&self, user: UserId, video: &str) -> PathBuf {
        self.user_dir(user)
            .join(format!("{video}.{ANNOTATION_EXTENSION}"))
    }

    pub fn user_cache_file(&self, user: UserId) -> PathBuf {
        self.user_dir(user).join(USER_CACHE_FILE)
    }

    pub fn metadata_cache_file(&self) -> PathBuf {
        self.root.join("cache").join(METADATA_CACHE_FILE)
    }

    /// Recover the user id from a `user_{id}` directory name.
    pub fn parse_user_dir(name: &str) -> Option<UserId> {
        name.strip_prefix(USER_DIR_PREFIX)?.parse().ok()
    }

    /// Recover the video id from an annotation file name.
    pub fn parse_annotation_file(name: &str) -> Option<&str> {
        let stem = name.strip_suffix(ANNOTATION_EXTENSION)?.strip_suffix('.')?;
        (!stem.is_empty()).then_some(stem)
    }
}
