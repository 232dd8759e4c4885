//! Per-(user, video) frame-label storage.
//!
//! Each record is a flat UTF-8 file, one label per line with a trailing
//! newline, addressed by [`DataLayout::annotation_file`]. Writes replace the
//! file atomically and every operation on one key runs under that key's
//! lock, so a batch replace can never interleave with a point update.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::error::CoreError;
use crate::ffmpeg::{self, FfmpegError, VideoProbe};
use crate::keyed_lock::KeyedLocks;
use crate::layout::DataLayout;
use crate::metadata_cache::MetadataCache;
use crate::persist::{remove_if_exists, write_atomic};
use crate::segments::{self, Segment};
use crate::types::{Timestamp, UserId, VideoId};
use crate::video_library::{validate_video_id, VideoLibrary};

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("cannot probe video {video}: {source}")]
    Probe {
        video: VideoId,
        #[source]
        source: FfmpegError,
    },

    #[error("probing video {video} timed out after {limit:?}")]
    ProbeTimeout { video: VideoId, limit: Duration },

    #[error("frame index {index} outside 0..{length}")]
    OutOfRange { index: i64, length: usize },

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("annotation I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A persisted annotation with its modification time.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationRecord {
    pub video_id: VideoId,
    pub user_id: UserId,
    pub labels: Vec<String>,
    pub last_modified: Option<Timestamp>,
}

type RecordKey = (UserId, VideoId);

pub struct AnnotationStore {
    layout: DataLayout,
    library: VideoLibrary,
    probe: Arc<dyn VideoProbe>,
    probe_timeout: Duration,
    cache: Arc<MetadataCache>,
    locks: KeyedLocks<RecordKey>,
}

impl AnnotationStore {
    pub fn new(
        layout: DataLayout,
        library: VideoLibrary,
        probe: Arc<dyn VideoProbe>,
        probe_timeout: Duration,
        cache: Arc<MetadataCache>,
    ) -> Self {
        Self {
            layout,
            library,
            probe,
            probe_timeout,
            cache,
            locks: KeyedLocks::new(),
        }
    }

    /// Probe the video's frame count and persist an all-`NONE` array.
    ///
    /// Overwrites any existing record for the key.
    pub async fn initialize(
        &self,
        user: UserId,
        video: &str,
    ) -> Result<Vec<String>, AnnotationError> {
        validate_video_id(video)?;
        let _guard = self.locks.lock(&key(user, video)).await;
        self.initialize_locked(user, video).await
    }

    /// Read the persisted array, initializing it on first access.
    pub async fn load(&self, user: UserId, video: &str) -> Result<Vec<String>, AnnotationError> {
        validate_video_id(video)?;
        let _guard = self.locks.lock(&key(user, video)).await;
        self.load_locked(user, video).await
    }

    /// Set one frame's label and return the full updated array.
    pub async fn update_frame(
        &self,
        user: UserId,
        video: &str,
        frame_index: i64,
        label: &str,
    ) -> Result<Vec<String>, AnnotationError> {
        validate_video_id(video)?;
        segments::validate_label(label)?;
        let _guard = self.locks.lock(&key(user, video)).await;

        let mut labels = self.load_locked(user, video).await?;
        let index = check_index(frame_index, labels.len())?;
        labels[index] = label.to_string();
        self.save_locked(user, video, &labels).await?;

        tracing::debug!(user, video, frame = index, label, "Frame label updated");
        Ok(labels)
    }

    /// Label the inclusive frame range `[start, end]`.
    pub async fn update_range(
        &self,
        user: UserId,
        video: &str,
        start: i64,
        end: i64,
        label: &str,
    ) -> Result<Vec<String>, AnnotationError> {
        validate_video_id(video)?;
        segments::validate_label(label)?;
        if start > end {
            return Err(CoreError::Validation(format!(
                "Range start {start} is after end {end}"
            ))
            .into());
        }
        let _guard = self.locks.lock(&key(user, video)).await;

        let mut labels = self.load_locked(user, video).await?;
        let start_frame = check_index(start, labels.len())?;
        let end_frame = check_index(end, labels.len())?;
        segments::fill_range(
            &mut labels,
            &Segment {
                label: label.to_string(),
                start_frame,
                end_frame,
            },
        )?;
        self.save_locked(user, video, &labels).await?;

        tracing::debug!(user, video, start_frame, end_frame, label, "Frame range updated");
        Ok(labels)
    }

    /// Replace the whole array. Last writer wins; nothing is merged and the
    /// length is not re-checked against the video.
    pub async fn update_batch(
        &self,
        user: UserId,
        video: &str,
        labels: &[String],
    ) -> Result<(), AnnotationError> {
        validate_video_id(video)?;
        for label in labels {
            segments::validate_label(label)?;
        }
        let _guard = self.locks.lock(&key(user, video)).await;
        self.save_locked(user, video, labels).await?;

        tracing::debug!(user, video, frames = labels.len(), "Annotation batch saved");
        Ok(())
    }

    /// Frame count per label.
    pub async fn stats(
        &self,
        user: UserId,
        video: &str,
    ) -> Result<BTreeMap<String, usize>, AnnotationError> {
        let labels = self.load(user, video).await?;
        Ok(segments::label_counts(&labels))
    }

    /// Current annotation as segments.
    pub async fn segments(
        &self,
        user: UserId,
        video: &str,
    ) -> Result<Vec<Segment>, AnnotationError> {
        let labels = self.load(user, video).await?;
        Ok(segments::encode(&labels))
    }

    /// Labels plus the record file's modification time.
    pub async fn record(
        &self,
        user: UserId,
        video: &str,
    ) -> Result<AnnotationRecord, AnnotationError> {
        validate_video_id(video)?;
        let _guard = self.locks.lock(&key(user, video)).await;
        let labels = self.load_locked(user, video).await?;
        let last_modified = tokio::fs::metadata(self.layout.annotation_file(user, video))
            .await
            .and_then(|m| m.modified())
            .ok()
            .map(Timestamp::from);

        Ok(AnnotationRecord {
            video_id: video.to_string(),
            user_id: user,
            labels,
            last_modified,
        })
    }

    /// Remove the record. Succeeds when there is nothing to remove.
    pub async fn delete(&self, user: UserId, video: &str) -> Result<(), AnnotationError> {
        validate_video_id(video)?;
        let _guard = self.locks.lock(&key(user, video)).await;

        let removed = remove_if_exists(&self.layout.annotation_file(user, video)).await?;
        if removed {
            self.cache.forget_annotation(user, video).await;
            tracing::info!(user, video, "Annotation deleted");
        }
        Ok(())
    }

    /// Video ids the user has a persisted record for, sorted.
    pub async fn list(&self, user: UserId) -> Result<Vec<VideoId>, AnnotationError> {
        let mut entries = match tokio::fs::read_dir(self.layout.user_dir(user)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut videos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            // In-flight temp files end in `.tmp` and never parse as records.
            if let Some(video) = DataLayout::parse_annotation_file(&name) {
                videos.push(video.to_string());
            }
        }
        videos.sort();
        Ok(videos)
    }

    // -----------------------------------------------------------------------
    // Lock-held helpers
    // -----------------------------------------------------------------------

    async fn initialize_locked(
        &self,
        user: UserId,
        video: &str,
    ) -> Result<Vec<String>, AnnotationError> {
        let path = self.library.resolve(video)?;
        let info = ffmpeg::probe_with_timeout(self.probe.as_ref(), &path, self.probe_timeout)
            .await
            .map_err(|e| match e {
                FfmpegError::Timeout(limit) => AnnotationError::ProbeTimeout {
                    video: video.to_string(),
                    limit,
                },
                other => AnnotationError::Probe {
                    video: video.to_string(),
                    source: other,
                },
            })?;

        if info.frame_count == 0 {
            return Err(AnnotationError::Probe {
                video: video.to_string(),
                source: FfmpegError::ParseError("probe reported zero frames".into()),
            });
        }
        let frame_count = usize::try_from(info.frame_count).map_err(|_| {
            AnnotationError::Probe {
                video: video.to_string(),
                source: FfmpegError::ParseError(format!(
                    "frame count {} does not fit in memory",
                    info.frame_count
                )),
            }
        })?;

        let labels = segments::blank_labels(frame_count);
        self.save_locked(user, video, &labels).await?;

        tracing::info!(user, video, frame_count, fps = info.fps, "Annotation initialized");
        Ok(labels)
    }

    async fn load_locked(&self, user: UserId, video: &str) -> Result<Vec<String>, AnnotationError> {
        let path = self.layout.annotation_file(user, video);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(parse_labels(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.initialize_locked(user, video).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save_locked(
        &self,
        user: UserId,
        video: &str,
        labels: &[String],
    ) -> Result<(), AnnotationError> {
        let path = self.layout.annotation_file(user, video);
        write_atomic(&path, serialize_labels(labels).as_bytes()).await?;
        self.cache.record_annotation(user, video, Utc::now()).await;
        Ok(())
    }
}

fn key(user: UserId, video: &str) -> RecordKey {
    (user, video.to_string())
}

/// Validate a signed frame index against the persisted length.
fn check_index(index: i64, length: usize) -> Result<usize, AnnotationError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < length)
        .ok_or(AnnotationError::OutOfRange { index, length })
}

/// One label per line, trailing newline.
pub fn serialize_labels(labels: &[String]) -> String {
    let mut out = String::with_capacity(labels.iter().map(|l| l.len() + 1).sum());
    for label in labels {
        out.push_str(label);
        out.push('\n');
    }
    out
}

/// Inverse of [`serialize_labels`]; tolerates CRLF and drops trailing
/// empty lines.
pub fn parse_labels(content: &str) -> Vec<String> {
    let mut labels: Vec<String> = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    while labels.last().is_some_and(|l| l.is_empty()) {
        labels.pop();
    }
    labels
}
