//! Derived video properties and "last annotated at" timestamps.
//!
//! Nothing here is authoritative. The probe is ground truth for video
//! metadata and the annotation files are ground truth for edits, so every
//! read or write failure in this module degrades to a cache miss (logged)
//! instead of an error for the caller.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ffmpeg::{self, FfmpegError, VideoProbe};
use crate::keyed_lock::KeyedLocks;
use crate::layout::DataLayout;
use crate::persist::write_atomic;
use crate::types::{Timestamp, UserId, VideoId};

/// Schema version written into both cache files.
pub const CACHE_VERSION: u32 = 1;

/// Cached probe result for one video asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVideoMetadata {
    pub video_id: VideoId,
    pub fps: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    /// Asset size in bytes.
    pub size: u64,
    /// Modification time of the asset when it was probed.
    #[serde(rename = "sourceMTime")]
    pub source_mtime: Timestamp,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataCacheFile {
    version: u32,
    last_updated: Timestamp,
    videos: BTreeMap<VideoId, CachedVideoMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserAnnotationCacheFile {
    version: u32,
    last_updated: Timestamp,
    annotations: BTreeMap<VideoId, Timestamp>,
}

pub struct MetadataCache {
    layout: DataLayout,
    videos: RwLock<HashMap<VideoId, CachedVideoMetadata>>,
    /// Serializes snapshot-and-write of the metadata cache file.
    file_lock: tokio::sync::Mutex<()>,
    user_locks: KeyedLocks<UserId>,
}

impl MetadataCache {
    /// Load the metadata cache file. Missing or corrupt files start empty.
    pub async fn open(layout: DataLayout) -> Self {
        let path = layout.metadata_cache_file();
        let videos = match read_json::<MetadataCacheFile>(&path).await {
            Some(file) => {
                tracing::debug!(entries = file.videos.len(), "Loaded video metadata cache");
                file.videos.into_iter().collect()
            }
            None => HashMap::new(),
        };

        Self {
            layout,
            videos: RwLock::new(videos),
            file_lock: tokio::sync::Mutex::new(()),
            user_locks: KeyedLocks::new(),
        }
    }

    pub fn get(&self, video: &str) -> Option<CachedVideoMetadata> {
        self.videos
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(video)
            .cloned()
    }

    /// True when there is no entry or the asset changed after it was cached.
    pub fn is_stale(&self, video: &str, current_mtime: Timestamp) -> bool {
        match self.get(video) {
            Some(cached) => current_mtime > cached.source_mtime,
            None => true,
        }
    }

    /// Overwrite the entry for `video` and persist the whole cache.
    ///
    /// The file lock is held from snapshot to rename, so the last file
    /// written always holds every entry inserted before it.
    pub async fn refresh(&self, video: &str, mut fresh: CachedVideoMetadata) {
        fresh.video_id = video.to_string();
        let _file_guard = self.file_lock.lock().await;
        let snapshot: BTreeMap<VideoId, CachedVideoMetadata> = {
            let mut videos = self.videos.write().unwrap_or_else(|p| p.into_inner());
            videos.insert(video.to_string(), fresh);
            videos
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        let file = MetadataCacheFile {
            version: CACHE_VERSION,
            last_updated: Utc::now(),
            videos: snapshot,
        };
        write_json(&self.layout.metadata_cache_file(), &file).await;
    }

    /// Staleness-aware metadata read: serve the cached entry while the
    /// asset's mtime has not moved, otherwise probe and refresh.
    pub async fn metadata_for(
        &self,
        video: &str,
        path: &Path,
        probe: &dyn VideoProbe,
        probe_timeout: Duration,
    ) -> Result<CachedVideoMetadata, FfmpegError> {
        let stat = match tokio::fs::metadata(path).await {
            Ok(stat) => stat,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FfmpegError::VideoNotFound(video.to_string()));
            }
            Err(e) => return Err(FfmpegError::IoError(e)),
        };
        let mtime: Timestamp = stat.modified()?.into();

        if !self.is_stale(video, mtime) {
            if let Some(cached) = self.get(video) {
                return Ok(cached);
            }
        }

        tracing::debug!(video, "Video metadata stale, probing");
        let info = ffmpeg::probe_with_timeout(probe, path, probe_timeout).await?;
        let fresh = CachedVideoMetadata {
            video_id: video.to_string(),
            fps: info.fps,
            frame_count: info.frame_count,
            width: info.width,
            height: info.height,
            size: stat.len(),
            source_mtime: mtime,
        };
        self.refresh(video, fresh.clone()).await;
        Ok(fresh)
    }

    // -----------------------------------------------------------------------
    // Per-user annotation times
    // -----------------------------------------------------------------------

    /// Remember that `user` saved an annotation for `video` at `at`.
    pub async fn record_annotation(&self, user: UserId, video: &str, at: Timestamp) {
        let _guard = self.user_locks.lock(&user).await;
        let mut annotations = self.read_user_cache(user).await;
        annotations.insert(video.to_string(), at);
        self.write_user_cache(user, annotations).await;
    }

    /// Drop `video` from the user's annotation-time cache.
    pub async fn forget_annotation(&self, user: UserId, video: &str) {
        let _guard = self.user_locks.lock(&user).await;
        let mut annotations = self.read_user_cache(user).await;
        if annotations.remove(video).is_some() {
            self.write_user_cache(user, annotations).await;
        }
    }

    /// Every cached "last annotated at" entry for one user.
    pub async fn user_annotation_times(&self, user: UserId) -> BTreeMap<VideoId, Timestamp> {
        self.read_user_cache(user).await
    }

    /// Most recent annotation time for `video` across all users.
    ///
    /// Fans out over every user directory, so the cost grows with the
    /// number of annotators. Users without a cache entry fall back to the
    /// annotation file's mtime.
    pub async fn latest_annotation_time(&self, video: &str) -> Option<Timestamp> {
        let mut entries = match tokio::fs::read_dir(self.layout.annotations_dir()).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(error = %e, "Cannot scan annotation directory");
                }
                return None;
            }
        };

        let mut latest: Option<Timestamp> = None;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Annotation directory scan interrupted");
                    break;
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(user) = DataLayout::parse_user_dir(&name) else {
                continue;
            };

            let cached = self.read_user_cache(user).await.get(video).copied();
            let time = match cached {
                Some(at) => Some(at),
                None => file_mtime(&self.layout.annotation_file(user, video)).await,
            };
            latest = latest.max(time);
        }
        latest
    }

    async fn read_user_cache(&self, user: UserId) -> BTreeMap<VideoId, Timestamp> {
        read_json::<UserAnnotationCacheFile>(&self.layout.user_cache_file(user))
            .await
            .map(|file| file.annotations)
            .unwrap_or_default()
    }

    async fn write_user_cache(&self, user: UserId, annotations: BTreeMap<VideoId, Timestamp>) {
        let file = UserAnnotationCacheFile {
            version: CACHE_VERSION,
            last_updated: Utc::now(),
            annotations,
        };
        write_json(&self.layout.user_cache_file(user), &file).await;
    }
}

async fn file_mtime(path: &Path) -> Option<Timestamp> {
    let stat = tokio::fs::metadata(path).await.ok()?;
    stat.modified().ok().map(Into::into)
}

/// Read and parse a JSON cache file; any failure is a miss.
async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable cache file");
            }
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt cache file ignored");
            None
        }
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) {
    let bytes = match serde_json::to_vec_pretty(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cache serialization failed");
            return;
        }
    };
    if let Err(e) = write_atomic(path, &bytes).await {
        tracing::warn!(path = %path.display(), error = %e, "Cache write failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::ffmpeg::ProbeInfo;

    fn sample(video: &str, mtime: Timestamp) -> CachedVideoMetadata {
        CachedVideoMetadata {
            video_id: video.to_string(),
            fps: 30.0,
            frame_count: 900,
            width: 1920,
            height: 1080,
            size: 1234,
            source_mtime: mtime,
        }
    }

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    struct CountingProbe(AtomicUsize);

    #[async_trait]
    impl VideoProbe for CountingProbe {
        async fn probe(&self, _path: &Path) -> Result<ProbeInfo, FfmpegError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ProbeInfo {
                frame_count: 900,
                fps: 30.0,
                width: 1280,
                height: 720,
            })
        }
    }

    #[tokio::test]
    async fn staleness_follows_source_mtime() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cache = MetadataCache::open(DataLayout::new(dir.path())).await;

        assert!(cache.is_stale("a.mp4", at(100)));
        cache.refresh("a.mp4", sample("a.mp4", at(100))).await;
        assert!(!cache.is_stale("a.mp4", at(100)));
        assert!(!cache.is_stale("a.mp4", at(50)));
        assert!(cache.is_stale("a.mp4", at(101)));
    }

    #[tokio::test]
    async fn concurrent_refreshes_all_reach_disk() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = DataLayout::new(dir.path());
        let cache = Arc::new(MetadataCache::open(layout.clone()).await);

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let video = format!("clip_{i:02}.mp4");
                    cache.refresh(&video, sample(&video, at(100 + i))).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("refresh task");
        }

        let reopened = MetadataCache::open(layout).await;
        for i in 0..32 {
            let video = format!("clip_{i:02}.mp4");
            assert_eq!(
                reopened.get(&video).map(|m| m.source_mtime),
                Some(at(100 + i)),
                "{video} missing after reopen"
            );
        }
    }

    #[tokio::test]
    async fn refresh_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = DataLayout::new(dir.path());
        {
            let cache = MetadataCache::open(layout.clone()).await;
            cache.refresh("a.mp4", sample("a.mp4", at(100))).await;
        }
        let reopened = MetadataCache::open(layout.clone()).await;
        assert_eq!(reopened.get("a.mp4"), Some(sample("a.mp4", at(100))));

        let raw: serde_json::Value = serde_json::from_slice(
            &std::fs::read(layout.metadata_cache_file()).expect("read cache"),
        )
        .expect("json");
        assert_eq!(raw["version"], CACHE_VERSION);
        assert!(raw["lastUpdated"].is_string());
        assert_eq!(raw["videos"]["a.mp4"]["frameCount"], 900);
        assert!(raw["videos"]["a.mp4"]["sourceMTime"].is_string());
    }

    #[tokio::test]
    async fn corrupt_cache_is_a_miss() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = DataLayout::new(dir.path());
        let path = layout.metadata_cache_file();
        std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        std::fs::write(&path, b"{not json").expect("write");

        let cache = MetadataCache::open(layout).await;
        assert_eq!(cache.get("a.mp4"), None);
    }

    #[tokio::test]
    async fn metadata_for_probes_once_until_asset_changes() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let video_path = dir.path().join("a.mp4");
        std::fs::write(&video_path, b"0123456789").expect("write video");

        let cache = MetadataCache::open(DataLayout::new(dir.path().join("data"))).await;
        let probe = CountingProbe(AtomicUsize::new(0));
        let timeout = Duration::from_secs(5);

        let first = cache
            .metadata_for("a.mp4", &video_path, &probe, timeout)
            .await
            .expect("first");
        let second = cache
            .metadata_for("a.mp4", &video_path, &probe, timeout)
            .await
            .expect("second");

        assert_eq!(first, second);
        assert_eq!(first.size, 10);
        assert_eq!(probe.0.load(Ordering::SeqCst), 1);

        // Pretend the cached entry predates the asset.
        let mut old = first.clone();
        old.source_mtime = first.source_mtime - chrono::Duration::seconds(60);
        cache.refresh("a.mp4", old).await;
        cache
            .metadata_for("a.mp4", &video_path, &probe, timeout)
            .await
            .expect("third");
        assert_eq!(probe.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn metadata_for_missing_asset() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cache = MetadataCache::open(DataLayout::new(dir.path())).await;
        let probe = CountingProbe(AtomicUsize::new(0));
        let result = cache
            .metadata_for("nope.mp4", &dir.path().join("nope.mp4"), &probe, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(FfmpegError::VideoNotFound(_))));
        assert_eq!(probe.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn latest_annotation_time_is_max_over_users() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cache = MetadataCache::open(DataLayout::new(dir.path())).await;

        cache.record_annotation(1, "a.mp4", at(100)).await;
        cache.record_annotation(2, "a.mp4", at(300)).await;
        cache.record_annotation(3, "a.mp4", at(200)).await;
        cache.record_annotation(3, "b.mp4", at(900)).await;

        assert_eq!(cache.latest_annotation_time("a.mp4").await, Some(at(300)));
        assert_eq!(cache.latest_annotation_time("b.mp4").await, Some(at(900)));
        assert_eq!(cache.latest_annotation_time("c.mp4").await, None);
    }

    #[tokio::test]
    async fn forget_removes_user_entry() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cache = MetadataCache::open(DataLayout::new(dir.path())).await;

        cache.record_annotation(1, "a.mp4", at(100)).await;
        cache.record_annotation(1, "b.mp4", at(200)).await;
        cache.forget_annotation(1, "a.mp4").await;

        let times = cache.user_annotation_times(1).await;
        assert_eq!(times.len(), 1);
        assert_eq!(times.get("b.mp4"), Some(&at(200)));
    }

    #[tokio::test]
    async fn user_cache_file_format() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = DataLayout::new(dir.path());
        let cache = MetadataCache::open(layout.clone()).await;
        cache.record_annotation(5, "a.mp4", at(0)).await;

        let raw: serde_json::Value = serde_json::from_slice(
            &std::fs::read(layout.user_cache_file(5)).expect("read"),
        )
        .expect("json");
        assert_eq!(raw["version"], CACHE_VERSION);
        assert_eq!(raw["annotations"]["a.mp4"], "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn concurrent_records_for_one_user_are_not_lost() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cache = std::sync::Arc::new(MetadataCache::open(DataLayout::new(dir.path())).await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = std::sync::Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.record_annotation(1, &format!("v{i}.mp4"), at(i)).await;
            }));
        }
        for handle in handles {
            handle.await.expect("task");
        }
        assert_eq!(cache.user_annotation_times(1).await.len(), 16);
    }
}
