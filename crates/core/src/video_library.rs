//! Video asset directory: enumeration and id → path resolution.
//!
//! A video's identity is its bare file name inside the library root.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::types::VideoId;

/// Supported video container extensions and their MIME types.
const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
];

/// Lowercased extension of `name`, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// MIME type for a supported video file name, `None` when unsupported.
pub fn video_content_type(name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?;
    VIDEO_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Reject ids that could escape the library root or name nothing.
pub fn validate_video_id(video: &str) -> Result<(), CoreError> {
    if video.is_empty() {
        return Err(CoreError::Validation("Video id must not be empty".into()));
    }
    if video == "." || video == ".." || video.contains(['/', '\\', '\0']) {
        return Err(CoreError::Validation(format!(
            "Invalid video id '{video}'"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct VideoLibrary {
    root: PathBuf,
}

impl VideoLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a video id. Does not check existence.
    pub fn resolve(&self, video: &str) -> Result<PathBuf, CoreError> {
        validate_video_id(video)?;
        Ok(self.root.join(video))
    }

    /// All supported video files in the library, sorted by name.
    ///
    /// A missing library directory is an empty library.
    pub async fn list(&self) -> std::io::Result<Vec<VideoId>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(root = %self.root.display(), "Video directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut videos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if video_content_type(&name).is_some() {
                videos.push(name);
            }
        }
        videos.sort();
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types() {
        assert_eq!(video_content_type("a.mp4"), Some("video/mp4"));
        assert_eq!(video_content_type("A.MOV"), Some("video/quicktime"));
        assert_eq!(video_content_type("clip.webm"), Some("video/webm"));
        assert_eq!(video_content_type("notes.txt"), None);
        assert_eq!(video_content_type("noext"), None);
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(validate_video_id("Olympic_Men_SP#01_A.mp4").is_ok());
        assert!(validate_video_id("").is_err());
        assert!(validate_video_id("..").is_err());
        assert!(validate_video_id("../secret.mp4").is_err());
        assert!(validate_video_id("dir/a.mp4").is_err());
        assert!(validate_video_id("dir\\a.mp4").is_err());
    }

    #[tokio::test]
    async fn lists_only_video_files() {
        let dir = tempfile::tempdir().expect("create temp dir");
        for name in ["b.mp4", "a.webm", "readme.txt"] {
            std::fs::write(dir.path().join(name), b"x").expect("write");
        }
        std::fs::create_dir(dir.path().join("sub.mp4")).expect("mkdir");

        let library = VideoLibrary::new(dir.path());
        assert_eq!(library.list().await.expect("list"), vec!["a.webm", "b.mp4"]);
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let library = VideoLibrary::new(dir.path().join("nope"));
        assert!(library.list().await.expect("list").is_empty());
    }
}
