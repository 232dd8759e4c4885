//! Atomic file replacement.
//!
//! Writers never touch the destination directly: content goes to a unique
//! sibling temp file which is then renamed over the target. Readers see
//! either the previous file or the new one, never a partial write.

use std::path::Path;

use tokio::io::AsyncWriteExt;

/// Atomically replace `path` with `contents`, creating parent directories.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("no parent directory for {}", path.display()),
        )
    })?;
    tokio::fs::create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    result
}

/// Remove `path`, treating "already gone" as success.
pub async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaces_content_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let target = dir.path().join("nested").join("labels.txt");

        write_atomic(&target, b"first\n").await.expect("first write");
        write_atomic(&target, b"second\n").await.expect("second write");

        let content = tokio::fs::read_to_string(&target).await.expect("read");
        assert_eq!(content, "second\n");

        let entries: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .expect("list")
            .filter_map(Result::ok)
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let target = dir.path().join("gone.txt");
        write_atomic(&target, b"x").await.expect("write");

        assert!(remove_if_exists(&target).await.expect("remove"));
        assert!(!remove_if_exists(&target).await.expect("remove again"));
    }
}
