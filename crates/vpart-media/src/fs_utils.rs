//! Filesystem helpers for render artifacts.

use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Create `dir` and any missing parents.
pub async fn ensure_dir(dir: impl AsRef<Path>) -> MediaResult<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// Delete a file, treating "not found" as success.
///
/// Other errors are logged and swallowed; callers use this for cleanup
/// where a leftover file must not fail the segment.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_dir_creates_nested() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        // Idempotent
        ensure_dir(&nested).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("part_001.mp4");
        fs::write(&file, b"data").await.unwrap();

        assert!(remove_if_exists(&file).await);
        assert!(!file.exists());
        assert!(!remove_if_exists(&file).await);
    }
}
