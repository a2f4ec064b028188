//! services/api/src/uploads.rs
//!
//! The ephemeral upload area. Each request's file is spilled to disk under a
//! generated unique name and wrapped in a guard that removes it again no
//! matter which exit path the request takes. Names never collide, so
//! concurrent requests need no locking over the shared directory.

use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// A shared filesystem directory holding in-flight uploads.
#[derive(Clone)]
pub struct UploadArea {
    dir: PathBuf,
}

impl UploadArea {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Creates the directory at startup if it is missing.
    pub async fn ensure_exists(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Writes `bytes` under `{uuid}{original extension}` and returns a guard
    /// owning the file's lifetime.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<TempUpload> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let path = self.dir.join(format!("{}{}", Uuid::new_v4(), extension));
        tokio::fs::write(&path, bytes).await?;
        Ok(TempUpload {
            path,
            removed: false,
        })
    }
}

/// Guard for one uploaded file. The file is deleted on [`TempUpload::remove`]
/// or, failing that, when the guard drops. Removal failure is logged and
/// never surfaced; the request's primary result must not change because a
/// temp file lingered.
pub struct TempUpload {
    path: PathBuf,
    removed: bool,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the uploaded bytes back as text. Invalid UTF-8 is decoded
    /// lossily rather than failing the request; only an IO error is fatal.
    pub async fn read_text(&self) -> std::io::Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Removes the file eagerly on the async runtime. Preferred over relying
    /// on drop, which has to fall back to blocking IO.
    pub async fn remove(mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!("Failed to remove uploaded temp file {:?}: {}", self.path, e);
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove uploaded temp file {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_writes_and_remove_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());

        let upload = area.store("app.py", b"def main():\n    pass\n").await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "py");
        assert_eq!(
            upload.read_text().await.unwrap(),
            "def main():\n    pass\n"
        );

        upload.remove().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn dropping_the_guard_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());

        let upload = area.store("code.js", b"function a() {}").await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());

        drop(upload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn concurrent_stores_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());

        let a = area.store("same.js", b"a").await.unwrap();
        let b = area.store("same.js", b"b").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.read_text().await.unwrap(), "a");
        assert_eq!(b.read_text().await.unwrap(), "b");

        a.remove().await;
        b.remove().await;
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());

        let upload = area
            .store("latin1.js", b"function caf\xe9() {}")
            .await
            .unwrap();
        let text = upload.read_text().await.unwrap();
        assert_eq!(text, "function caf\u{fffd}() {}");
        upload.remove().await;
    }

    #[tokio::test]
    async fn extensionless_names_are_stored_bare() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());

        let upload = area.store("Makefile", b"all:\n").await.unwrap();
        assert!(upload.path().extension().is_none());
        upload.remove().await;
    }
}
