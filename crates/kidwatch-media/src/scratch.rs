//! Per-request scratch namespace.
//!
//! Every request gets its own directory for the uploaded video and the frames
//! extracted from it. The directory and everything in it is removed when the
//! [`ScratchDir`] is dropped, on success and error paths alike.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

const SCRATCH_PREFIX: &str = "kidwatch-";

/// Request-scoped temporary directory.
#[derive(Debug)]
pub struct ScratchDir {
    id: Uuid,
    dir: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory under `root`, creating `root` if needed.
    pub fn new_in(root: impl AsRef<Path>) -> MediaResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;

        let id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", SCRATCH_PREFIX, id.simple()))
            .tempdir_in(root)?;

        debug!(scratch_id = %id, path = %dir.path().display(), "Created scratch dir");

        Ok(Self { id, dir })
    }

    /// Create a scratch directory under `root` on the blocking pool.
    pub async fn create_in(root: impl Into<PathBuf>) -> MediaResult<Self> {
        let root = root.into();
        tokio::task::spawn_blocking(move || Self::new_in(root))
            .await
            .map_err(|e| MediaError::internal(format!("Scratch dir task failed: {}", e)))?
    }

    /// Unique token of this scratch namespace.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of an artifact inside the scratch dir.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Path for the uploaded video, keeping a sane extension from the
    /// client-provided filename.
    pub fn video_path(&self, original_name: Option<&str>) -> PathBuf {
        let ext = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "webm".to_string());

        self.join(format!("upload.{}", ext))
    }

    /// Path for the JPEG of the frame at `position` in the sample, taken
    /// from source index `index`.
    pub fn frame_path(&self, position: usize, index: u64) -> PathBuf {
        self.join(format!("frame_{:02}_{}.jpg", position, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(root.path()).unwrap();
        let path = scratch.path().to_path_buf();

        std::fs::write(scratch.join("upload.webm"), b"data").unwrap();
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_namespaces_are_distinct() {
        let root = TempDir::new().unwrap();
        let a = ScratchDir::new_in(root.path()).unwrap();
        let b = ScratchDir::new_in(root.path()).unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.frame_path(0, 0), b.frame_path(0, 0));
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SCRATCH_PREFIX));
    }

    #[test]
    fn test_video_extension() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(root.path()).unwrap();

        assert!(scratch.video_path(Some("clip.MP4")).ends_with("upload.mp4"));
        assert!(scratch.video_path(Some("recording")).ends_with("upload.webm"));
        assert!(scratch.video_path(Some("../../etc/passwd")).ends_with("upload.webm"));
        assert!(scratch.video_path(Some("x.we/bm")).ends_with("upload.webm"));
        assert!(scratch.video_path(None).ends_with("upload.webm"));
    }

    #[test]
    fn test_frame_paths_unique_for_duplicate_indices() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(root.path()).unwrap();

        assert_ne!(scratch.frame_path(0, 0), scratch.frame_path(2, 0));
        assert!(scratch.frame_path(1, 50).ends_with("frame_01_50.jpg"));
    }

    #[test]
    fn test_creates_missing_root() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");
        let scratch = ScratchDir::new_in(&nested).unwrap();
        assert!(scratch.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_create_in_from_async_context() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("scratch");

        let scratch = ScratchDir::create_in(&nested).await.unwrap();
        assert!(scratch.path().is_dir());
        assert!(scratch.path().starts_with(&nested));

        let path = scratch.path().to_path_buf();
        drop(scratch);
        assert!(!path.exists());
    }
}
