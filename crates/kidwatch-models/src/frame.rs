//! Extracted frame models.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Reference to one compressed still image extracted from a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    /// Frame index in the source video
    pub index: u64,
    /// Local path of the encoded JPEG
    pub path: PathBuf,
}

impl FrameRef {
    pub fn new(index: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the frame location as a `file://` URI.
    ///
    /// Relative paths are resolved against the current directory first.
    pub fn uri(&self) -> String {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&self.path))
                .unwrap_or_else(|_| self.path.clone())
        };

        Url::from_file_path(&absolute)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("file://{}", absolute.display()))
    }
}

/// Ordered set of frames sampled from one video.
///
/// Frames appear in the order they were sampled from the source. Duplicate
/// indices are kept as-is. An empty set means no usable video content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSet {
    /// Sampled frames in source order
    pub frames: Vec<FrameRef>,
    /// Total frame count reported by the source
    pub total_frames: u64,
    /// Target indices that could not be decoded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<u64>,
}

impl FrameSet {
    /// Empty set for a video with no decodable content.
    pub fn empty(total_frames: u64) -> Self {
        Self {
            frames: Vec::new(),
            total_frames,
            skipped: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameRef> {
        self.frames.iter()
    }

    /// Source indices of the sampled frames, in order.
    pub fn indices(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.index).collect()
    }
}

impl FromIterator<FrameRef> for FrameSet {
    fn from_iter<I: IntoIterator<Item = FrameRef>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
            total_frames: 0,
            skipped: Vec::new(),
        }
    }
}
