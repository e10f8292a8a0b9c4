//! Video frame decoding.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encode::decode_image;
use crate::error::{MediaError, MediaResult};
use crate::probe::count_frames;

/// Source of decoded frames for a video file.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Total number of frames in the video. Zero means no usable content.
    async fn frame_count(&self, video: &Path) -> MediaResult<u64>;

    /// Decode the frame at `index`. `Ok(None)` when no frame exists there.
    async fn decode_frame(&self, video: &Path, index: u64) -> MediaResult<Option<DynamicImage>>;
}

/// Decoder backed by the ffmpeg and ffprobe command-line tools.
#[derive(Debug, Default, Clone)]
pub struct FfmpegDecoder {
    runner: FfmpegRunner,
}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill ffprobe and ffmpeg invocations that run longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.runner.timeout_secs()
    }

    /// Build the command that writes the frame at `index` to stdout as PNG.
    pub fn frame_command(video: &Path, index: u64) -> FfmpegCommand {
        FfmpegCommand::to_pipe(video)
            .select_frame(index)
            .format("image2pipe")
            .video_codec("png")
    }
}

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    async fn frame_count(&self, video: &Path) -> MediaResult<u64> {
        match self.runner.timeout_secs() {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), count_frames(video))
                .await
                .map_err(|_| MediaError::Timeout(secs))?,
            None => count_frames(video).await,
        }
    }

    async fn decode_frame(&self, video: &Path, index: u64) -> MediaResult<Option<DynamicImage>> {
        let cmd = Self::frame_command(video, index);
        let bytes = self.runner.run_capture(&cmd).await?;

        if bytes.is_empty() {
            debug!(index, "FFmpeg produced no frame");
            return Ok(None);
        }

        let frame = tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| MediaError::internal(format!("Frame decode task failed: {}", e)))??;

        Ok(Some(frame))
    }
}
