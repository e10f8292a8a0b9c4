//! Representative frame sampling.
//!
//! Picks the first, middle and near-last frames of a video, re-encodes each
//! as a compressed JPEG inside the request's scratch dir, and returns them as
//! an ordered [`FrameSet`].

use std::path::Path;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use kidwatch_models::prompt::TAIL_FRAME_OFFSET;
use kidwatch_models::{FrameRef, FrameSet, DEFAULT_FRAME_COUNT, DEFAULT_JPEG_QUALITY};

use crate::decoder::{FfmpegDecoder, FrameDecoder};
use crate::encode::encode_jpeg;
use crate::error::{MediaError, MediaResult};
use crate::scratch::ScratchDir;

/// Default limit on a single ffprobe or ffmpeg invocation.
pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 60;

/// Frame sampler configuration.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Number of frames to sample (at most 3 positions exist)
    pub frame_count: usize,
    /// JPEG quality factor (1-100)
    pub jpeg_quality: u8,
    /// Per-invocation limit for ffprobe/ffmpeg; `None` waits forever
    pub ffmpeg_timeout_secs: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            ffmpeg_timeout_secs: Some(DEFAULT_FFMPEG_TIMEOUT_SECS),
        }
    }
}

impl SamplerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            frame_count: std::env::var("FRAME_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FRAME_COUNT),
            jpeg_quality: std::env::var("JPEG_QUALITY")
                .map(|s| parse_quality(&s))
                .unwrap_or(DEFAULT_JPEG_QUALITY),
            ffmpeg_timeout_secs: std::env::var("FFMPEG_TIMEOUT_SECS")
                .map(|s| parse_timeout(&s))
                .unwrap_or(Some(DEFAULT_FFMPEG_TIMEOUT_SECS)),
        }
    }
}

/// Parse a JPEG quality setting, clamping large values to 100.
fn parse_quality(value: &str) -> u8 {
    match value.trim().parse::<u32>() {
        Ok(q) => q.min(100) as u8,
        Err(_) => {
            warn!(value, default = DEFAULT_JPEG_QUALITY, "Ignoring invalid JPEG_QUALITY");
            DEFAULT_JPEG_QUALITY
        }
    }
}

/// Parse a timeout setting; `0` disables the limit.
fn parse_timeout(value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(0) => None,
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!(
                value,
                default = DEFAULT_FFMPEG_TIMEOUT_SECS,
                "Ignoring invalid FFMPEG_TIMEOUT_SECS"
            );
            Some(DEFAULT_FFMPEG_TIMEOUT_SECS)
        }
    }
}

/// Source indices to sample for a video of `total` frames.
///
/// The positions are fixed: first frame, middle frame, and the frame
/// `TAIL_FRAME_OFFSET` before the end (clamped to 0). `frame_count` truncates
/// that list. Duplicates are kept.
pub fn sample_indices(total: u64, frame_count: usize) -> Vec<u64> {
    if total == 0 {
        return Vec::new();
    }

    [0, total / 2, total.saturating_sub(TAIL_FRAME_OFFSET)]
        .into_iter()
        .take(frame_count)
        .collect()
}

/// Extracts representative frames from a video file.
#[derive(Clone)]
pub struct FrameSampler {
    decoder: Arc<dyn FrameDecoder>,
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn FrameDecoder>, config: SamplerConfig) -> Self {
        Self { decoder, config }
    }

    /// Sampler backed by the ffmpeg CLI.
    pub fn ffmpeg(config: SamplerConfig) -> Self {
        let decoder = match config.ffmpeg_timeout_secs {
            Some(secs) => FfmpegDecoder::new().with_timeout(secs),
            None => FfmpegDecoder::new(),
        };
        Self::new(Arc::new(decoder), config)
    }

    /// Sample frames from `video`, writing JPEGs into `scratch`.
    ///
    /// An unreadable or empty video yields an empty set rather than an
    /// error. Indices that fail to decode are skipped and listed in
    /// [`FrameSet::skipped`]. Only missing tooling and local I/O failures are
    /// returned as errors.
    pub async fn sample(&self, video: &Path, scratch: &ScratchDir) -> MediaResult<FrameSet> {
        let total = match self.decoder.frame_count(video).await {
            Ok(total) => total,
            Err(e) if e.is_environment_fault() => return Err(e),
            Err(e) => {
                warn!(video = %video.display(), error = %e, "Video could not be read");
                return Ok(FrameSet::empty(0));
            }
        };

        if total == 0 {
            info!(video = %video.display(), "Video reports zero frames");
            return Ok(FrameSet::empty(0));
        }

        let indices = sample_indices(total, self.config.frame_count);
        debug!(total, ?indices, "Sampling frames");

        let mut set = FrameSet::empty(total);

        for (position, index) in indices.into_iter().enumerate() {
            let frame = match self.decoder.decode_frame(video, index).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!(index, total, "No frame decoded at index, skipping");
                    set.skipped.push(index);
                    continue;
                }
                Err(e) if e.is_environment_fault() => return Err(e),
                Err(e) => {
                    warn!(index, total, error = %e, "Frame decode failed, skipping");
                    set.skipped.push(index);
                    continue;
                }
            };

            let quality = self.config.jpeg_quality;
            let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&frame, quality))
                .await
                .map_err(|e| MediaError::internal(format!("JPEG encode task failed: {}", e)))??;

            let path = scratch.frame_path(position, index);
            tokio::fs::write(&path, &jpeg).await?;

            debug!(index, bytes = jpeg.len(), path = %path.display(), "Frame written");
            set.frames.push(FrameRef::new(index, path));
        }

        counter!("kidwatch_frames_sampled_total").increment(set.len() as u64);
        if !set.skipped.is_empty() {
            counter!("kidwatch_frames_skipped_total").increment(set.skipped.len() as u64);
        }

        info!(
            total,
            sampled = set.len(),
            skipped = set.skipped.len(),
            "Frame sampling complete"
        );

        Ok(set)
    }
}
