//! FFmpeg-backed frame sampling for uploaded videos.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Frame counting via FFprobe
//! - Deterministic first/middle/near-last frame sampling
//! - JPEG re-encoding of sampled frames
//! - Request-scoped scratch directories with guaranteed cleanup

pub mod command;
pub mod decoder;
pub mod encode;
pub mod error;
pub mod probe;
pub mod sampler;
pub mod scratch;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use decoder::{FfmpegDecoder, FrameDecoder};
pub use encode::encode_jpeg;
pub use error::{MediaError, MediaResult};
pub use probe::count_frames;
pub use sampler::{sample_indices, FrameSampler, SamplerConfig};
pub use scratch::ScratchDir;
