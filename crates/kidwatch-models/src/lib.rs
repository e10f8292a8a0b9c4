//! Shared data models for the kidwatch analysis service.
//!
//! This crate provides Serde-serializable types for:
//! - Sampled frames and frame sets
//! - Multimodal analysis requests and results
//! - The HTTP response envelope

pub mod analysis;
pub mod frame;
pub mod prompt;
pub mod response;

// Re-export common types
pub use analysis::{AnalysisRequest, AnalysisResult, ContentPart, Message, Role};
pub use frame::{FrameRef, FrameSet};
pub use prompt::{
    DEFAULT_FRAME_COUNT, DEFAULT_JPEG_QUALITY, DEFAULT_MODEL, EXTRACTION_FAILED_MESSAGE,
    SAFETY_INSTRUCTION,
};
pub use response::{AnalyzeResponse, ErrorKind, ResponseStatus};
