//! Fixed prompt text and sampling defaults.

/// Instruction appended after the frames of every analysis request.
pub const SAFETY_INSTRUCTION: &str = "这是视频中的三个关键画面。请分析视频中孩子的行为。是否发生跌倒、碰撞等危险？请输出【安全】或【危险】，并简述原因。";

/// Result text returned when no frame could be extracted.
pub const EXTRACTION_FAILED_MESSAGE: &str = "视频解析失败，未提取到画面";

/// Prefix for errors reported by the model endpoint.
pub const MODEL_ERROR_PREFIX: &str = "API 错误";

/// Default vision-language model identifier.
pub const DEFAULT_MODEL: &str = "qwen-vl-max";

/// Default number of frames sampled per video.
pub const DEFAULT_FRAME_COUNT: usize = 3;

/// Default JPEG quality (0-100) for sampled frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 50;

/// Offset from the end of the video for the last sampled frame.
pub const TAIL_FRAME_OFFSET: u64 = 5;

/// Format a model-side error message for the response envelope.
pub fn model_error_message(provider_message: &str) -> String {
    format!("{}: {}", MODEL_ERROR_PREFIX, provider_message)
}
