//! HTTP response envelope for analysis requests.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::prompt::{model_error_message, EXTRACTION_FAILED_MESSAGE};

/// Top-level status of an analysis response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Failure category carried by error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The video yielded no usable frames
    ExtractionEmpty,
    /// The model endpoint returned a non-success status
    ModelError,
    /// Any other fault while handling the request
    UnexpectedFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ExtractionEmpty => "extraction_empty",
            ErrorKind::ModelError => "model_error",
            ErrorKind::UnexpectedFailure => "unexpected_failure",
        }
    }
}

/// JSON body returned by `POST /upload_and_analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub result: String,
}

impl AnalyzeResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            kind: None,
            result: text.into(),
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            kind: Some(kind),
            result: message.into(),
        }
    }

    pub fn extraction_empty() -> Self {
        Self::error(ErrorKind::ExtractionEmpty, EXTRACTION_FAILED_MESSAGE)
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

impl From<AnalysisResult> for AnalyzeResponse {
    fn from(result: AnalysisResult) -> Self {
        match result {
            AnalysisResult::Success { text } => Self::success(text),
            AnalysisResult::Error { message } => {
                Self::error(ErrorKind::ModelError, model_error_message(&message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_body_has_no_kind() {
        let body = serde_json::to_value(AnalyzeResponse::from(AnalysisResult::success(
            "安全，无危险行为",
        )))
        .unwrap();
        assert_eq!(body, json!({"status": "success", "result": "安全，无危险行为"}));
    }

    #[test]
    fn test_model_error_is_templated() {
        let body = serde_json::to_value(AnalyzeResponse::from(AnalysisResult::error(
            "rate limited",
        )))
        .unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "model_error");
        assert_eq!(body["result"], "API 错误: rate limited");
    }

    #[test]
    fn test_extraction_empty_includes_status() {
        let body = serde_json::to_value(AnalyzeResponse::extraction_empty()).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], ErrorKind::ExtractionEmpty.as_str());
        assert_eq!(body["result"], EXTRACTION_FAILED_MESSAGE);
    }
}
