//! API error types.
//!
//! Every failure of the analysis endpoint ends up here and is rendered as the
//! JSON envelope with HTTP 200. The envelope's `kind` carries the category.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use kidwatch_media::MediaError;
use kidwatch_ml_client::ClientError;
use kidwatch_models::{AnalyzeResponse, ErrorKind};

pub type AnalyzeResult<T> = Result<T, AnalyzeError>;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("No usable frames extracted from video")]
    ExtractionEmpty,

    #[error("Invalid upload: {0}")]
    Upload(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Model client error: {0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzeError {
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzeError::ExtractionEmpty => ErrorKind::ExtractionEmpty,
            _ => ErrorKind::UnexpectedFailure,
        }
    }

    /// Envelope body for this error.
    pub fn to_envelope(&self) -> AnalyzeResponse {
        match self {
            AnalyzeError::ExtractionEmpty => AnalyzeResponse::extraction_empty(),
            other => AnalyzeResponse::error(other.kind(), other.to_string()),
        }
    }
}

impl From<MultipartError> for AnalyzeError {
    fn from(e: MultipartError) -> Self {
        Self::Upload(e.body_text())
    }
}

impl From<MultipartRejection> for AnalyzeError {
    fn from(e: MultipartRejection) -> Self {
        Self::Upload(e.body_text())
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.to_envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kidwatch_models::{ResponseStatus, EXTRACTION_FAILED_MESSAGE};

    #[test]
    fn test_extraction_empty_envelope() {
        let body = AnalyzeError::ExtractionEmpty.to_envelope();
        assert_eq!(body.status, ResponseStatus::Error);
        assert_eq!(body.kind, Some(ErrorKind::ExtractionEmpty));
        assert_eq!(body.result, EXTRACTION_FAILED_MESSAGE);
    }

    #[test]
    fn test_unexpected_failures_are_stringified() {
        let err: AnalyzeError = MediaError::FfprobeNotFound.into();
        let body = err.to_envelope();
        assert_eq!(body.kind, Some(ErrorKind::UnexpectedFailure));
        assert_eq!(body.result, "Media error: FFprobe not found in PATH");

        let err: AnalyzeError = ClientError::malformed("Response has no choices").into();
        assert_eq!(err.kind(), ErrorKind::UnexpectedFailure);
        assert!(err.to_envelope().result.contains("Response has no choices"));
    }

    #[test]
    fn test_responds_with_ok_status() {
        let response = AnalyzeError::upload("missing file field").into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
