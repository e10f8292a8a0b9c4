//! Video upload and analysis handler.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use tracing::{error, info, info_span, warn, Instrument};

use kidwatch_models::{AnalysisResult, AnalyzeResponse};

use crate::error::{AnalyzeError, AnalyzeResult};
use crate::metrics;
use crate::middleware::RequestId;
use crate::services::VideoUpload;
use crate::state::AppState;

/// Multipart field carrying the video.
pub const UPLOAD_FIELD: &str = "file";

/// POST /upload_and_analyze
///
/// Accepts a multipart upload with one video file, samples representative
/// frames and returns the model's safety verdict. Every outcome, including
/// failures, is returned as the JSON envelope.
pub async fn upload_and_analyze(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AnalyzeResult<Json<AnalyzeResponse>> {
    let request_id = request_id
        .map(|Extension(id)| id.0)
        .unwrap_or_default();
    let span = info_span!("upload_and_analyze", request_id = %request_id);

    let outcome = async {
        let upload = read_upload(multipart?).await?;
        info!(
            filename = upload.filename.as_deref().unwrap_or(""),
            bytes = upload.data.len(),
            "Received video, processing"
        );
        state.pipeline.run(upload).await
    }
    .instrument(span.clone())
    .await;

    span.in_scope(|| match outcome {
        Ok(result) => {
            match &result {
                AnalysisResult::Success { text } => {
                    info!(result = %text, "Analysis complete");
                    metrics::record_analysis("success");
                }
                AnalysisResult::Error { message } => {
                    warn!(message = %message, "Model reported an error");
                    metrics::record_analysis("model_error");
                }
            }
            Ok(Json(AnalyzeResponse::from(result)))
        }
        Err(e) => {
            match &e {
                AnalyzeError::ExtractionEmpty => warn!("No frames extracted from upload"),
                other => error!(error = %other, "Analysis request failed"),
            }
            metrics::record_analysis(e.kind().as_str());
            Err(e)
        }
    })
}

/// Pull the video out of the multipart body.
///
/// Takes the field named `file`, or failing that the first field that
/// carries a filename.
async fn read_upload(mut multipart: Multipart) -> AnalyzeResult<VideoUpload> {
    while let Some(field) = multipart.next_field().await? {
        let is_upload = field.name() == Some(UPLOAD_FIELD) || field.file_name().is_some();
        if !is_upload {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await?;

        return Ok(VideoUpload { filename, data });
    }

    Err(AnalyzeError::upload(format!(
        "multipart body has no '{}' file field",
        UPLOAD_FIELD
    )))
}
