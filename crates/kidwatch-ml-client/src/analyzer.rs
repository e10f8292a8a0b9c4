//! Child-safety analysis over sampled frames.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{info, warn};

use kidwatch_models::{AnalysisRequest, AnalysisResult, FrameSet};

use crate::error::{ClientError, ClientResult};
use crate::model::{ModelReply, MultimodalModel};

/// Sends sampled frames to a vision-language model and maps the reply to an
/// [`AnalysisResult`].
#[derive(Clone)]
pub struct SafetyAnalyzer {
    model: Arc<dyn MultimodalModel>,
}

impl SafetyAnalyzer {
    pub fn new(model: Arc<dyn MultimodalModel>) -> Self {
        Self { model }
    }

    /// Analyze `frames` with `instruction`.
    ///
    /// Returns `Ok(Success)` with the model's text verbatim, or `Ok(Error)`
    /// with the provider message when the endpoint rejects the call.
    /// Transport faults and unexpected response shapes are returned as `Err`.
    /// Callers are expected to skip empty frame sets; this returns
    /// [`ClientError::NoFrames`] without calling the model.
    pub async fn analyze(
        &self,
        frames: &FrameSet,
        instruction: &str,
    ) -> ClientResult<AnalysisResult> {
        if frames.is_empty() {
            return Err(ClientError::NoFrames);
        }

        let request = AnalysisRequest::from_frames(frames, instruction);

        info!(
            model = %self.model.model(),
            frames = frames.len(),
            "Requesting model analysis"
        );

        let start = Instant::now();
        let reply = self.model.call(&request).await;
        histogram!("kidwatch_model_call_duration_seconds").record(start.elapsed().as_secs_f64());

        match reply? {
            ModelReply::Completed { choices, .. } => {
                let text = choices
                    .first()
                    .ok_or_else(|| ClientError::malformed("Response has no choices"))?
                    .first_text()
                    .ok_or_else(|| ClientError::malformed("First choice has no text content"))?;

                info!(chars = text.chars().count(), "Model analysis complete");
                Ok(AnalysisResult::success(text))
            }
            ModelReply::Failed {
                status,
                code,
                message,
            } => {
                warn!(
                    status,
                    code = code.as_deref().unwrap_or(""),
                    message = %message,
                    "Model rejected analysis request"
                );
                Ok(AnalysisResult::error(message))
            }
        }
    }
}
