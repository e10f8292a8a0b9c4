//! Upload-to-verdict pipeline.

use std::path::PathBuf;

use axum::body::Bytes;
use tracing::{debug, info};

use kidwatch_media::{FrameSampler, ScratchDir};
use kidwatch_ml_client::SafetyAnalyzer;
use kidwatch_models::{AnalysisResult, SAFETY_INSTRUCTION};

use crate::error::{AnalyzeError, AnalyzeResult};

/// Uploaded video as received from the client.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    /// Client-provided filename
    pub filename: Option<String>,
    /// Raw container bytes
    pub data: Bytes,
}

/// Stores an upload, samples frames from it and asks the model for a
/// verdict. One call per request; stages run strictly in sequence.
#[derive(Clone)]
pub struct AnalysisPipeline {
    sampler: FrameSampler,
    analyzer: SafetyAnalyzer,
    scratch_root: PathBuf,
}

impl AnalysisPipeline {
    pub fn new(sampler: FrameSampler, analyzer: SafetyAnalyzer, scratch_root: PathBuf) -> Self {
        Self {
            sampler,
            analyzer,
            scratch_root,
        }
    }

    /// Run the pipeline for one upload.
    ///
    /// All temporary files live in a scratch dir owned by this call and are
    /// removed before it returns, whatever the outcome.
    pub async fn run(&self, upload: VideoUpload) -> AnalyzeResult<AnalysisResult> {
        // Nothing to decode
        if upload.data.is_empty() {
            return Err(AnalyzeError::ExtractionEmpty);
        }

        let scratch = ScratchDir::create_in(&self.scratch_root).await?;
        let video_path = scratch.video_path(upload.filename.as_deref());

        tokio::fs::write(&video_path, &upload.data).await?;
        debug!(
            scratch_id = %scratch.id(),
            bytes = upload.data.len(),
            path = %video_path.display(),
            "Stored upload"
        );

        let frames = self.sampler.sample(&video_path, &scratch).await?;
        if frames.is_empty() {
            return Err(AnalyzeError::ExtractionEmpty);
        }

        info!(
            scratch_id = %scratch.id(),
            frames = frames.len(),
            skipped = frames.skipped.len(),
            "Frames extracted, requesting analysis"
        );

        let result = self.analyzer.analyze(&frames, SAFETY_INSTRUCTION).await?;
        Ok(result)
    }
}
