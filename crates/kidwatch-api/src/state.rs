//! Application state.

use std::sync::Arc;

use kidwatch_media::{FrameSampler, SamplerConfig};
use kidwatch_ml_client::{ClientResult, DashScopeClient, DashScopeConfig, SafetyAnalyzer};

use crate::config::ApiConfig;
use crate::services::AnalysisPipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<AnalysisPipeline>,
    /// Whether a model credential is configured
    pub model_configured: bool,
}

impl AppState {
    /// Create state backed by ffmpeg and DashScope.
    pub fn new(
        config: ApiConfig,
        sampler_config: SamplerConfig,
        model_config: DashScopeConfig,
    ) -> ClientResult<Self> {
        let model_configured = model_config.has_api_key();
        let client = DashScopeClient::new(model_config)?;

        let pipeline = AnalysisPipeline::new(
            FrameSampler::ffmpeg(sampler_config),
            SafetyAnalyzer::new(Arc::new(client)),
            config.scratch_dir.clone(),
        );

        Ok(Self::with_pipeline(config, pipeline, model_configured))
    }

    /// Create state around an existing pipeline.
    pub fn with_pipeline(
        config: ApiConfig,
        pipeline: AnalysisPipeline,
        model_configured: bool,
    ) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            model_configured,
        }
    }
}
