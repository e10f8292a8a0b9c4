//! Axum HTTP API server for the child-safety video analysis service.
//!
//! This crate provides:
//! - The `/upload_and_analyze` multipart endpoint
//! - Liveness and readiness probes
//! - Request id, security header and logging middleware
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, TlsConfig};
pub use error::{AnalyzeError, AnalyzeResult};
pub use routes::create_router;
pub use services::{AnalysisPipeline, VideoUpload};
pub use state::AppState;
