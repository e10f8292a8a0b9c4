//! Vision-language model client for child-safety analysis.
//!
//! This crate provides:
//! - The [`MultimodalModel`] contract for single-turn image+text calls
//! - A DashScope (Qwen-VL) HTTP implementation
//! - [`SafetyAnalyzer`], which turns sampled frames into an analysis result

pub mod analyzer;
pub mod dashscope;
pub mod error;
pub mod model;

pub use analyzer::SafetyAnalyzer;
pub use dashscope::{DashScopeClient, DashScopeConfig};
pub use error::{ClientError, ClientResult};
pub use model::{ModelChoice, ModelReply, MultimodalModel};
