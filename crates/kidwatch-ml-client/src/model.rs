//! Remote multimodal model contract.

use async_trait::async_trait;

use kidwatch_models::{AnalysisRequest, ContentPart};

use crate::error::ClientResult;

/// One response choice from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    /// Ordered content parts of the assistant message
    pub content: Vec<ContentPart>,
}

impl ModelChoice {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
        }
    }

    /// First text part of the message.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentPart::as_text)
    }
}

/// Transport-level outcome of a model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// The endpoint accepted the call and answered
    Completed {
        choices: Vec<ModelChoice>,
        request_id: Option<String>,
    },
    /// The endpoint rejected the call
    Failed {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl ModelReply {
    pub fn completed(choices: Vec<ModelChoice>) -> Self {
        Self::Completed {
            choices,
            request_id: None,
        }
    }

    pub fn failed(status: u16, message: impl Into<String>) -> Self {
        Self::Failed {
            status,
            code: None,
            message: message.into(),
        }
    }
}

/// A vision-language model reachable through a single synchronous call.
///
/// `Err` is reserved for faults below the transport status: network errors,
/// unreadable responses, local I/O.
#[async_trait]
pub trait MultimodalModel: Send + Sync {
    /// Model identifier sent with each call.
    fn model(&self) -> &str;

    /// Send one single-turn conversation.
    async fn call(&self, request: &AnalysisRequest) -> ClientResult<ModelReply>;
}
