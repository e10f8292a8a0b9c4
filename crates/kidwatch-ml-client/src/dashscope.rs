//! DashScope multimodal generation client.
//!
//! Speaks the `multimodal-generation` HTTP API used by the Qwen-VL family.
//! Local `file://` image references are inlined as base64 data URIs before
//! sending, since the remote side cannot read this host's filesystem.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use kidwatch_models::{AnalysisRequest, ContentPart, Message, DEFAULT_MODEL};

use crate::error::{ClientError, ClientResult};
use crate::model::{ModelChoice, ModelReply, MultimodalModel};

/// Default DashScope endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";

const GENERATION_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";

/// DashScope client configuration.
#[derive(Clone)]
pub struct DashScopeConfig {
    /// API credential; analysis is refused without it
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Endpoint base URL
    pub base_url: String,
    /// Request timeout (transport default when unset)
    pub timeout: Option<Duration>,
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl fmt::Debug for DashScopeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashScopeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DashScopeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("DASHSCOPE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("DASHSCOPE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("DASHSCOPE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: std::env::var("DASHSCOPE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), GENERATION_PATH)
    }
}

/// Generation request body.
#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput,
}

#[derive(Debug, Serialize)]
struct GenerationInput {
    messages: Vec<Message>,
}

/// Generation response body.
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    output: Option<GenerationOutput>,
    request_id: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    image: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

/// DashScope API client.
pub struct DashScopeClient {
    config: DashScopeConfig,
    client: Client,
}

impl DashScopeClient {
    /// Create a new client.
    pub fn new(config: DashScopeConfig) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            config,
            client: builder.build()?,
        })
    }

    fn api_key(&self) -> ClientResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ClientError::config("DASHSCOPE_API_KEY not configured"))
    }
}

#[async_trait]
impl MultimodalModel for DashScopeClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn call(&self, request: &AnalysisRequest) -> ClientResult<ModelReply> {
        let api_key = self.api_key()?;

        let mut messages = Vec::with_capacity(request.messages().len());
        for message in request.messages() {
            messages.push(inline_local_images(message).await?);
        }

        let body = GenerationRequest {
            model: &self.config.model,
            input: GenerationInput { messages },
        };

        debug!(
            model = %self.config.model,
            images = request.image_count(),
            "Sending DashScope generation request"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let reply = failed_reply(status.as_u16(), &text);
            if let ModelReply::Failed { code, message, .. } = &reply {
                warn!(
                    status = status.as_u16(),
                    code = code.as_deref().unwrap_or(""),
                    message = %message,
                    "DashScope returned an error"
                );
            }
            return Ok(reply);
        }

        let parsed: GenerationResponse = serde_json::from_str(&text)
            .map_err(|e| ClientError::malformed(format!("Failed to parse response: {}", e)))?;

        let Some(output) = parsed.output else {
            // Some gateway errors come back as 200 with only code/message set
            if let Some(message) = parsed.message {
                return Ok(ModelReply::Failed {
                    status: status.as_u16(),
                    code: parsed.code,
                    message,
                });
            }
            return Err(ClientError::malformed("Response has no output"));
        };

        let choices = output
            .choices
            .into_iter()
            .map(|c| ModelChoice {
                content: c
                    .message
                    .content
                    .into_iter()
                    .filter_map(|p| match (p.text, p.image) {
                        (Some(text), _) => Some(ContentPart::text(text)),
                        (None, Some(image)) => Some(ContentPart::image(image)),
                        (None, None) => None,
                    })
                    .collect(),
            })
            .collect();

        info!(
            request_id = parsed.request_id.as_deref().unwrap_or(""),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "DashScope generation complete"
        );

        Ok(ModelReply::Completed {
            choices,
            request_id: parsed.request_id,
        })
    }
}

/// Build the reply for a non-2xx response.
fn failed_reply(status: u16, body: &str) -> ModelReply {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => {
            if let Some(request_id) = &err.request_id {
                debug!(request_id = %request_id, "DashScope error request id");
            }
            ModelReply::Failed {
                status,
                message: err
                    .message
                    .or_else(|| err.code.clone())
                    .unwrap_or_else(|| format!("HTTP {}", status)),
                code: err.code,
            }
        }
        Err(_) => {
            let body = body.trim();
            ModelReply::Failed {
                status,
                code: None,
                message: if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.to_string()
                },
            }
        }
    }
}

/// Replace `file://` image parts with base64 data URIs.
async fn inline_local_images(message: &Message) -> ClientResult<Message> {
    let mut content = Vec::with_capacity(message.content.len());

    for part in &message.content {
        match part {
            ContentPart::Image { image } if image.starts_with("file://") => {
                content.push(ContentPart::image(file_uri_to_data_uri(image).await?));
            }
            other => content.push(other.clone()),
        }
    }

    Ok(Message {
        role: message.role,
        content,
    })
}

async fn file_uri_to_data_uri(uri: &str) -> ClientResult<String> {
    let path = Url::parse(uri)
        .map_err(|e| ClientError::invalid_uri(format!("{}: {}", uri, e)))?
        .to_file_path()
        .map_err(|_| ClientError::invalid_uri(uri.to_string()))?;

    let bytes = tokio::fs::read(&path).await?;

    Ok(format!(
        "data:{};base64,{}",
        mime_for(&path),
        STANDARD.encode(bytes)
    ))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kidwatch_models::{FrameRef, FrameSet};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> DashScopeConfig {
        DashScopeConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            ..DashScopeConfig::default()
        }
    }

    fn frames_in(dir: &TempDir, n: usize) -> FrameSet {
        (0..n)
            .map(|i| {
                let p = dir.path().join(format!("frame_{:02}_{}.jpg", i, i));
                std::fs::write(&p, [0xFF, 0xD8, 0xFF, i as u8]).unwrap();
                FrameRef::new(i as u64, p)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_success_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATION_PATH))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": {"choices": [{
                    "finish_reason": "stop",
                    "message": {"role": "assistant", "content": [{"text": "安全，无危险行为"}]}
                }]},
                "usage": {"input_tokens": 1200, "output_tokens": 12},
                "request_id": "req-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let request = AnalysisRequest::from_frames(&frames_in(&dir, 2), "判断");
        let client = DashScopeClient::new(config(&server)).unwrap();

        let reply = client.call(&request).await.unwrap();
        match reply {
            ModelReply::Completed { choices, request_id } => {
                assert_eq!(request_id.as_deref(), Some("req-1"));
                assert_eq!(choices[0].first_text(), Some("安全，无危险行为"));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_body_inlines_frames() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": {"choices": [{"message": {"content": [{"text": "ok"}]}}]}
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let request = AnalysisRequest::from_frames(&frames_in(&dir, 3), "instruction");
        let client = DashScopeClient::new(config(&server)).unwrap();
        client.call(&request).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();

        assert_eq!(body["model"], DEFAULT_MODEL);
        let message = &body["input"]["messages"][0];
        assert_eq!(message["role"], "user");

        let content = message["content"].as_array().unwrap();
        assert_eq!(content.len(), 4);
        for part in &content[..3] {
            assert!(part["image"]
                .as_str()
                .unwrap()
                .starts_with("data:image/jpeg;base64,"));
        }
        assert_eq!(content[3]["text"], "instruction");
    }

    #[tokio::test]
    async fn test_error_status_maps_to_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "code": "Throttling.RateQuota",
                "message": "rate limited",
                "request_id": "req-2"
            })))
            .mount(&server)
            .await;

        let client = DashScopeClient::new(config(&server)).unwrap();
        let request = AnalysisRequest::from_frames(&FrameSet::default(), "x");

        let reply = client.call(&request).await.unwrap();
        assert_eq!(
            reply,
            ModelReply::Failed {
                status: 429,
                code: Some("Throttling.RateQuota".to_string()),
                message: "rate limited".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_plain_text_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = DashScopeClient::new(config(&server)).unwrap();
        let request = AnalysisRequest::from_frames(&FrameSet::default(), "x");

        let reply = client.call(&request).await.unwrap();
        assert_eq!(reply, ModelReply::failed(502, "Bad Gateway"));
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = DashScopeClient::new(config(&server)).unwrap();
        let request = AnalysisRequest::from_frames(&FrameSet::default(), "x");

        let result = client.call(&request).await;
        assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = DashScopeClient::new(DashScopeConfig::default()).unwrap();
        let request = AnalysisRequest::from_frames(&FrameSet::default(), "x");

        let result = client.call(&request).await;
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_remote_uris_pass_through() {
        let message = Message {
            role: kidwatch_models::Role::User,
            content: vec![ContentPart::image("https://example.com/a.jpg")],
        };
        let inlined = inline_local_images(&message).await.unwrap();
        assert_eq!(inlined, message);
    }

    #[tokio::test]
    async fn test_missing_frame_file_is_io_error() {
        let message = Message {
            role: kidwatch_models::Role::User,
            content: vec![ContentPart::image("file:///nonexistent/kidwatch/frame.jpg")],
        };
        let result = inline_local_images(&message).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = DashScopeConfig {
            api_key: Some("sk-secret".to_string()),
            ..DashScopeConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = DashScopeConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..DashScopeConfig::default()
        };
        assert_eq!(
            config.endpoint(),
            format!("http://localhost:9000{}", GENERATION_PATH)
        );
    }
}
