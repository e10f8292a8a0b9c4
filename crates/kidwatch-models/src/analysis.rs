//! Multimodal analysis request and result models.

use serde::{Deserialize, Serialize};

use crate::frame::FrameSet;

/// Role of a message sent to the model. Requests are single user turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
}

/// One part of a multimodal message.
///
/// Serialized untagged, so parts render as `{"image": "..."}` or
/// `{"text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Image { image: String },
    Text { text: String },
}

impl ContentPart {
    pub fn image(uri: impl Into<String>) -> Self {
        Self::Image { image: uri.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            ContentPart::Image { .. } => None,
        }
    }

    pub fn as_image(&self) -> Option<&str> {
        match self {
            ContentPart::Image { image } => Some(image),
            ContentPart::Text { .. } => None,
        }
    }
}

/// A single conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

/// Request sent to the remote vision-language model.
///
/// Holds exactly one user message: one image part per frame in frame order,
/// followed by one trailing text instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    messages: Vec<Message>,
}

impl AnalysisRequest {
    /// Build the request from sampled frames and an instruction.
    pub fn from_frames(frames: &FrameSet, instruction: impl Into<String>) -> Self {
        let mut content: Vec<ContentPart> =
            frames.iter().map(|f| ContentPart::image(f.uri())).collect();
        content.push(ContentPart::text(instruction));

        Self {
            messages: vec![Message {
                role: Role::User,
                content,
            }],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Content parts of the single user message.
    pub fn parts(&self) -> &[ContentPart] {
        self.messages
            .first()
            .map(|m| m.content.as_slice())
            .unwrap_or_default()
    }

    pub fn image_count(&self) -> usize {
        self.parts().iter().filter(|p| p.as_image().is_some()).count()
    }
}

/// Outcome of one analysis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisResult {
    /// The model answered; text is passed through verbatim
    Success { text: String },
    /// The model endpoint reported a failure
    Error { message: String },
}

impl AnalysisResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameRef;

    fn frames(n: usize) -> FrameSet {
        (0..n)
            .map(|i| FrameRef::new(i as u64 * 10, format!("/scratch/frame_{:02}_{}.jpg", i, i * 10)))
            .collect()
    }

    #[test]
    fn test_request_layout_for_all_sizes() {
        for n in 0..=3 {
            let set = frames(n);
            let request = AnalysisRequest::from_frames(&set, "instruction");

            assert_eq!(request.messages().len(), 1);
            assert_eq!(request.messages()[0].role, Role::User);

            let parts = request.parts();
            assert_eq!(parts.len(), n + 1);
            assert_eq!(request.image_count(), n);

            for (part, frame) in parts.iter().zip(set.iter()) {
                assert_eq!(part.as_image(), Some(frame.uri().as_str()));
            }
            assert_eq!(parts[n].as_text(), Some("instruction"));
        }
    }

    #[test]
    fn test_parts_serialize_untagged() {
        let set = frames(1);
        let request = AnalysisRequest::from_frames(&set, "look");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(
            json["messages"][0]["content"][0]["image"],
            "file:///scratch/frame_00_0.jpg"
        );
        assert_eq!(json["messages"][0]["content"][1]["text"], "look");
    }

    #[test]
    fn test_content_part_roundtrip_shape() {
        let part: ContentPart = serde_json::from_str(r#"{"text":"安全"}"#).unwrap();
        assert_eq!(part.as_text(), Some("安全"));

        let part: ContentPart = serde_json::from_str(r#"{"image":"file:///a.jpg"}"#).unwrap();
        assert_eq!(part.as_image(), Some("file:///a.jpg"));
    }
}
