//! Request and response bodies for the supported model APIs.

use serde::{Deserialize, Serialize};

// Gemini generateContent

#[derive(Debug, Serialize)]
pub(super) struct GeminiRequest<'a> {
    pub contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
pub(super) struct GeminiContent<'a> {
    pub role: &'static str,
    pub parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct GeminiPart<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct GeminiGenerationConfig {
    pub temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiResponse {
    pub candidates: Option<Vec<GeminiCandidate>>,
    pub error: Option<ApiErrorBody>,
    #[serde(rename = "promptFeedback")]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiCandidate {
    pub content: Option<GeminiResponseContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiResponseContent {
    #[serde(default)]
    pub parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    pub block_reason: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn into_text(self) -> Option<String> {
        let candidate = self.candidates?.into_iter().next()?;
        let parts = candidate.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

// OpenAI-compatible chat completions

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponseMessage {
    pub content: Option<String>,
}

// Ollama generate

#[derive(Debug, Serialize)]
pub(super) struct OllamaRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Serialize)]
pub(super) struct OllamaOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct OllamaResponse {
    pub response: String,
}

/// Error object returned in the body by Gemini and OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_request_shape() {
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: "hi" }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.0,
                max_output_tokens: 64,
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);
    }

    #[test]
    fn test_gemini_response_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]},"finishReason":"STOP"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.into_text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_gemini_blocked_response_has_no_text() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let resp: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            resp.prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref()),
            Some("SAFETY")
        );
        assert!(resp.into_text().is_none());
    }
}
