//! Google Gemini API client implementation for chat functionality.
//!
//! This module talks to the `generateContent` endpoint of the Gemini API.
//! Structured output is requested by sending a `responseMimeType` of
//! `application/json` together with a `responseSchema`; the system prompt
//! travels as a dedicated `systemInstruction` rather than as a chat turn.
//!
//! # Example
//! ```no_run
//! use chia::backends::google::Google;
//! use chia::chat::{ChatMessage, ChatProvider};
//!
//! #[tokio::main]
//! async fn main() {
//! let client = Google::new(
//!     "your-api-key",
//!     None, // Use default model
//!     None, // Default endpoint
//!     None, // Max tokens
//!     None, // Temperature
//!     None, // No timeout
//!     Some("Answer in one word.".to_string()),
//!     None, // Default top_p
//!     None, // Default top_k
//!     None, // No structured output
//! )
//! .unwrap();
//!
//! let messages = vec![ChatMessage::user().content("Hello!").build()];
//!
//! let response = client.chat(&messages).await.unwrap();
//! println!("{}", response);
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chat::{ChatMessage, ChatProvider, ChatResponse, ChatRole, StructuredOutputFormat, Usage},
    error::LLMError,
};

/// Public endpoint of the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Client for interacting with Google's Gemini API.
pub struct Google {
    /// API key for authentication with Google's API
    pub api_key: String,
    /// Model identifier (e.g. "gemini-2.5-flash")
    pub model: String,
    /// API root, without trailing slash
    pub base_url: String,
    /// Maximum number of tokens to generate in responses
    pub max_tokens: Option<u32>,
    /// Sampling temperature between 0.0 and 1.0
    pub temperature: Option<f32>,
    /// Optional system instruction
    pub system: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: Option<u64>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
    /// Top-k sampling parameter
    pub top_k: Option<u32>,
    /// JSON schema the reply must follow
    pub json_schema: Option<StructuredOutputFormat>,
    /// HTTP client for making API requests
    client: Client,
}

/// Request body for chat completions
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleChatRequest<'a> {
    /// List of conversation messages
    contents: Vec<GoogleChatContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleSystemInstruction<'a>>,
    /// Optional generation parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GoogleGenerationConfig<'a>>,
}

/// Individual message in a chat conversation
#[derive(Serialize)]
struct GoogleChatContent<'a> {
    /// Role of the message sender ("user" or "model")
    role: &'a str,
    /// Content parts of the message
    parts: Vec<GoogleContentPart<'a>>,
}

#[derive(Serialize)]
struct GoogleSystemInstruction<'a> {
    parts: Vec<GoogleContentPart<'a>>,
}

/// Text content within a chat message
#[derive(Serialize)]
struct GoogleContentPart<'a> {
    /// The actual text content
    text: &'a str,
}

/// Configuration parameters for text generation
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

/// Response from the chat completion API
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GoogleChatResponse {
    /// Generated completion candidates
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GooglePromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GoogleUsageMetadata>,
}

/// Individual completion candidate
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GoogleCandidate {
    /// Content of the candidate response
    #[serde(default)]
    content: Option<GoogleResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Content block within a response
#[derive(Deserialize, Debug)]
struct GoogleResponseContent {
    /// Parts making up the content
    #[serde(default)]
    parts: Vec<GoogleResponsePart>,
}

/// Individual part of response content
#[derive(Deserialize, Debug)]
struct GoogleResponsePart {
    /// Text content of this part
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GooglePromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GoogleUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl ChatResponse for GoogleChatResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<String>();
        Some(text)
    }

    fn usage(&self) -> Option<Usage> {
        self.usage_metadata.as_ref().map(|usage| Usage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        })
    }
}

impl std::fmt::Display for GoogleChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text().unwrap_or_default())
    }
}

impl Google {
    /// Creates a new Google Gemini client with the specified configuration.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Google API key for authentication
    /// * `model` - Model identifier (defaults to [`DEFAULT_MODEL`])
    /// * `base_url` - API root (defaults to [`DEFAULT_BASE_URL`])
    /// * `max_tokens` - Maximum tokens in response
    /// * `temperature` - Sampling temperature between 0.0 and 1.0
    /// * `timeout_seconds` - Request timeout in seconds, none by default
    /// * `system` - System instruction
    /// * `top_p` - Top-p sampling parameter
    /// * `top_k` - Top-k sampling parameter
    /// * `json_schema` - Schema the reply must follow; enables JSON output
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::HttpError`] if the HTTP client cannot be built.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_key: impl Into<String>,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
        system: Option<String>,
        top_p: Option<f32>,
        top_k: Option<u32>,
        json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Self, LLMError> {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(sec));
        }
        Ok(Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens,
            temperature,
            system,
            timeout_seconds,
            top_p,
            top_k,
            json_schema,
            client: builder.build()?,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{base}/models/{model}:generateContent",
            base = self.base_url,
            model = self.model
        )
    }

    fn build_request<'a>(&'a self, messages: &'a [ChatMessage]) -> GoogleChatRequest<'a> {
        let contents = messages
            .iter()
            .map(|msg| GoogleChatContent {
                role: match msg.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                },
                parts: vec![GoogleContentPart { text: &msg.content }],
            })
            .collect();

        let system_instruction = self.system.as_deref().map(|system| GoogleSystemInstruction {
            parts: vec![GoogleContentPart { text: system }],
        });

        let response_schema = self
            .json_schema
            .as_ref()
            .and_then(|format| format.schema.as_ref());

        // An empty generationConfig is rejected by the API
        let generation_config = if self.max_tokens.is_none()
            && self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && response_schema.is_none()
        {
            None
        } else {
            Some(GoogleGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                response_mime_type: response_schema.map(|_| "application/json"),
                response_schema,
            })
        };

        GoogleChatRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }
}

#[async_trait]
impl ChatProvider for Google {
    /// Sends a chat request to Google's Gemini API.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        if self.api_key.is_empty() {
            return Err(LLMError::AuthError("Missing Google API key".to_string()));
        }

        let req_body = self.build_request(messages);

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&req_body) {
                log::trace!("Google request payload: {}", json);
            }
        }

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&req_body)
            .send()
            .await?;

        log::debug!("Google HTTP status: {}", resp.status());

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await?;
            return Err(LLMError::ProviderError(format!(
                "Google API returned error status {status}: {error_text}"
            )));
        }

        let body = resp.text().await?;
        let json_resp = decode_response(&body)?;
        Ok(Box::new(json_resp))
    }
}

fn decode_response(body: &str) -> Result<GoogleChatResponse, LLMError> {
    let json_resp: GoogleChatResponse =
        serde_json::from_str(body).map_err(|e| LLMError::ResponseFormatError {
            message: format!("Failed to decode Google response: {e}"),
            raw_response: body.to_string(),
        })?;

    if json_resp.candidates.is_empty() {
        let reason = json_resp
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
            .unwrap_or("unknown");
        return Err(LLMError::ProviderError(format!(
            "No candidates returned by Google (block reason: {reason})"
        )));
    }

    if let Some(reason) = json_resp.candidates[0].finish_reason.as_deref() {
        if reason != "STOP" {
            log::debug!("Google candidate finished with reason {}", reason);
        }
    }

    Ok(json_resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(system: Option<&str>, schema: Option<StructuredOutputFormat>) -> Google {
        Google::new(
            "test-key",
            None,
            Some("http://localhost:9999/v1beta/".to_string()),
            None,
            None,
            None,
            system.map(str::to_string),
            None,
            None,
            schema,
        )
        .expect("client")
    }

    #[test]
    fn endpoint_uses_model_and_trims_base_url() {
        let google = client(None, None);
        assert_eq!(
            google.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn request_carries_instruction_and_schema() {
        let schema = StructuredOutputFormat {
            name: "reply".to_string(),
            description: None,
            schema: Some(json!({"type": "ARRAY", "items": {"type": "STRING"}})),
            strict: None,
        };
        let google = client(Some("Be brief."), Some(schema));
        let messages = vec![
            ChatMessage::user().content("hi").build(),
            ChatMessage::assistant().content("[]").build(),
            ChatMessage::user().content("again").build(),
        ];

        let body = serde_json::to_value(google.build_request(&messages)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "again");
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "ARRAY");
        assert!(config.get("temperature").is_none());
    }

    #[test]
    fn request_without_options_omits_generation_config() {
        let google = client(None, None);
        let messages = vec![ChatMessage::user().content("hi").build()];
        let body = serde_json::to_value(google.build_request(&messages)).unwrap();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn response_parts_are_joined() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "[{\"a\":"}, {"text": "1}]"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        })
        .to_string();

        let resp = decode_response(&body).unwrap();
        assert_eq!(resp.text().as_deref(), Some("[{\"a\":1}]"));
        let usage = resp.usage().unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 17);
    }

    #[test]
    fn blocked_prompt_is_a_provider_error() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}}).to_string();
        match decode_response(&body) {
            Err(LLMError::ProviderError(msg)) => assert!(msg.contains("SAFETY"), "got {msg}"),
            other => panic!("expected ProviderError, got {other:?}"),
        }
    }

    #[test]
    fn garbage_body_is_a_format_error() {
        match decode_response("<html>") {
            Err(LLMError::ResponseFormatError { raw_response, .. }) => {
                assert_eq!(raw_response, "<html>")
            }
            other => panic!("expected ResponseFormatError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_key_fails_before_any_request() {
        let google = Google::new("", None, None, None, None, None, None, None, None, None).unwrap();
        let messages = vec![ChatMessage::user().content("hi").build()];
        match google.chat(&messages).await {
            Err(LLMError::AuthError(_)) => {}
            other => panic!("expected AuthError, got {other:?}"),
        }
    }
}
