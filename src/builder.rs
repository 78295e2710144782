//! Builder module for configuring and instantiating chat providers.
//!
//! This module provides a builder pattern for creating a provider with its
//! model, credentials, system instruction and structured-output schema.

use crate::{
    chat::{ChatProvider, StructuredOutputFormat},
    error::LLMError,
};

/// Supported LLM backend providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LLMBackend {
    /// Google Gemini API provider
    Google,
}

/// Implements string parsing for LLMBackend enum.
///
/// The parsing is case-insensitive; `"gemini"` is accepted as an alias.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use chia::builder::LLMBackend;
///
/// let backend = LLMBackend::from_str("Google").unwrap();
/// assert_eq!(backend, LLMBackend::Google);
///
/// let err = LLMBackend::from_str("invalid").unwrap_err();
/// assert!(err.to_string().contains("Unknown LLM backend"));
/// ```
impl std::str::FromStr for LLMBackend {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(LLMBackend::Google),
            _ => Err(LLMError::InvalidRequest(format!(
                "Unknown LLM backend: {}",
                s
            ))),
        }
    }
}

/// Builder for configuring and instantiating chat providers.
#[derive(Default)]
pub struct LLMBuilder {
    /// Selected backend provider
    backend: Option<LLMBackend>,
    /// API key for authentication with the provider
    api_key: Option<String>,
    /// Base URL for API requests
    base_url: Option<String>,
    /// Model identifier/name to use
    model: Option<String>,
    /// Maximum tokens to generate in responses
    max_tokens: Option<u32>,
    /// Temperature parameter for controlling response randomness (0.0-1.0)
    temperature: Option<f32>,
    /// System prompt/context to guide model behavior
    system: Option<String>,
    /// Request timeout duration in seconds
    timeout_seconds: Option<u64>,
    /// Top-p (nucleus) sampling parameter
    top_p: Option<f32>,
    /// Top-k sampling parameter
    top_k: Option<u32>,
    /// JSON schema for structured output
    json_schema: Option<StructuredOutputFormat>,
}

impl LLMBuilder {
    /// Creates a new empty builder instance with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend provider to use.
    pub fn backend(mut self, backend: LLMBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the API key for authentication.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL for API requests.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model identifier to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperature for controlling response randomness (0.0-1.0).
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the system prompt/context.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the request timeout in seconds.
    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the top-p (nucleus) sampling parameter.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Sets the top-k sampling parameter.
    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Sets the JSON schema the reply must follow.
    pub fn schema(mut self, schema: impl Into<StructuredOutputFormat>) -> Self {
        self.json_schema = Some(schema.into());
        self
    }

    /// Builds and returns a configured provider instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No backend is specified
    /// - Required backend feature is not enabled
    /// - The API key is missing or blank
    pub fn build(self) -> Result<Box<dyn ChatProvider>, LLMError> {
        let backend = self
            .backend
            .ok_or_else(|| LLMError::InvalidRequest("No backend specified".to_string()))?;

        #[allow(unused_variables)]
        let provider: Box<dyn ChatProvider> = match backend {
            LLMBackend::Google => {
                #[cfg(not(feature = "google"))]
                return Err(LLMError::InvalidRequest(
                    "Google feature not enabled".to_string(),
                ));

                #[cfg(feature = "google")]
                {
                    let api_key = self.api_key.ok_or_else(|| {
                        LLMError::InvalidRequest("No API key provided for Google".to_string())
                    })?;
                    if api_key.trim().is_empty() {
                        return Err(LLMError::AuthError("Missing Google API key".to_string()));
                    }

                    let google = crate::backends::google::Google::new(
                        api_key,
                        self.model,
                        self.base_url,
                        self.max_tokens,
                        self.temperature,
                        self.timeout_seconds,
                        self.system,
                        self.top_p,
                        self.top_k,
                        self.json_schema,
                    )?;
                    Box::new(google)
                }
            }
        };

        #[allow(unreachable_code)]
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse() {
        use std::str::FromStr;

        assert_eq!(LLMBackend::from_str("GEMINI").unwrap(), LLMBackend::Google);
        assert_eq!(LLMBackend::from_str("google").unwrap(), LLMBackend::Google);
        assert!(matches!(
            LLMBackend::from_str("openai"),
            Err(LLMError::InvalidRequest(_))
        ));
    }

    #[test]
    fn build_requires_backend() {
        let err = LLMBuilder::new().api_key("k").build().err().unwrap();
        assert!(err.to_string().contains("No backend specified"));
    }

    #[cfg(feature = "google")]
    #[test]
    fn build_requires_api_key() {
        let result = LLMBuilder::new().backend(LLMBackend::Google).build();
        assert!(matches!(result, Err(LLMError::InvalidRequest(_))));
    }

    #[cfg(feature = "google")]
    #[test]
    fn build_google_with_key() {
        let result = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key("test-key")
            .model("gemini-2.5-flash")
            .temperature(0.7)
            .timeout_seconds(30)
            .build();
        assert!(result.is_ok());
    }
}
