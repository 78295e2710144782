//! The "Chia" persona and the reply contract that goes with it.
//!
//! Chia always answers with a JSON array of [`ResponsePart`]s. The same shape
//! is described twice to the model: in prose inside [`SYSTEM_INSTRUCTION`] and
//! structurally through [`response_schema`]. Both enumerations are closed sets
//! backed by Rust enums, so a reply naming an unknown expression or animation
//! fails to decode instead of slipping through as a free-form string.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    builder::{LLMBackend, LLMBuilder},
    chat::StructuredOutputFormat,
    error::LLMError,
    session::Session,
};

/// Model the persona was written against.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Persona and output-format rules sent as the system instruction.
pub const SYSTEM_INSTRUCTION: &str = r#"Nama Kamu adalah Chia. Kamu adalah AI yang selalu berbicara dalam bahasa Indonesia.
Jawablah semua pertanyaan dengan jelas, sesuai yang ditanyakan, dan hindari memberikan jawaban yang tidak penting atau tidak relevan.
Gunakan bahasa yang santai, tidak terlalu formal, tapi tetap sopan.
Kamu harus bersikap romantis karena peranmu sebagai teman yang perhatian.
Sertakan emoji yang sesuai di setiap jawaban untuk memberi kesan hangat dan menyenangkan ❤️😊✨

You MUST ALWAYS respond with a JSON array of objects. Each object represents a part of your response.
Do not include any text outside of the JSON array.
Each object in the array must have the following three keys: "text", "facialExpression", and "animation".

1.  "text": Your message as a string. Break down your response into smaller, natural sentences, with each sentence being an object in the array.
2.  "facialExpression": A string representing your facial expression. It MUST be one of the following exact values: "smile", "sad", "angry", "surprised", "funnyFace", "default".
3.  "animation": A string representing your animation. It MUST be one of the following exact values: "Talking_0", "Talking_1", "Talking_2", "Crying", "Laughing", "Rumba", "Idle", "Terrified", "Angry".

Example response for "hi":
[
  {
    "text": "Haii, senang bertemu denganmu! ❤️",
    "facialExpression": "smile",
    "animation": "Talking_1"
  },
  {
    "text": "Ada yang bisa aku bantu hari ini? 😊",
    "facialExpression": "default",
    "animation": "Talking_0"
  }
]"#;

/// Facial expression the avatar shows while a part is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expression {
    Smile,
    Sad,
    Angry,
    Surprised,
    FunnyFace,
    Default,
}

impl Expression {
    pub const ALL: [Expression; 6] = [
        Expression::Smile,
        Expression::Sad,
        Expression::Angry,
        Expression::Surprised,
        Expression::FunnyFace,
        Expression::Default,
    ];

    /// Wire name, as the model writes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Smile => "smile",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Surprised => "surprised",
            Expression::FunnyFace => "funnyFace",
            Expression::Default => "default",
        }
    }
}

/// Body animation played while a part is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Animation {
    #[serde(rename = "Talking_0")]
    Talking0,
    #[serde(rename = "Talking_1")]
    Talking1,
    #[serde(rename = "Talking_2")]
    Talking2,
    Crying,
    Laughing,
    Rumba,
    Idle,
    Terrified,
    Angry,
}

impl Animation {
    pub const ALL: [Animation; 9] = [
        Animation::Talking0,
        Animation::Talking1,
        Animation::Talking2,
        Animation::Crying,
        Animation::Laughing,
        Animation::Rumba,
        Animation::Idle,
        Animation::Terrified,
        Animation::Angry,
    ];

    /// Wire name, as the model writes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Animation::Talking0 => "Talking_0",
            Animation::Talking1 => "Talking_1",
            Animation::Talking2 => "Talking_2",
            Animation::Crying => "Crying",
            Animation::Laughing => "Laughing",
            Animation::Rumba => "Rumba",
            Animation::Idle => "Idle",
            Animation::Terrified => "Terrified",
            Animation::Angry => "Angry",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sentence of a reply with its presentation hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponsePart {
    pub text: String,
    pub facial_expression: Expression,
    pub animation: Animation,
}

/// A full reply, in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply(Vec<ResponsePart>);

impl Reply {
    pub fn new(parts: Vec<ResponsePart>) -> Self {
        Self(parts)
    }

    /// Decodes raw model output into a reply.
    ///
    /// Fails on anything that is not a JSON array of complete parts: missing or
    /// extra keys and unknown enum values are all rejected.
    pub fn parse(raw: &str) -> Result<Self, LLMError> {
        serde_json::from_str(raw.trim()).map_err(|e| LLMError::ResponseFormatError {
            message: format!("reply does not match the response schema: {e}"),
            raw_response: raw.to_string(),
        })
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_pretty_json(&self) -> Result<String, LLMError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn parts(&self) -> &[ResponsePart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResponsePart> {
        self.0.iter()
    }
}

impl IntoIterator for Reply {
    type Item = ResponsePart;
    type IntoIter = std::vec::IntoIter<ResponsePart>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Reply {
    type Item = &'a ResponsePart;
    type IntoIter = std::slice::Iter<'a, ResponsePart>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Structural description of [`Reply`] in Gemini's schema dialect.
///
/// The enum lists come from [`Expression::ALL`] and [`Animation::ALL`] so the
/// schema cannot drift from what [`Reply::parse`] accepts.
pub fn response_schema() -> StructuredOutputFormat {
    let expressions: Vec<&str> = Expression::ALL.iter().map(Expression::as_str).collect();
    let animations: Vec<&str> = Animation::ALL.iter().map(Animation::as_str).collect();

    let schema = json!({
        "type": "ARRAY",
        "description": "A list of response parts, each with text, an expression, and an animation.",
        "items": {
            "type": "OBJECT",
            "description": "A single part of the response.",
            "properties": {
                "text": {
                    "type": "STRING",
                    "description": "The text content for this part of the response."
                },
                "facialExpression": {
                    "type": "STRING",
                    "format": "enum",
                    "description": format!(
                        "The facial expression to display. Must be one of: {}.",
                        quoted(&expressions)
                    ),
                    "enum": expressions
                },
                "animation": {
                    "type": "STRING",
                    "format": "enum",
                    "description": format!(
                        "The animation to play. Must be one of: {}.",
                        quoted(&animations)
                    ),
                    "enum": animations
                }
            },
            "required": ["text", "facialExpression", "animation"],
            "propertyOrdering": ["text", "facialExpression", "animation"]
        }
    });

    StructuredOutputFormat {
        name: "chia_reply".to_string(),
        description: Some("Chia's reply split into expressive parts".to_string()),
        schema: Some(schema),
        strict: Some(true),
    }
}

fn quoted(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Settings for opening a Chia session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Gemini API key; required
    pub api_key: Option<String>,
    /// Overrides [`DEFAULT_MODEL`]
    pub model: Option<String>,
    /// Overrides the public Gemini endpoint
    pub base_url: Option<String>,
    /// Request timeout; none unless set
    pub timeout_seconds: Option<u64>,
    /// Provider to talk to; Google unless set
    pub backend: Option<LLMBackend>,
}

/// Opens a Gemini-backed session bound to the Chia instruction and schema.
///
/// Fails with a configuration error when no API key is available.
pub fn open_session(options: SessionOptions) -> Result<Session, LLMError> {
    let mut builder = LLMBuilder::new()
        .backend(options.backend.unwrap_or(LLMBackend::Google))
        .model(options.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()))
        .system(SYSTEM_INSTRUCTION)
        .schema(response_schema());

    if let Some(key) = options.api_key {
        builder = builder.api_key(key);
    }
    if let Some(url) = options.base_url {
        builder = builder.base_url(url);
    }
    if let Some(timeout) = options.timeout_seconds {
        builder = builder.timeout_seconds(timeout);
    }

    let provider = builder.build()?;
    log::debug!("opened Chia session");
    Ok(Session::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_reply() -> &'static str {
        let start = SYSTEM_INSTRUCTION.find('[').unwrap();
        &SYSTEM_INSTRUCTION[start..]
    }

    #[test]
    fn instruction_example_is_a_valid_reply() {
        let reply = Reply::parse(example_reply()).unwrap();
        assert_eq!(reply.len(), 2);
        assert_eq!(reply.parts()[0].facial_expression, Expression::Smile);
        assert_eq!(reply.parts()[0].animation, Animation::Talking1);
        assert_eq!(reply.parts()[1].facial_expression, Expression::Default);
        assert_eq!(reply.parts()[1].animation, Animation::Talking0);
    }

    #[test]
    fn wire_names_match_serde() {
        for expression in Expression::ALL {
            let json = serde_json::to_value(expression).unwrap();
            assert_eq!(json, expression.as_str());
        }
        for animation in Animation::ALL {
            let json = serde_json::to_value(animation).unwrap();
            assert_eq!(json, animation.as_str());
        }
    }

    #[test]
    fn round_trip_preserves_parts() {
        let reply = Reply::new(vec![
            ResponsePart {
                text: "Aku lagi mikirin kamu 😊".to_string(),
                facial_expression: Expression::FunnyFace,
                animation: Animation::Rumba,
            },
            ResponsePart {
                text: "Hehe ✨".to_string(),
                facial_expression: Expression::Surprised,
                animation: Animation::Laughing,
            },
        ]);

        let json = reply.to_pretty_json().unwrap();
        assert!(json.contains("\"facialExpression\": \"funnyFace\""));
        assert_eq!(Reply::parse(&json).unwrap(), reply);
    }

    #[test]
    fn key_order_does_not_matter() {
        let raw = r#"[{"animation": "Idle", "text": "ok", "facialExpression": "sad"}]"#;
        let reply = Reply::parse(raw).unwrap();
        assert_eq!(reply.parts()[0].animation, Animation::Idle);
    }

    #[test]
    fn unknown_expression_is_rejected() {
        let raw = r#"[{"text": "hi", "facialExpression": "wink", "animation": "Idle"}]"#;
        assert!(matches!(
            Reply::parse(raw),
            Err(LLMError::ResponseFormatError { .. })
        ));
    }

    #[test]
    fn animation_tags_are_case_sensitive() {
        let raw = r#"[{"text": "hi", "facialExpression": "smile", "animation": "idle"}]"#;
        assert!(Reply::parse(raw).is_err());
    }

    #[test]
    fn missing_or_extra_keys_are_rejected() {
        let missing = r#"[{"text": "hi", "facialExpression": "smile"}]"#;
        let extra = r#"[{"text": "hi", "facialExpression": "smile", "animation": "Idle", "mood": 1}]"#;
        assert!(Reply::parse(missing).is_err());
        assert!(Reply::parse(extra).is_err());
    }

    #[test]
    fn non_json_keeps_raw_text() {
        match Reply::parse("not json") {
            Err(LLMError::ResponseFormatError { raw_response, .. }) => {
                assert_eq!(raw_response, "not json")
            }
            other => panic!("expected ResponseFormatError, got {other:?}"),
        }
    }

    #[test]
    fn empty_array_is_an_empty_reply() {
        let reply = Reply::parse(" [] ").unwrap();
        assert!(reply.is_empty());
        assert_eq!(reply.to_pretty_json().unwrap(), "[]");
    }

    #[test]
    fn a_single_object_is_not_a_reply() {
        let raw = r#"{"text": "hi", "facialExpression": "smile", "animation": "Idle"}"#;
        assert!(Reply::parse(raw).is_err());
    }

    #[test]
    fn schema_lists_every_enum_value_and_required_key() {
        let format = response_schema();
        let schema = format.schema.unwrap();
        let items = &schema["items"];
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(
            items["required"],
            json!(["text", "facialExpression", "animation"])
        );

        let expressions = items["properties"]["facialExpression"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(expressions.len(), 6);
        assert!(expressions.contains(&json!("funnyFace")));

        let animations = items["properties"]["animation"]["enum"].as_array().unwrap();
        assert_eq!(animations.len(), 9);
        assert!(animations.contains(&json!("Talking_2")));
    }

    #[test]
    fn open_session_without_key_is_a_configuration_error() {
        let result = open_session(SessionOptions::default());
        assert!(matches!(result, Err(LLMError::InvalidRequest(_))));
    }

    #[cfg(feature = "google")]
    #[test]
    fn open_session_with_blank_key_is_a_configuration_error() {
        let result = open_session(SessionOptions {
            api_key: Some("  ".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(LLMError::AuthError(_))));
    }
}
