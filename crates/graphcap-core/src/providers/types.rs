//! Chat Completions wire types shared by every OpenAI-compatible provider.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message made of typed content blocks (text + images).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message content: plain text or a list of typed blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A typed content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Sampling parameters supplied by the caller.
///
/// Unset values are omitted from the request so each backend applies its own
/// defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub repetition_penalty: Option<f32>,
}

impl SamplingOptions {
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn repetition_penalty(mut self, repetition_penalty: f32) -> Self {
        self.repetition_penalty = Some(repetition_penalty);
        self
    }
}

/// Chat Completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
}

impl ChatRequest {
    pub fn new(model: &str, messages: Vec<ChatMessage>, options: &SamplingOptions) -> Self {
        Self {
            model: model.to_string(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            repetition_penalty: options.repetition_penalty,
            response_format: None,
        }
    }

    pub fn with_response_format(mut self, response_format: Value) -> Self {
        self.response_format = Some(response_format);
        self
    }
}

/// Chat Completions response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Text content of the first choice.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// `GET /models` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub id: String,
}

/// `{"type": "json_schema", "schema": ...}`, accepted by OpenAI and Gemini
/// for plain structured completions.
pub fn flat_json_schema_format(schema: &Value) -> Value {
    json!({
        "type": "json_schema",
        "schema": schema,
    })
}

/// Strict nested `json_schema` response format.
///
/// The schema name comes from the schema's `title`, falling back to
/// `"response"`.
pub fn strict_json_schema_format(schema: &Value) -> Value {
    let name = schema
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("response");
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": name,
            "strict": true,
            "schema": schema,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_message_serialization() {
        let message = ChatMessage::user_parts(vec![
            ContentPart::text("Describe this"),
            ContentPart::image_url("data:image/png;base64,AAAA"),
        ]);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "Describe this"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                ]
            })
        );
    }

    #[test]
    fn test_request_omits_unset_options() {
        let options = SamplingOptions::default().max_tokens(20);
        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")], &options);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["max_tokens"], 20);
        assert!(value.get("temperature").is_none());
        assert!(value.get("repetition_penalty").is_none());
        assert!(value.get("response_format").is_none());
        assert_eq!(value["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_strict_format_uses_title() {
        let format = strict_json_schema_format(&json!({"title": "GraphCaption", "type": "object"}));
        assert_eq!(format["json_schema"]["name"], "GraphCaption");
        assert_eq!(format["json_schema"]["strict"], true);
        assert_eq!(format["json_schema"]["schema"]["type"], "object");
    }

    #[test]
    fn test_strict_format_falls_back_to_response() {
        let format = strict_json_schema_format(&json!({"type": "object"}));
        assert_eq!(format["json_schema"]["name"], "response");
    }

    #[test]
    fn test_flat_format() {
        let format = flat_json_schema_format(&json!({"type": "object"}));
        assert_eq!(format, json!({"type": "json_schema", "schema": {"type": "object"}}));
    }

    #[test]
    fn test_completion_content() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "c1",
            "model": "m",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{}"}}]
        }))
        .unwrap();
        assert_eq!(completion.content(), Some("{}"));
        assert!(completion.usage.is_none());
    }
}
