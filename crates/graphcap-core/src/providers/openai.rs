//! OpenAI provider using the Chat Completions API.
//!
//! Sends the image via data URL in the user message content array.

use super::base::BaseClient;
use super::client::{openai_vision_content, LlmClient, ProviderKind};
use super::image::EncodedImage;
use super::types::{flat_json_schema_format, ContentPart};
use async_trait::async_trait;
use serde_json::Value;

/// OpenAI provider.
pub struct OpenAiClient {
    base: BaseClient,
}

impl OpenAiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        let base = BaseClient::new(base_url, api_key);
        tracing::debug!("OpenAiClient initialized with base_url: {}", base.base_url());
        Self { base }
    }

    pub fn from_base(base: BaseClient) -> Self {
        Self { base }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn base(&self) -> &BaseClient {
        &self.base
    }

    fn format_vision_content(&self, text: &str, image: &EncodedImage) -> Vec<ContentPart> {
        openai_vision_content(text, image)
    }

    fn structured_response_format(&self, schema: &Value) -> Value {
        flat_json_schema_format(schema)
    }
}
