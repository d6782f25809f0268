//! Gemini provider through Google's OpenAI compatibility layer.

use super::base::BaseClient;
use super::client::{openai_vision_content, LlmClient, ProviderKind};
use super::image::EncodedImage;
use super::types::{flat_json_schema_format, ContentPart};
use async_trait::async_trait;
use serde_json::Value;

/// Gemini provider.
pub struct GeminiClient {
    base: BaseClient,
}

impl GeminiClient {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/openai";

    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self::from_base(BaseClient::new(base_url, api_key))
    }

    pub fn from_base(base: BaseClient) -> Self {
        tracing::info!("GeminiClient initialized with base_url: {}", base.base_url());
        Self { base }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
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
