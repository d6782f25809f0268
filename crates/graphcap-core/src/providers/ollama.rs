//! Ollama provider for local vision model inference.
//!
//! Chat goes through Ollama's OpenAI-compatible `/v1` endpoint; model listing
//! and the availability check use the native `/api/tags` endpoint. No
//! authentication required, just needs Ollama running locally.

use super::base::BaseClient;
use super::client::{openai_vision_content, LlmClient, ProviderKind};
use super::image::EncodedImage;
use super::types::ContentPart;
use crate::error::ProviderResult;
use async_trait::async_trait;
use serde::Deserialize;

/// Ollama provider.
pub struct OllamaClient {
    base: BaseClient,
    root: String,
}

/// Ollama /api/tags response.
#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaClient {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";

    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self::from_base(BaseClient::new(base_url, api_key))
    }

    /// Wrap a base client pointed at the Ollama server root.
    ///
    /// A base URL already ending in `/v1` is accepted as well.
    pub fn from_base(base: BaseClient) -> Self {
        let root = base
            .base_url()
            .trim_end_matches("/v1")
            .trim_end_matches('/')
            .to_string();
        let base = base.with_base_url(&format!("{root}/v1"));
        tracing::debug!("OllamaClient initialized with base_url: {}", base.base_url());
        Self { base, root }
    }

    /// Server root without the `/v1` suffix.
    pub fn root(&self) -> &str {
        &self.root
    }

}

#[async_trait]
impl LlmClient for OllamaClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn base(&self) -> &BaseClient {
        &self.base
    }

    fn format_vision_content(&self, text: &str, image: &EncodedImage) -> Vec<ContentPart> {
        openai_vision_content(text, image)
    }

    async fn list_models(&self) -> ProviderResult<Vec<String>> {
        let tags: TagsResponse = self
            .base
            .get_json(&format!("{}/api/tags", self.root))
            .await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn is_available(&self) -> bool {
        self.base
            .ping(&format!("{}/api/tags", self.root))
            .await
            .is_ok()
    }
}
