//! OpenRouter provider.
//!
//! OpenAI-compatible, with optional app identification headers that
//! OpenRouter uses for attribution and rankings.

use super::base::BaseClient;
use super::client::{openai_vision_content, LlmClient, ProviderKind};
use super::image::EncodedImage;
use super::types::ContentPart;
use async_trait::async_trait;

/// OpenRouter provider.
pub struct OpenRouterClient {
    base: BaseClient,
}

impl OpenRouterClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";

    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        app_url: Option<&str>,
        app_title: Option<&str>,
    ) -> Self {
        Self::from_base(BaseClient::new(base_url, api_key), app_url, app_title)
    }

    /// Wrap a base client, adding `HTTP-Referer` / `X-Title` when given.
    pub fn from_base(mut base: BaseClient, app_url: Option<&str>, app_title: Option<&str>) -> Self {
        if let Some(url) = app_url.filter(|u| !u.is_empty()) {
            base = base.with_header("HTTP-Referer", url);
        }
        if let Some(title) = app_title.filter(|t| !t.is_empty()) {
            base = base.with_header("X-Title", title);
        }
        Self { base }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    fn base(&self) -> &BaseClient {
        &self.base
    }

    fn format_vision_content(&self, text: &str, image: &EncodedImage) -> Vec<ContentPart> {
        openai_vision_content(text, image)
    }

    fn supports_repetition_penalty(&self) -> bool {
        true
    }
}
