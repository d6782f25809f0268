//! vLLM provider (OpenAI-compatible server).
//!
//! Usually self-hosted without auth. vLLM accepts `repetition_penalty` as an
//! extra sampling parameter, which the other OpenAI-style backends reject.

use super::base::BaseClient;
use super::client::{openai_vision_content, LlmClient, ProviderKind};
use super::image::EncodedImage;
use super::types::ContentPart;
use async_trait::async_trait;

/// vLLM provider.
pub struct VllmClient {
    base: BaseClient,
    root: String,
}

impl VllmClient {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11435";

    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self::from_base(BaseClient::new(base_url, api_key))
    }

    /// Wrap a base client pointed at the vLLM server root (or its `/v1`).
    pub fn from_base(base: BaseClient) -> Self {
        let root = base
            .base_url()
            .trim_end_matches("/v1")
            .trim_end_matches('/')
            .to_string();
        let base = base.with_base_url(&format!("{root}/v1"));
        Self { base, root }
    }

    /// Server root without the `/v1` suffix.
    pub fn root(&self) -> &str {
        &self.root
    }
}

#[async_trait]
impl LlmClient for VllmClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Vllm
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

    /// Health check on `GET {root}/health`.
    async fn is_available(&self) -> bool {
        match self.base.ping(&format!("{}/health", self.root)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("vLLM health check failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::client::StructuredCompletion;
    use crate::providers::image::ImageInput;
    use crate::providers::schema::SchemaInput;
    use crate::providers::types::SamplingOptions;
    use serde::Deserialize;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, schemars::JsonSchema)]
    struct Scene {
        subject: String,
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("authorization", "Bearer vllm-key"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = VllmClient::new(&format!("{}/v1", server.uri()), Some("vllm-key"));
        assert_eq!(client.root(), server.uri());
        assert!(client.is_available().await);
        assert!(!VllmClient::new(&server.uri(), Some("wrong")).is_available().await);
    }

    #[tokio::test]
    async fn test_vision_completion_from_file_forwards_repetition_penalty() {
        let mut image = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        image.write_all(b"ABC").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "vision-worker",
                "repetition_penalty": 1.5,
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Describe"},
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,QUJD"}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"subject\": \"letters\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VllmClient::new(&server.uri(), None);
        let scene = client
            .create_structured_vision_completion(
                "Describe",
                ImageInput::from(image.path()),
                SchemaInput::<Scene>::of(),
                "vision-worker",
                &SamplingOptions::default().repetition_penalty(1.5),
            )
            .await
            .unwrap()
            .parsed()
            .unwrap();
        assert_eq!(scene.subject, "letters");
    }
}
