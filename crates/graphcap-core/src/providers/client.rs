//! The provider client trait and the structured completion protocol.
//!
//! Vendors differ in a handful of places: how a vision message is laid out,
//! which `response_format` shape they accept, which sampling parameters they
//! take, and how models are listed. `LlmClient` captures exactly those points.
//! The structured completion flow itself lives in `StructuredCompletion`,
//! implemented once for every client.

use super::base::BaseClient;
use super::image::{EncodedImage, ImageInput};
use super::schema::{SchemaDescriptor, SchemaInput, Structured};
use super::types::{
    strict_json_schema_format, ChatCompletion, ChatMessage, ChatRequest, ContentPart,
    SamplingOptions,
};
use crate::error::ProviderResult;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Supported provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Ollama,
    Vllm,
    OpenRouter,
}

impl ProviderKind {
    /// Parse the `kind` value from provider config.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" => Some(Self::Gemini),
            "ollama" => Some(Self::Ollama),
            "vllm" => Some(Self::Vllm),
            "openrouter" => Some(Self::OpenRouter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::Vllm => "vllm",
            Self::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait that all provider clients implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the manager hands out `Arc<dyn LlmClient>`).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Which vendor this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Endpoint, credentials and transport.
    fn base(&self) -> &BaseClient;

    /// Build the content blocks of a vision message.
    fn format_vision_content(&self, text: &str, image: &EncodedImage) -> Vec<ContentPart>;

    /// `response_format` for a plain (non-vision) structured completion.
    fn structured_response_format(&self, schema: &Value) -> Value {
        strict_json_schema_format(schema)
    }

    /// Whether the backend accepts `repetition_penalty`.
    fn supports_repetition_penalty(&self) -> bool {
        false
    }

    /// Send a Chat Completions request.
    async fn complete(&self, request: ChatRequest) -> ProviderResult<ChatCompletion> {
        self.base().chat_completion(&request).await
    }

    /// Models available on this provider.
    async fn list_models(&self) -> ProviderResult<Vec<String>> {
        self.base().list_models().await
    }

    /// Check whether the backend answers, using the configured credentials.
    async fn is_available(&self) -> bool {
        let base = self.base();
        match base.ping(&base.url("models")).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("{} availability check failed: {e}", self.kind());
                false
            }
        }
    }
}

/// OpenAI-style vision content: a text block followed by an inline image.
pub fn openai_vision_content(text: &str, image: &EncodedImage) -> Vec<ContentPart> {
    vec![
        ContentPart::text(text),
        ContentPart::image_url(image.data_url()),
    ]
}

/// Schema-constrained completions, available on every `LlmClient`.
#[async_trait]
pub trait StructuredCompletion: LlmClient {
    /// Ask for output matching `schema`.
    ///
    /// Descriptor schemas come back as `Structured::Parsed`, raw JSON Schemas
    /// as the untouched completion. Failures are logged here and returned
    /// unchanged.
    async fn create_structured_completion<T: SchemaDescriptor>(
        &self,
        messages: Vec<ChatMessage>,
        schema: SchemaInput<T>,
        model: &str,
        options: &SamplingOptions,
    ) -> ProviderResult<Structured<T>>;

    /// Ask for output matching `schema`, describing `image` with `prompt`.
    async fn create_structured_vision_completion<T: SchemaDescriptor>(
        &self,
        prompt: &str,
        image: ImageInput,
        schema: SchemaInput<T>,
        model: &str,
        options: &SamplingOptions,
    ) -> ProviderResult<Structured<T>>;
}

#[async_trait]
impl<C: LlmClient + ?Sized> StructuredCompletion for C {
    async fn create_structured_completion<T: SchemaDescriptor>(
        &self,
        messages: Vec<ChatMessage>,
        schema: SchemaInput<T>,
        model: &str,
        options: &SamplingOptions,
    ) -> ProviderResult<Structured<T>> {
        let result: ProviderResult<Structured<T>> = async {
            let json_schema = schema.extract_json_schema()?;
            let request = build_request(self, model, messages, options)
                .with_response_format(self.structured_response_format(&json_schema));
            let completion = self.complete(request).await?;
            schema.rehydrate(completion)
        }
        .await;

        result.inspect_err(|e| {
            tracing::error!("[{}] Failed to create structured completion: {e}", self.kind())
        })
    }

    async fn create_structured_vision_completion<T: SchemaDescriptor>(
        &self,
        prompt: &str,
        image: ImageInput,
        schema: SchemaInput<T>,
        model: &str,
        options: &SamplingOptions,
    ) -> ProviderResult<Structured<T>> {
        let result: ProviderResult<Structured<T>> = async {
            let json_schema = schema.extract_json_schema()?;
            let encoded = image.encode().await?;
            let content = self.format_vision_content(prompt, &encoded);
            let messages = vec![ChatMessage::user_parts(content)];
            let request = build_request(self, model, messages, options)
                .with_response_format(strict_json_schema_format(&json_schema));
            let completion = self.complete(request).await?;
            schema.rehydrate(completion)
        }
        .await;

        result.inspect_err(|e| {
            tracing::error!(
                "[{}] Failed to create structured vision completion: {e}",
                self.kind()
            )
        })
    }
}

/// Assemble a request, dropping sampling options the backend rejects.
fn build_request<C: LlmClient + ?Sized>(
    client: &C,
    model: &str,
    messages: Vec<ChatMessage>,
    options: &SamplingOptions,
) -> ChatRequest {
    let mut request = ChatRequest::new(model, messages, options);
    if request.repetition_penalty.is_some() && !client.supports_repetition_penalty() {
        tracing::debug!("[{}] Dropping unsupported repetition_penalty", client.kind());
        request.repetition_penalty = None;
    }
    request
}
