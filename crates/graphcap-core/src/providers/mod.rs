//! LLM provider clients.
//!
//! Every supported vendor speaks the OpenAI Chat Completions protocol, so the
//! adapters share one transport (`BaseClient`) and differ only where the
//! vendors do. The `ProviderManager` builds one client per configured
//! provider.

mod base;
mod client;
mod gemini;
mod image;
mod manager;
mod ollama;
mod openai;
mod openrouter;
mod schema;
mod types;
mod vllm;

pub use base::BaseClient;
pub use client::{openai_vision_content, LlmClient, ProviderKind, StructuredCompletion};
pub use gemini::GeminiClient;
pub use image::{EncodedImage, ImageInput};
pub use manager::{ClientFactory, ProviderManager};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use openrouter::OpenRouterClient;
pub use schema::{parse_content, SchemaDescriptor, SchemaInput, Structured};
pub use types::{
    flat_json_schema_format, strict_json_schema_format, ChatCompletion, ChatMessage, ChatRequest,
    Choice, ChoiceMessage, ContentPart, ImageUrl, MessageContent, Role, SamplingOptions, Usage,
};
pub use vllm::VllmClient;

