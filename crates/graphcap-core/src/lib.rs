//! graphcap core - multi-provider LLM client layer for structured image captions.
//!
//! Several OpenAI-compatible backends (cloud and local) sit behind one client
//! trait. Callers ask for output matching a JSON Schema, optionally with an
//! image attached, and get back either a parsed value or a typed error.
//!
//! # Architecture
//!
//! ```text
//! provider.config.toml → ProviderConfig → ProviderManager → Arc<dyn LlmClient>
//!                                                              │
//!               prompt + image + schema → structured completion → parsed value
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use graphcap_core::providers::{ProviderManager, SamplingOptions, SchemaInput, StructuredCompletion};
//! use graphcap_core::caption::GraphCaption;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = ProviderManager::new("provider.config.toml".as_ref())?;
//!     let client = manager.get_client("gemini").expect("gemini configured");
//!
//!     let caption = client
//!         .create_structured_vision_completion(
//!             "Describe this image",
//!             "./image.jpg".into(),
//!             SchemaInput::<GraphCaption>::of(),
//!             "gemini-2.0-flash-exp",
//!             &SamplingOptions::default().max_tokens(4096),
//!         )
//!         .await?;
//!     println!("{:?}", caption.parsed());
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod output;
pub mod providers;

pub use caption::{CaptionKind, CaptionOptions, CaptionProcessor, CaptionRecord};
pub use config::{CaptionJobConfig, ProviderConfig, ProviderConfigs};
pub use error::{ConfigError, ProviderError, ProviderResult};
pub use output::{OutputFormat, OutputWriter};
pub use providers::{LlmClient, ProviderKind, ProviderManager, StructuredCompletion};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
