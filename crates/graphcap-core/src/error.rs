//! Error types for graphcap.
//!
//! Errors are split by concern: configuration loading happens once at startup
//! and is mostly fatal, while provider errors happen per request and are handed
//! back to the caller to decide whether to skip, retry, or abort.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file does not exist
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A provider declares neither `default_model` nor any `models`
    #[error("Provider '{provider}': must specify default_model when no models list is provided")]
    MissingDefaultModel { provider: String },

    /// Invariant violations collected by `validate_config`
    #[error("Invalid provider configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Errors raised while talking to a provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The schema argument could not be turned into a JSON Schema object
    #[error("Schema error: {0}")]
    Schema(String),

    /// The model output does not parse against the requested shape
    #[error("Response failed validation: {message}")]
    Validation { message: String, content: String },

    /// A local image could not be read
    #[error("Failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network-level failure (connect, timeout, body decode)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The backend answered without any message content
    #[error("Provider returned no message content")]
    EmptyResponse,

    /// No adapter exists for the configured `kind`
    #[error("Unknown provider kind: {0}")]
    UnknownKind(String),

    /// No provider with this name was loaded
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The provider requires an API key and none was found
    #[error("API key not set: {env_var} is empty or unset")]
    MissingApiKey { env_var: String },
}

impl ProviderError {
    /// HTTP status code reported by the backend, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            ProviderError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Convenience type alias for provider-level results.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
