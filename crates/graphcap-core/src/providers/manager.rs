//! Provider registry.
//!
//! Turns provider configuration into live clients, one per provider name,
//! built once and shared for the rest of the process.

use super::base::BaseClient;
use super::client::{LlmClient, ProviderKind};
use super::gemini::GeminiClient;
use super::ollama::OllamaClient;
use super::openai::OpenAiClient;
use super::openrouter::OpenRouterClient;
use super::vllm::VllmClient;
use crate::config::{self, ProviderConfig, ProviderConfigs};
use crate::error::{ConfigError, ProviderError, ProviderResult};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Creates the adapter matching a provider's `kind`.
pub struct ClientFactory;

impl ClientFactory {
    /// Build a client from one provider record.
    ///
    /// The API key is read from `env_var`. A missing key is only an error
    /// when the record sets `requires_auth`; otherwise the client is built
    /// keyless.
    pub fn create(config: &ProviderConfig) -> ProviderResult<Arc<dyn LlmClient>> {
        let kind = ProviderKind::parse(&config.kind)
            .ok_or_else(|| ProviderError::UnknownKind(config.kind.clone()))?;

        let api_key = config.api_key();
        if api_key.is_none() && config.requires_auth {
            return Err(ProviderError::MissingApiKey {
                env_var: config.env_var.clone(),
            });
        }

        let base = BaseClient::new(&config.base_url, api_key.as_deref())
            .with_timeout(config.timeout());

        let client: Arc<dyn LlmClient> = match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiClient::from_base(base)),
            ProviderKind::Gemini => Arc::new(GeminiClient::from_base(base)),
            ProviderKind::Ollama => Arc::new(OllamaClient::from_base(base)),
            ProviderKind::Vllm => Arc::new(VllmClient::from_base(base)),
            ProviderKind::OpenRouter => Arc::new(OpenRouterClient::from_base(
                base,
                config.app_url.as_deref(),
                config.app_title.as_deref(),
            )),
        };
        Ok(client)
    }
}

/// Registry of configured provider clients, keyed by provider name.
pub struct ProviderManager {
    configs: ProviderConfigs,
    clients: BTreeMap<String, Arc<dyn LlmClient>>,
}

impl ProviderManager {
    /// Load, parse and validate a provider config file, then build clients.
    ///
    /// Unreadable or unparseable files, a provider without any model, and any
    /// validation violation are fatal. Sections with missing fields and
    /// providers that cannot be built are skipped with a warning.
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let configs = config::get_providers_config(path)?;

        let violations = config::validate_config(&configs);
        if !violations.is_empty() {
            for violation in &violations {
                tracing::error!("Config validation error: {violation}");
            }
            return Err(ConfigError::Invalid(violations));
        }

        Ok(Self::from_configs(configs))
    }

    /// Build clients from already-parsed configuration.
    pub fn from_configs(configs: ProviderConfigs) -> Self {
        let mut clients = BTreeMap::new();

        for (name, config) in &configs {
            match ClientFactory::create(config) {
                Ok(client) => {
                    tracing::debug!("Initialized provider '{name}' ({})", client.kind());
                    clients.insert(name.clone(), client);
                }
                Err(e) => tracing::warn!("Skipping provider '{name}': {e}"),
            }
        }

        tracing::info!("Initialized {} of {} providers", clients.len(), configs.len());
        Self { configs, clients }
    }

    /// The client for `name`, or `None` if it was not configured or failed to build.
    pub fn get_client(&self, name: &str) -> Option<Arc<dyn LlmClient>> {
        self.clients.get(name).cloned()
    }

    /// Names of every successfully built provider, sorted.
    pub fn get_available_providers(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// Every built client.
    pub fn clients(&self) -> &BTreeMap<String, Arc<dyn LlmClient>> {
        &self.clients
    }

    /// The record `name` was built from.
    pub fn config(&self, name: &str) -> Option<&ProviderConfig> {
        self.configs.get(name)
    }

    /// Models offered by `name`.
    ///
    /// Providers with `fetch_models` are asked at runtime; the rest report
    /// their static `models` list.
    pub async fn resolve_models(&self, name: &str) -> ProviderResult<Vec<String>> {
        let (Some(config), Some(client)) = (self.configs.get(name), self.clients.get(name)) else {
            return Err(ProviderError::NotConfigured(name.to_string()));
        };

        if config.fetch_models {
            client.list_models().await
        } else {
            Ok(config.models.clone())
        }
    }
}
