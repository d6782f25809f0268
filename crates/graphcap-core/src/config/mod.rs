//! Provider configuration.
//!
//! Providers are declared in a TOML file, one top-level table per provider:
//!
//! ```toml
//! [gemini]
//! kind = "gemini"
//! environment = "cloud"
//! env_var = "GOOGLE_API_KEY"
//! base_url = "https://generativelanguage.googleapis.com/v1beta/openai"
//! models = ["gemini-2.0-flash-exp"]
//! ```
//!
//! Sections are interpreted one at a time so a single broken provider block
//! does not take the rest of the file down with it. Top-level entries that are
//! not tables are ignored.

mod types;
mod validate;

pub use types::*;
pub use validate::validate_config;

use crate::error::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default provider config file, relative to the working directory.
pub const DEFAULT_PROVIDER_CONFIG: &str = "provider.config.toml";

/// Default per-request timeout for provider calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Provider configurations keyed by provider name.
pub type ProviderConfigs = BTreeMap<String, ProviderConfig>;

/// Deployment environment of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Cloud,
    Local,
}

impl Environment {
    /// Parse an environment name (case-sensitive, as written in config).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cloud" => Some(Self::Cloud),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Configuration for a single provider.
///
/// `kind` and `environment` are kept as written so that `validate_config` can
/// report bad values alongside every other violation instead of failing early.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderConfig {
    /// Vendor identifier ("openai", "gemini", "ollama", "vllm", "openrouter")
    pub kind: String,

    /// "cloud" or "local"
    pub environment: String,

    /// Name of the environment variable holding the API key
    pub env_var: String,

    /// Endpoint root, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Statically declared models
    pub models: Vec<String>,

    /// Model used when the caller does not pick one
    pub default_model: String,

    /// Discover models at runtime instead of using `models`
    pub fetch_models: bool,

    /// Skip this provider when its API key is missing
    pub requires_auth: bool,

    /// App URL sent to OpenRouter as `HTTP-Referer`
    pub app_url: Option<String>,

    /// App title sent to OpenRouter as `X-Title`
    pub app_title: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// The parsed environment, if it is one of the known values.
    pub fn environment(&self) -> Option<Environment> {
        Environment::parse(&self.environment)
    }

    /// Read the API key from the configured environment variable.
    ///
    /// Unset and empty variables both yield `None`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.env_var).ok().filter(|v| !v.is_empty())
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Why a provider section was left out of the loaded configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("must specify default_model when no models list is provided")]
    MissingDefaultModel,
}

/// A provider section that was skipped while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedProvider {
    pub name: String,
    pub reason: SectionError,
}

/// Result of parsing a raw config table.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    /// Successfully parsed providers
    pub providers: ProviderConfigs,

    /// Sections skipped because of missing or mistyped fields
    pub skipped: Vec<SkippedProvider>,
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

/// Load the raw TOML table from a config file.
pub fn load_provider_config(path: &Path) -> Result<toml::Table, ConfigError> {
    let path = expand_path(path);
    if !path.exists() {
        return Err(ConfigError::NotFound(path));
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

/// Parse every provider section of a raw config table.
///
/// Sections with missing or mistyped required fields are skipped with a
/// warning. A section that has neither `default_model` nor `models` fails the
/// whole load.
pub fn parse_providers(raw: &toml::Table) -> Result<ParsedConfig, ConfigError> {
    let mut parsed = ParsedConfig::default();

    for (name, value) in raw {
        let Some(section) = value.as_table() else {
            continue;
        };

        match parse_provider(section) {
            Ok(config) => {
                parsed.providers.insert(name.clone(), config);
            }
            Err(SectionError::MissingDefaultModel) => {
                return Err(ConfigError::MissingDefaultModel {
                    provider: name.clone(),
                });
            }
            Err(reason) => {
                tracing::warn!("Skipping provider '{name}': {reason}");
                parsed.skipped.push(SkippedProvider {
                    name: name.clone(),
                    reason,
                });
            }
        }
    }

    tracing::info!("Loaded {} providers", parsed.providers.len());
    tracing::debug!("Providers: {:?}", parsed.providers.keys().collect::<Vec<_>>());
    Ok(parsed)
}

/// Load and parse a provider config file.
pub fn get_providers_config(path: &Path) -> Result<ProviderConfigs, ConfigError> {
    let raw = load_provider_config(path)?;
    Ok(parse_providers(&raw)?.providers)
}

/// Parse a single provider section.
///
/// The default model is resolved before the required-field checks: a section
/// without any model information is a hard error even if it is also missing
/// other fields.
pub fn parse_provider(section: &toml::Table) -> Result<ProviderConfig, SectionError> {
    let models = string_list(section, "models")?;
    let default_model = match optional_str(section, "default_model")?.filter(|m| !m.is_empty()) {
        Some(model) => model,
        None => match models.first() {
            Some(first) => {
                tracing::debug!("Using first model as default: {first}");
                first.clone()
            }
            None => return Err(SectionError::MissingDefaultModel),
        },
    };

    let timeout_secs = match section.get("timeout_secs") {
        None => DEFAULT_TIMEOUT_SECS,
        Some(value) => value
            .as_integer()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or(SectionError::WrongType {
                field: "timeout_secs",
                expected: "a non-negative integer",
            })?,
    };

    Ok(ProviderConfig {
        kind: required_str(section, "kind")?,
        environment: required_str(section, "environment")?,
        env_var: required_str(section, "env_var")?,
        base_url: required_str(section, "base_url")?,
        models,
        default_model,
        fetch_models: optional_bool(section, "fetch_models")?.unwrap_or(false),
        requires_auth: optional_bool(section, "requires_auth")?.unwrap_or(false),
        app_url: optional_str(section, "app_url")?,
        app_title: optional_str(section, "app_title")?,
        timeout_secs,
    })
}

fn required_str(section: &toml::Table, field: &'static str) -> Result<String, SectionError> {
    optional_str(section, field)?.ok_or(SectionError::MissingField(field))
}

fn optional_str(section: &toml::Table, field: &'static str) -> Result<Option<String>, SectionError> {
    match section.get(field) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or(SectionError::WrongType {
                field,
                expected: "a string",
            }),
    }
}

fn optional_bool(section: &toml::Table, field: &'static str) -> Result<Option<bool>, SectionError> {
    match section.get(field) {
        None => Ok(None),
        Some(value) => value.as_bool().map(Some).ok_or(SectionError::WrongType {
            field,
            expected: "a boolean",
        }),
    }
}

fn string_list(section: &toml::Table, field: &'static str) -> Result<Vec<String>, SectionError> {
    let wrong_type = SectionError::WrongType {
        field,
        expected: "an array of strings",
    };
    match section.get(field) {
        None => Ok(Vec::new()),
        Some(value) => {
            let items = value.as_array().ok_or(wrong_type.clone())?;
            items
                .iter()
                .map(|item| item.as_str().map(String::from).ok_or(wrong_type.clone()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(src: &str) -> toml::Table {
        toml::from_str(src).unwrap()
    }

    const OPENAI: &str = r#"
        [openai]
        kind = "openai"
        environment = "cloud"
        env_var = "OPENAI_API_KEY"
        base_url = "https://api.openai.com/v1"
        models = ["gpt-4o", "gpt-4o-mini"]
        default_model = "gpt-4o-mini"
    "#;

    #[test]
    fn test_parse_explicit_default_model() {
        let parsed = parse_providers(&table(OPENAI)).unwrap();
        let openai = &parsed.providers["openai"];
        assert_eq!(openai.kind, "openai");
        assert_eq!(openai.environment(), Some(Environment::Cloud));
        assert_eq!(openai.models, vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(openai.default_model, "gpt-4o-mini");
        assert!(!openai.fetch_models);
        assert!(!openai.requires_auth);
        assert_eq!(openai.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_default_model_falls_back_to_first_model() {
        let raw = table(
            r#"
            [p]
            kind = "openai"
            environment = "cloud"
            env_var = "KEY"
            base_url = "https://x"
            models = ["a", "b"]
            "#,
        );
        let parsed = parse_providers(&raw).unwrap();
        assert_eq!(parsed.providers["p"].default_model, "a");
    }

    #[test]
    fn test_missing_default_model_and_models_fails() {
        let raw = table(
            r#"
            [ollama]
            kind = "ollama"
            environment = "local"
            env_var = "CUSTOM_KEY"
            base_url = "http://localhost:11434"
            fetch_models = true
            "#,
        );
        let err = parse_providers(&raw).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingDefaultModel { ref provider } if provider == "ollama")
        );
    }

    #[test]
    fn test_fetch_models_with_default_model() {
        let raw = table(
            r#"
            [ollama]
            kind = "ollama"
            environment = "local"
            env_var = "CUSTOM_KEY"
            base_url = "http://localhost:11434"
            fetch_models = true
            default_model = "llama3.2-vision"
            "#,
        );
        let parsed = parse_providers(&raw).unwrap();
        let ollama = &parsed.providers["ollama"];
        assert!(ollama.models.is_empty());
        assert!(ollama.fetch_models);
        assert_eq!(ollama.default_model, "llama3.2-vision");
    }

    #[test]
    fn test_missing_required_field_skips_section() {
        let src = format!(
            "{OPENAI}\n{}",
            r#"
            [broken]
            kind = "gemini"
            environment = "cloud"
            env_var = "GOOGLE_API_KEY"
            models = ["gemini-2.0-flash-exp"]
            "#
        );
        let parsed = parse_providers(&table(&src)).unwrap();
        assert!(parsed.providers.contains_key("openai"));
        assert!(!parsed.providers.contains_key("broken"));
        assert_eq!(
            parsed.skipped,
            vec![SkippedProvider {
                name: "broken".to_string(),
                reason: SectionError::MissingField("base_url"),
            }]
        );
    }

    #[test]
    fn test_wrong_type_skips_section() {
        let raw = table(
            r#"
            [p]
            kind = "openai"
            environment = "cloud"
            env_var = "KEY"
            base_url = "https://x"
            models = ["a"]
            fetch_models = "yes"
            "#,
        );
        let parsed = parse_providers(&raw).unwrap();
        assert!(parsed.providers.is_empty());
        assert_eq!(
            parsed.skipped[0].reason,
            SectionError::WrongType {
                field: "fetch_models",
                expected: "a boolean"
            }
        );
    }

    #[test]
    fn test_non_table_entries_ignored() {
        let src = format!("version = 2\ntitle = \"providers\"\n{OPENAI}");
        let parsed = parse_providers(&table(&src)).unwrap();
        assert_eq!(parsed.providers.len(), 1);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_optional_openrouter_fields() {
        let raw = table(
            r#"
            [openrouter]
            kind = "openrouter"
            environment = "cloud"
            env_var = "OPENROUTER_API_KEY"
            base_url = "https://openrouter.ai/api/v1"
            models = ["openai/gpt-4o-mini"]
            requires_auth = true
            app_url = "https://example.com"
            app_title = "graphcap"
            timeout_secs = 30
            "#,
        );
        let parsed = parse_providers(&raw).unwrap();
        let openrouter = &parsed.providers["openrouter"];
        assert!(openrouter.requires_auth);
        assert_eq!(openrouter.app_url.as_deref(), Some("https://example.com"));
        assert_eq!(openrouter.app_title.as_deref(), Some("graphcap"));
        assert_eq!(openrouter.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_provider_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[openai\nkind = ").unwrap();
        let err = load_provider_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_get_providers_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{OPENAI}").unwrap();
        let providers = get_providers_config(file.path()).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers["openai"].base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_api_key_empty_is_none() {
        let mut config = parse_providers(&table(OPENAI)).unwrap().providers["openai"].clone();
        config.env_var = "GRAPHCAP_TEST_DEFINITELY_UNSET_KEY".to_string();
        assert_eq!(config.api_key(), None);
    }
}
