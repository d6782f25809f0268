//! Configuration validation.
//!
//! Provider invariants are collected rather than raised so a caller can show
//! every problem in a hand-edited file at once. Caption job files use range
//! checks that fail on the first bad value.

use crate::error::ConfigError;

use super::{CaptionJobConfig, Environment, ProviderConfigs};

/// Check every provider against the configuration invariants.
///
/// Returns one human-readable message per violation, prefixed with the
/// provider name. An empty list means the configuration is valid.
pub fn validate_config(providers: &ProviderConfigs) -> Vec<String> {
    let mut errors = Vec::new();

    for (name, provider) in providers {
        if provider.env_var.is_empty() {
            errors.push(format!("{name}: Missing env_var"));
        }
        if provider.base_url.is_empty() {
            errors.push(format!("{name}: Missing base URL"));
        }
        if provider.kind.is_empty() {
            errors.push(format!("{name}: Missing kind"));
        }
        if provider.environment.is_empty() {
            errors.push(format!("{name}: Missing environment"));
        }
        if provider.default_model.is_empty() {
            errors.push(format!("{name}: Missing default_model"));
        }

        if Environment::parse(&provider.environment).is_none() {
            errors.push(format!("{name}: Environment must be 'cloud' or 'local'"));
        }

        if !provider.base_url.is_empty()
            && !(provider.base_url.starts_with("http://")
                || provider.base_url.starts_with("https://"))
        {
            errors.push(format!(
                "{name}: Base URL must start with http:// or https://"
            ));
        }

        if !provider.fetch_models && provider.models.is_empty() {
            errors.push(format!(
                "{name}: Must specify models list when fetch_models is False"
            ));
        }
    }

    errors
}

impl CaptionJobConfig {
    /// Validate job values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caption.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "caption.max_tokens must be a positive integer".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.caption.temperature) {
            return Err(ConfigError::Validation(
                "caption.temperature must be between 0 and 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.caption.top_p) {
            return Err(ConfigError::Validation(
                "caption.top_p must be between 0 and 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.caption.repetition_penalty) {
            return Err(ConfigError::Validation(
                "caption.repetition_penalty must be between 0 and 2".into(),
            ));
        }
        if self.provider.max_concurrent == 0 {
            return Err(ConfigError::Validation(
                "provider.max_concurrent must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}
