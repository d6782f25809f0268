//! Caption job file structs.
//!
//! A job file bundles everything a `batch-config` run needs: where the images
//! are, which provider to use, and the sampling settings.

use crate::caption::CaptionKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::DEFAULT_PROVIDER_CONFIG;

/// Root structure of a caption job file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionJobConfig {
    /// Input images
    pub input: InputSection,

    /// Provider selection
    pub provider: ProviderSection,

    /// Caption type and sampling settings
    #[serde(default)]
    pub caption: CaptionSection,

    /// Result destination
    #[serde(default)]
    pub output: OutputSection,
}

impl CaptionJobConfig {
    /// Load and validate a job file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let path = super::expand_path(path);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let job: CaptionJobConfig = toml::from_str(&content)?;
        job.validate()?;
        Ok(job)
    }
}

/// Where to find images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSection {
    /// Image file or directory
    pub path: PathBuf,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
        }
    }
}

/// Which provider runs the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSection {
    /// Provider name as declared in the provider config
    pub name: String,

    /// Provider config file
    #[serde(default = "default_provider_config")]
    pub config_file: PathBuf,

    /// Maximum in-flight requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_provider_config() -> PathBuf {
    PathBuf::from(DEFAULT_PROVIDER_CONFIG)
}

fn default_max_concurrent() -> usize {
    3
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            name: "gemini".to_string(),
            config_file: default_provider_config(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Caption type and sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSection {
    /// "graph" or "art"
    #[serde(rename = "type")]
    pub kind: CaptionKind,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling threshold
    pub top_p: f32,

    /// Repetition penalty (forwarded only to providers that accept it)
    pub repetition_penalty: f32,
}

impl Default for CaptionSection {
    fn default() -> Self {
        Self {
            kind: CaptionKind::Graph,
            max_tokens: 4096,
            temperature: 0.8,
            top_p: 0.9,
            repetition_penalty: 1.15,
        }
    }
}

/// Result destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Directory for `captions.jsonl`; stdout when unset
    pub directory: Option<PathBuf>,

    /// Also write a `job.json` snapshot of the job next to the results
    pub store_logs: bool,
}
