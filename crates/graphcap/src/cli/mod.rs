//! Command implementations.

pub mod caption;
pub mod providers;

use clap::Args;
use graphcap_core::config::{expand_path, DEFAULT_PROVIDER_CONFIG};
use std::path::PathBuf;

/// Provider config location, shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Provider config file
    #[arg(
        short = 'c',
        long = "config",
        env = "GRAPHCAP_PROVIDER_CONFIG",
        default_value = DEFAULT_PROVIDER_CONFIG
    )]
    pub path: PathBuf,
}

impl ConfigArg {
    /// The config path with `~` expanded.
    pub fn resolved(&self) -> PathBuf {
        expand_path(&self.path)
    }
}
