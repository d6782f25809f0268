//! Provider inspection commands: `list-providers`, `validate-config`, `models`.

use super::ConfigArg;
use clap::Args;
use graphcap_core::config::{get_providers_config, validate_config as collect_violations};
use graphcap_core::ProviderManager;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Provider name as declared in the config
    pub provider: String,

    #[command(flatten)]
    pub config: ConfigArg,
}

/// Print the name of every usable provider, one per line.
pub fn list_providers(args: ConfigArg) -> anyhow::Result<()> {
    let manager = ProviderManager::new(&args.resolved())?;
    let providers = manager.get_available_providers();

    if providers.is_empty() {
        tracing::info!("No providers configured");
        return Ok(());
    }

    for name in providers {
        let kind = manager
            .get_client(&name)
            .map(|c| c.kind().to_string())
            .unwrap_or_default();
        println!("{name}\t{kind}");
    }
    Ok(())
}

/// Report every invariant violation in the config; fails if there are any.
pub fn validate_config(args: ConfigArg) -> anyhow::Result<()> {
    let path = args.resolved();
    let providers = get_providers_config(&path)?;
    let violations = collect_violations(&providers);

    if violations.is_empty() {
        println!(
            "{}: {} providers, no problems found",
            path.display(),
            providers.len()
        );
        return Ok(());
    }

    for violation in &violations {
        println!("{violation}");
    }
    anyhow::bail!(
        "{} problem(s) found in {}",
        violations.len(),
        path.display()
    )
}

/// Print the models a provider offers, marking the default with `*`.
pub async fn models(args: ModelsArgs) -> anyhow::Result<()> {
    let manager = ProviderManager::new(&args.config.resolved())?;
    let Some(config) = manager.config(&args.provider) else {
        anyhow::bail!(
            "Provider '{}' not found. Available: {}",
            args.provider,
            manager.get_available_providers().join(", ")
        );
    };
    let default_model = config.default_model.clone();

    let models = manager.resolve_models(&args.provider).await?;
    for model in models {
        let marker = if model == default_model { "*" } else { " " };
        println!("{marker} {model}");
    }
    Ok(())
}
