//! graphcap CLI - batch structured image captioning across LLM providers.
//!
//! Providers (OpenAI, Gemini, Ollama, vLLM, OpenRouter) are declared in a TOML
//! file; every command takes `-c/--config` to point at it.
//!
//! # Usage
//!
//! ```bash
//! # Which providers are usable?
//! graphcap list-providers
//!
//! # Caption a directory with Gemini
//! graphcap batch-caption ./images -p gemini -o captions.jsonl
//!
//! # Run a caption job file
//! graphcap batch-config job.toml
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// graphcap - structured image captions from any OpenAI-compatible provider.
#[derive(Parser, Debug)]
#[command(name = "graphcap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List providers that loaded successfully
    ListProviders(cli::ConfigArg),

    /// Check the provider config and report every problem
    ValidateConfig(cli::ConfigArg),

    /// Show the models a provider offers
    Models(cli::providers::ModelsArgs),

    /// Caption a directory of images (or a single image)
    BatchCaption(cli::caption::BatchCaptionArgs),

    /// Caption images as described by a TOML job file
    BatchConfig(cli::caption::BatchConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    tracing::debug!("graphcap v{}", graphcap_core::VERSION);

    match cli.command {
        Commands::ListProviders(args) => cli::providers::list_providers(args),
        Commands::ValidateConfig(args) => cli::providers::validate_config(args),
        Commands::Models(args) => cli::providers::models(args).await,
        Commands::BatchCaption(args) => cli::caption::batch_caption(args).await,
        Commands::BatchConfig(args) => cli::caption::batch_config(args).await,
    }
}
