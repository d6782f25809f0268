//! Caption commands: `batch-caption` and `batch-config`.

use super::ConfigArg;
use clap::{Args, ValueEnum};
use graphcap_core::caption::{discover_images, CaptionKind, CaptionOptions, CaptionProcessor};
use graphcap_core::config::{
    expand_path, CaptionJobConfig, CaptionSection, InputSection, OutputSection, ProviderSection,
};
use graphcap_core::output::{prepare_output_dir, write_job_log, OutputFormat, OutputWriter};
use graphcap_core::providers::SamplingOptions;
use graphcap_core::{CaptionRecord, LlmClient, ProviderManager};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Caption type argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CaptionType {
    Graph,
    Art,
}

impl From<CaptionType> for CaptionKind {
    fn from(t: CaptionType) -> Self {
        match t {
            CaptionType::Graph => CaptionKind::Graph,
            CaptionType::Art => CaptionKind::Art,
        }
    }
}

/// Arguments for the `batch-caption` command.
#[derive(Args, Debug)]
pub struct BatchCaptionArgs {
    /// Image file or directory
    pub input: PathBuf,

    /// Provider name as declared in the config
    #[arg(short, long, default_value = "gemini")]
    pub provider: String,

    /// Output file (`.json` for an array, anything else for JSON Lines); stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum tokens to generate per caption
    #[arg(long, default_value = "4096")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[arg(long, default_value = "0.8")]
    pub temperature: f32,

    /// Nucleus sampling threshold
    #[arg(long, default_value = "0.9")]
    pub top_p: f32,

    /// Repetition penalty (only sent to providers that accept it)
    #[arg(long)]
    pub repetition_penalty: Option<f32>,

    #[command(flatten)]
    pub config: ConfigArg,

    /// Caption type
    #[arg(short = 't', long = "caption-type", value_enum, default_value = "graph")]
    pub caption_type: CaptionType,

    /// Maximum concurrent requests
    #[arg(long, default_value = "3")]
    pub max_concurrent: usize,

    /// Model to use (defaults to the provider's default_model)
    #[arg(long)]
    pub model: Option<String>,
}

/// Arguments for the `batch-config` command.
#[derive(Args, Debug)]
pub struct BatchConfigArgs {
    /// Caption job file
    pub job_file: PathBuf,
}

/// Run `batch-caption`.
pub async fn batch_caption(args: BatchCaptionArgs) -> anyhow::Result<()> {
    let caption = CaptionSection {
        kind: args.caption_type.into(),
        max_tokens: args.max_tokens,
        temperature: args.temperature,
        top_p: args.top_p,
        repetition_penalty: args.repetition_penalty.unwrap_or_default(),
    };
    let job = CaptionJobConfig {
        input: InputSection {
            path: expand_path(&args.input),
        },
        provider: ProviderSection {
            name: args.provider,
            config_file: args.config.resolved(),
            max_concurrent: args.max_concurrent,
        },
        caption,
        output: OutputSection::default(),
    };
    job.validate()?;

    let mut sampling = sampling_options(&job);
    sampling.repetition_penalty = args.repetition_penalty;

    let output = args.output.map(|p| expand_path(&p));
    run_job(&job, sampling, args.model, output.as_deref()).await
}

/// Run `batch-config`.
pub async fn batch_config(args: BatchConfigArgs) -> anyhow::Result<()> {
    let job = CaptionJobConfig::load_from(&args.job_file)?;
    tracing::info!("Loaded caption job from {:?}", args.job_file);

    let output = match &job.output.directory {
        Some(dir) => {
            let dir = expand_path(dir);
            if job.output.store_logs {
                let log = write_job_log(&dir, &job)?;
                tracing::info!("Job snapshot written to {:?}", log);
            }
            Some(prepare_output_dir(&dir)?)
        }
        None => None,
    };

    run_job(&job, sampling_options(&job), None, output.as_deref()).await
}

fn sampling_options(job: &CaptionJobConfig) -> SamplingOptions {
    SamplingOptions::default()
        .max_tokens(job.caption.max_tokens)
        .temperature(job.caption.temperature)
        .top_p(job.caption.top_p)
        .repetition_penalty(job.caption.repetition_penalty)
}

/// Caption every image of a job, streaming records to `output` (or stdout).
async fn run_job(
    job: &CaptionJobConfig,
    sampling: SamplingOptions,
    model: Option<String>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let provider = job.provider.name.as_str();
    let manager = ProviderManager::new(&expand_path(&job.provider.config_file))?;

    let (Some(client), Some(provider_config)) =
        (manager.get_client(provider), manager.config(provider))
    else {
        anyhow::bail!(
            "Provider '{provider}' not found. Available: {}",
            manager.get_available_providers().join(", ")
        );
    };

    if !client.is_available().await {
        tracing::warn!("Provider '{provider}' did not answer its availability check, requests may fail");
    }

    let images = discover_images(&job.input.path);
    if images.is_empty() {
        anyhow::bail!("No image files found at {:?}", job.input.path);
    }
    tracing::info!("Found {} images to process", images.len());

    let options = CaptionOptions {
        kind: job.caption.kind,
        model: model.unwrap_or_else(|| provider_config.default_model.clone()),
        sampling,
        max_concurrent: job.provider.max_concurrent,
        timeout_ms: provider_config.timeout_secs.saturating_mul(1000),
        ..CaptionOptions::default()
    };
    let processor = CaptionProcessor::new(client, provider, options);

    let (sink, format): (Box<dyn Write + Send>, OutputFormat) = match output {
        Some(path) => (
            Box::new(BufWriter::new(File::create(path)?)),
            OutputFormat::from_path(path),
        ),
        None => (Box::new(std::io::stdout()), OutputFormat::JsonLines),
    };
    let mut writer = OutputWriter::new(sink, format);

    let progress = create_progress_bar(images.len() as u64);
    let start_time = Instant::now();

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<CaptionRecord>();
    let handle = tokio::spawn(async move {
        processor
            .process_batch(&images, move |record| {
                let _ = tx.send(record);
            })
            .await
    });

    write_records(rx, &mut writer, &handle, |written| {
        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            progress.set_message(format!("{:.2} img/sec", written as f64 / elapsed));
        }
    })
    .await?;

    let (succeeded, failed) = handle.await?;
    writer.finish()?;
    progress.finish_and_clear();

    if let Some(path) = output {
        tracing::info!("Results written to {:?}", path);
    }
    print_summary(succeeded, failed, start_time.elapsed());

    if succeeded == 0 && failed > 0 {
        anyhow::bail!("All {failed} captions failed");
    }
    Ok(())
}

/// Write records as the processor emits them.
///
/// On a write failure the processor task is aborted before the error is
/// returned.
async fn write_records<W: Write>(
    mut rx: UnboundedReceiver<CaptionRecord>,
    writer: &mut OutputWriter<W>,
    processor: &JoinHandle<(usize, usize)>,
    mut on_written: impl FnMut(usize),
) -> anyhow::Result<()> {
    while let Some(record) = rx.recv().await {
        if let Err(e) = writer.write(&record) {
            processor.abort();
            return Err(e.into());
        }
        on_written(writer.items_written());
    }
    Ok(())
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a summary table to stderr after a caption run.
fn print_summary(succeeded: usize, failed: usize, elapsed: std::time::Duration) {
    let total = succeeded + failed;
    let rate = if elapsed.as_secs_f64() > 0.0 {
        total as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("           Caption summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", succeeded);
    if failed > 0 {
        eprintln!("    Failed:       {:>8}", failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.2} img/sec", rate);
    eprintln!("  ====================================");
}
