//! aspk-ingest - AnimalSpeak audio ingestion and captioning
//!
//! `run` downloads, normalizes and captions every record of an input
//! dataset; `caption-watkins` captions a Watkins catalogue table from its
//! metadata; `recaption-watkins` cleans recording artifacts out of an
//! existing caption dataset.
//!
//! Exit status is non-zero only for configuration or input-schema problems.
//! Individual records that fail are logged and counted, never fatal.

use anyhow::{Context, Result};
use aspk_common::config::load_toml_config_or_default;
use aspk_common::logging::init_logging;
use aspk_ingest::dataset::{load_records, SpeciesCounts};
use aspk_ingest::workflow::{caption_watkins_dataset, recaption_dataset};
use aspk_ingest::{build_captioning_client, build_pipeline, ConfigOverrides, IngestConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "aspk-ingest")]
#[command(about = "Audio ingestion and captioning for the AnimalSpeak dataset")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "ASPK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest an input dataset into audio assets plus a caption dataset
    Run(RunArgs),
    /// Caption a Watkins metadata table (species, signal type, behavior...)
    CaptionWatkins(WatkinsArgs),
    /// Regenerate Watkins captions that carry recording artifacts
    RecaptionWatkins(RecaptionArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input dataset (.csv or .jsonl)
    #[arg(long)]
    input: PathBuf,

    /// Species counts table (species,count)
    #[arg(long)]
    counts: Option<PathBuf>,

    /// Output dataset (.csv or .jsonl)
    #[arg(long)]
    output: PathBuf,

    /// Directory receiving normalized audio assets
    #[arg(long, env = "ASPK_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Records processed concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Completed records between dataset snapshots
    #[arg(long)]
    checkpoint_interval: Option<usize>,

    /// Clip / chunk length in milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Maximum chunks per clip
    #[arg(long)]
    max_chunks: Option<usize>,

    /// Output sample rate in Hz
    #[arg(long)]
    resample_rate: Option<u32>,

    /// Use the lexical label check instead of location filtering
    #[arg(long)]
    no_location_filter: bool,
}

#[derive(Args, Debug)]
struct RecaptionArgs {
    /// Caption dataset to clean (.csv or .jsonl)
    #[arg(long)]
    input: PathBuf,

    /// Destination, same format as the input
    #[arg(long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct WatkinsArgs {
    /// Watkins metadata table (.csv or .jsonl)
    #[arg(long)]
    input: PathBuf,

    /// Destination with a caption column, same format as the input
    #[arg(long)]
    output: PathBuf,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            output_dir: self.output_dir.clone(),
            concurrency: self.concurrency,
            checkpoint_interval: self.checkpoint_interval,
            duration_ms: self.duration_ms,
            max_chunks: self.max_chunks,
            resample_rate: self.resample_rate,
            disable_location_filter: self.no_location_filter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = load_toml_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&toml_config.logging, "aspk_ingest")?;

    info!(
        "Starting aspk-ingest v{} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    match cli.command {
        Command::Run(args) => {
            let config = IngestConfig::resolve(&toml_config, &args.overrides());
            config.validate()?;
            let config = Arc::new(config);

            let counts = match &args.counts {
                Some(path) => SpeciesCounts::load(path)
                    .with_context(|| format!("Failed to load counts from {}", path.display()))?,
                None => SpeciesCounts::default(),
            };
            let records = load_records(&args.input, &counts)
                .with_context(|| format!("Invalid input dataset {}", args.input.display()))?;

            let pipeline = build_pipeline(Arc::clone(&config), &args.output)?;
            let summary = pipeline.run(records).await?;

            info!(
                "Run finished in {:.1}s: {} ({} rows written to {})",
                summary.duration_secs(),
                summary.counters.display_string(),
                summary.rows_written,
                args.output.display()
            );
        }
        Command::CaptionWatkins(args) => {
            let config = IngestConfig::resolve(&toml_config, &ConfigOverrides::default());
            config.validate()?;

            let captioner = build_captioning_client(&config)?;
            let summary = caption_watkins_dataset(&args.input, &args.output, &captioner)
                .await
                .with_context(|| {
                    format!("Watkins caption pass over {} failed", args.input.display())
                })?;

            info!(
                "Captioned {} of {} Watkins rows ({} fallbacks, {} skipped) into {}",
                summary.captioned,
                summary.total_rows,
                summary.fallbacks,
                summary.skipped,
                args.output.display()
            );
        }
        Command::RecaptionWatkins(args) => {
            let config = IngestConfig::resolve(&toml_config, &ConfigOverrides::default());
            config.validate()?;

            let captioner = build_captioning_client(&config)?;
            let summary = recaption_dataset(&args.input, &args.output, &captioner)
                .await
                .with_context(|| format!("Recaption pass over {} failed", args.input.display()))?;

            info!(
                "Recaptioned {} of {} rows into {}",
                summary.recaptioned,
                summary.total_rows,
                args.output.display()
            );
        }
    }

    Ok(())
}
