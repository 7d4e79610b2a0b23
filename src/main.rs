//! # Finishline CLI (`finl`)
//!
//! The `finl` binary is the primary interface for the Finishline pipeline.
//! It provides commands for validating the tabular source, bulk loading
//! into the document store, removing duplicates, recomputing per-year
//! aggregates, and running the full rebuild end to end.
//!
//! ## Usage
//!
//! ```bash
//! finl --config ./config/finishline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `finl validate` | Validate the source CSV and write the cleaned copy |
//! | `finl load` | Bulk load validated records into the raw index |
//! | `finl dedupe` | Remove duplicate documents from the raw index |
//! | `finl aggregate` | Recompute and republish per-year aggregates |
//! | `finl rebuild` | Drop, reload, dedupe, and reaggregate everything |
//! | `finl stats` | Show document counts for both indices |
//!
//! Exit code is 0 on completion, including runs with partial per-row or
//! per-batch failures (those surface in the reported counts). A non-zero
//! exit means an unrecoverable step: the store is unreachable, a required
//! collection cannot be created, or the source cannot be read.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use finishline::aggregate;
use finishline::cancel::CancelToken;
use finishline::config::{load_config, Config};
use finishline::dedupe;
use finishline::load::BulkLoader;
use finishline::progress::ProgressMode;
use finishline::rebuild;
use finishline::stats;
use finishline::store::http::HttpStore;
use finishline::store::DocumentStore;
use finishline::validate;

/// Finishline CLI — an ingestion and consistency pipeline for historical
/// race results.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/finishline.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "finl",
    about = "Finishline — an ingestion and consistency pipeline for historical race results",
    version,
    long_about = "Finishline validates and normalizes tabular race-result exports, bulk loads \
    them into an OpenSearch-compatible document store, removes duplicate records, and recomputes \
    per-year summary statistics into a separate aggregate collection."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/finishline.toml")]
    config: PathBuf,

    /// Progress reporting on stderr: human, json, or off.
    /// Defaults to human when stderr is a TTY.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProgressArg {
    Off,
    Human,
    Json,
}

impl ProgressArg {
    fn mode(self) -> ProgressMode {
        match self {
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Validate the source CSV and write the cleaned copy.
    ///
    /// Rejected rows are logged with the runner name and reason and dropped
    /// from the output; every absent field in the output is the sentinel,
    /// never blank. Does not touch the store.
    Validate,

    /// Bulk load validated records into the raw index.
    ///
    /// Append-only: repeated loads produce duplicate documents by design.
    /// Run `finl dedupe` afterwards to clean up.
    Load {
        /// Records per bulk write (overrides the configured batch size).
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Remove duplicate documents from the raw index.
    ///
    /// Keeps the first-seen document per (name, year, finish time) key.
    /// Idempotent: a second run deletes nothing.
    Dedupe,

    /// Recompute per-year aggregates and republish them.
    ///
    /// The aggregate index is dropped and recreated, then the full set is
    /// written in one bulk batch.
    Aggregate,

    /// Run the full pipeline: drop stale indices, recreate, validate,
    /// load, dedupe, reaggregate, and report final counts.
    Rebuild {
        /// Records per bulk write (overrides the configured batch size).
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Show document counts for the raw and aggregate indices.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let progress_mode = cli
        .progress
        .map(ProgressArg::mode)
        .unwrap_or_else(ProgressMode::default_for_tty);
    let progress = progress_mode.reporter();

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Warning: interrupt received, stopping at next checkpoint");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Validate => run_validate(&config),
        Commands::Load { batch_size } => {
            let store = HttpStore::new(&config.store)?;
            run_load(&config, &store, progress.as_ref(), &cancel, batch_size).await
        }
        Commands::Dedupe => {
            let store = HttpStore::new(&config.store)?;
            run_dedupe(&config, &store, progress.as_ref(), &cancel).await
        }
        Commands::Aggregate => {
            let store = HttpStore::new(&config.store)?;
            run_aggregate(&config, &store).await
        }
        Commands::Rebuild { batch_size } => {
            let store = HttpStore::new(&config.store)?;
            run_rebuild(&config, &store, progress.as_ref(), &cancel, batch_size).await
        }
        Commands::Stats => {
            let store = HttpStore::new(&config.store)?;
            stats::run_stats(&config, &store).await
        }
    }
}

fn run_validate(config: &Config) -> Result<()> {
    let report = validate::validate_csv(&config.source.input, &config.source.output)?;
    println!("validate");
    println!("  source rows: {}", report.total_rows);
    println!("  accepted: {}", report.records.len());
    println!("  rejected: {}", report.rejected);
    println!("  output: {}", config.source.output.display());
    println!("ok");
    Ok(())
}

async fn run_load(
    config: &Config,
    store: &dyn DocumentStore,
    progress: &dyn finishline::progress::ProgressReporter,
    cancel: &CancelToken,
    batch_size: Option<usize>,
) -> Result<()> {
    let records = validate::read_validated_csv(&config.source.output)?;
    let mut loader = BulkLoader::new(&config.load);
    if let Some(size) = batch_size {
        loader = loader.with_batch_size(size);
    }
    let report = loader
        .load(store, &config.store.raw_index, &records, progress, cancel)
        .await?;

    println!("load {}", config.store.raw_index);
    println!("  submitted: {}", report.submitted);
    println!("  succeeded: {}", report.succeeded);
    println!("  failed: {}", report.failed);
    println!("  batches: {}", report.batches);
    if report.cancelled {
        println!("  cancelled");
    }
    println!("ok");
    Ok(())
}

async fn run_dedupe(
    config: &Config,
    store: &dyn DocumentStore,
    progress: &dyn finishline::progress::ProgressReporter,
    cancel: &CancelToken,
) -> Result<()> {
    let report = dedupe::resolve_duplicates(
        store,
        &config.store.raw_index,
        config.load.scan_page_size,
        progress,
        cancel,
    )
    .await?;

    println!("dedupe {}", config.store.raw_index);
    println!("  scanned: {}", report.scanned);
    if report.duplicates == 0 {
        println!("  no duplicates found");
    } else {
        println!("  duplicates deleted: {}", report.deleted);
        if report.delete_failures > 0 {
            println!("  delete failures: {}", report.delete_failures);
        }
    }
    if report.cancelled {
        println!("  cancelled");
    }
    println!("ok");
    Ok(())
}

async fn run_aggregate(config: &Config, store: &dyn DocumentStore) -> Result<()> {
    let records = validate::read_validated_csv(&config.source.output)?;
    let aggregates = aggregate::compute_year_aggregates(&records);
    let outcome = aggregate::publish_aggregates(store, &config.store.agg_index, &aggregates).await?;

    println!("aggregate {}", config.store.agg_index);
    println!("  years: {}", aggregates.len());
    println!("  published: {}", outcome.succeeded);
    println!("  failed: {}", outcome.failed());
    println!("ok");
    Ok(())
}

async fn run_rebuild(
    config: &Config,
    store: &dyn DocumentStore,
    progress: &dyn finishline::progress::ProgressReporter,
    cancel: &CancelToken,
    batch_size: Option<usize>,
) -> Result<()> {
    let report = rebuild::run_rebuild(config, store, progress, cancel, batch_size).await?;

    println!("rebuild");
    println!("  source rows: {}", report.total_rows);
    println!("  rejected rows: {}", report.rejected_rows);
    println!(
        "  loaded: {} submitted, {} succeeded, {} failed",
        report.load.submitted, report.load.succeeded, report.load.failed
    );
    if report.dedupe.duplicates == 0 {
        println!("  no duplicates found");
    } else {
        println!("  duplicates deleted: {}", report.dedupe.deleted);
    }
    println!("  aggregates published: {}", report.aggregates_published);
    if report.aggregate_failures > 0 {
        println!("  aggregate failures: {}", report.aggregate_failures);
    }
    println!("  final raw index count: {}", report.raw_count);
    println!("  final aggregate index count: {}", report.agg_count);
    if report.load.cancelled || report.dedupe.cancelled {
        println!("  cancelled");
    }
    println!(
        "  finished: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("ok");
    Ok(())
}
