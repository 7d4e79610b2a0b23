//! End-to-end idempotent rebuild of both collections.
//!
//! Linear step sequence with no branching back-edges: drop stale
//! collections, recreate the raw collection, validate the source, load in
//! batches, resolve duplicates, recompute and publish aggregates, report
//! final counts. Partial per-row and per-batch failures leave the run in
//! the `Completed` state with their counts reported; a structural failure
//! (a collection that cannot be created, an unreadable source) aborts after
//! a best-effort count report.

use anyhow::{Context, Result};

use crate::aggregate;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::dedupe::{self, DedupeReport};
use crate::load::{BulkLoader, LoadReport};
use crate::progress::ProgressReporter;
use crate::store::{DocumentStore, StoreError};
use crate::validate;

/// Counts accumulated across a full rebuild.
#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    pub total_rows: u64,
    pub rejected_rows: u64,
    pub load: LoadReport,
    pub dedupe: DedupeReport,
    pub aggregates_published: u64,
    pub aggregate_failures: u64,
    pub raw_count: u64,
    pub agg_count: u64,
}

/// Drop a stale collection, tolerating its absence.
///
/// Any other deletion failure is logged and the rebuild continues; the
/// subsequent create is the step with no recovery policy.
async fn delete_stale(store: &dyn DocumentStore, index: &str) {
    match store.delete_index(index).await {
        Ok(()) => println!("deleted stale index: {}", index),
        Err(err)
            if matches!(
                err.downcast_ref::<StoreError>(),
                Some(StoreError::IndexNotFound(_))
            ) =>
        {
            println!("index {} does not exist, skipping deletion", index);
        }
        Err(err) => eprintln!("Warning: error deleting index {}: {}", index, err),
    }
}

/// Best-effort document counts for the final report. A count that cannot be
/// obtained degrades to zero with a warning instead of failing the report.
pub async fn final_counts(store: &dyn DocumentStore, raw: &str, agg: &str) -> (u64, u64) {
    let raw_count = match store.count(raw).await {
        Ok(n) => n,
        Err(err) => {
            eprintln!("Warning: could not count index {}: {}", raw, err);
            0
        }
    };
    let agg_count = match store.count(agg).await {
        Ok(n) => n,
        Err(err) => {
            eprintln!("Warning: could not count index {}: {}", agg, err);
            0
        }
    };
    (raw_count, agg_count)
}

async fn rebuild_steps(
    config: &Config,
    store: &dyn DocumentStore,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
    batch_size: Option<usize>,
) -> Result<RebuildReport> {
    let raw_index = &config.store.raw_index;
    let agg_index = &config.store.agg_index;
    let mut report = RebuildReport::default();

    delete_stale(store, raw_index).await;
    delete_stale(store, agg_index).await;

    store
        .create_index(raw_index)
        .await
        .with_context(|| format!("could not create index {}", raw_index))?;

    // Validation runs once up front: the loader and the aggregator both
    // consume the same accepted-record stream within this process.
    let validation = validate::validate_csv(&config.source.input, &config.source.output)?;
    report.total_rows = validation.total_rows;
    report.rejected_rows = validation.rejected;

    let mut loader = BulkLoader::new(&config.load);
    if let Some(size) = batch_size {
        loader = loader.with_batch_size(size);
    }
    report.load = loader
        .load(store, raw_index, &validation.records, progress, cancel)
        .await?;

    report.dedupe = dedupe::resolve_duplicates(
        store,
        raw_index,
        config.load.scan_page_size,
        progress,
        cancel,
    )
    .await?;

    let aggregates = aggregate::compute_year_aggregates(&validation.records);
    let outcome = aggregate::publish_aggregates(store, agg_index, &aggregates).await?;
    report.aggregates_published = outcome.succeeded;
    report.aggregate_failures = outcome.failed();

    Ok(report)
}

/// Run the full rebuild pipeline.
///
/// On success the returned report carries every stage's counts plus the
/// final store counts. On a structural failure the obtainable counts are
/// still reported to stderr before the error propagates (and the process
/// exits non-zero).
pub async fn run_rebuild(
    config: &Config,
    store: &dyn DocumentStore,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
    batch_size: Option<usize>,
) -> Result<RebuildReport> {
    let raw_index = &config.store.raw_index;
    let agg_index = &config.store.agg_index;

    match rebuild_steps(config, store, progress, cancel, batch_size).await {
        Ok(mut report) => {
            let (raw_count, agg_count) = final_counts(store, raw_index, agg_index).await;
            report.raw_count = raw_count;
            report.agg_count = agg_count;
            Ok(report)
        }
        Err(err) => {
            eprintln!("Warning: rebuild aborted: {}", err);
            let (raw_count, agg_count) = final_counts(store, raw_index, agg_index).await;
            eprintln!("final raw index count: {}", raw_count);
            eprintln!("final aggregate index count: {}", agg_count);
            Err(err)
        }
    }
}
