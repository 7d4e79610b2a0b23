//! Batched bulk loading of validated records into the raw collection.
//!
//! The loader is append-only by design: it never deduplicates, and repeated
//! runs against a non-empty collection produce duplicate documents. Cleanup
//! belongs to the duplicate resolver, as a separate explicit pass.

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::config::LoadConfig;
use crate::models::RawRecord;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::{DocumentStore, StoreError};

/// Final counts for one load run. A partial failure is reflected here, not
/// raised as an error.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub batches: u64,
    /// True when the run stopped at a cancellation checkpoint; counts cover
    /// the batches attempted before the stop.
    pub cancelled: bool,
}

/// Streams records to the store in bounded batches with bounded retry.
pub struct BulkLoader {
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl BulkLoader {
    pub fn new(config: &LoadConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Load all records into `index`, one bulk write per batch.
    ///
    /// Per-document failures are counted and logged with their batch number
    /// and the run continues. A batch-level error (connectivity, timeout) is
    /// retried with exponential backoff; when retries exhaust, the whole
    /// batch counts as failed and the next batch still runs. A missing
    /// target collection is created once per run, then the current batch is
    /// retried.
    pub async fn load(
        &self,
        store: &dyn DocumentStore,
        index: &str,
        records: &[RawRecord],
        progress: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<LoadReport> {
        let total = records.len() as u64;
        let mut report = LoadReport::default();
        let mut created_index = false;

        for (batch_no, batch) in records.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                eprintln!("Warning: load cancelled after {} batches", report.batches);
                report.cancelled = true;
                break;
            }

            let docs: Vec<Value> = batch.iter().map(RawRecord::to_document).collect();
            report.batches += 1;
            report.submitted += docs.len() as u64;

            let mut attempt: u32 = 0;
            loop {
                match store.bulk_write(index, &docs).await {
                    Ok(outcome) => {
                        report.succeeded += outcome.succeeded;
                        report.failed += outcome.failed();
                        if !outcome.errors.is_empty() {
                            eprintln!(
                                "Warning: {} documents failed in batch {}",
                                outcome.errors.len(),
                                batch_no + 1
                            );
                        }
                        break;
                    }
                    Err(err) => {
                        let index_missing = matches!(
                            err.downcast_ref::<StoreError>(),
                            Some(StoreError::IndexNotFound(_))
                        );
                        if index_missing && !created_index {
                            eprintln!(
                                "Warning: index {} missing, creating it and retrying batch {}",
                                index,
                                batch_no + 1
                            );
                            store.create_index(index).await?;
                            created_index = true;
                            continue;
                        }
                        if attempt < self.max_retries {
                            attempt += 1;
                            let backoff = self.retry_backoff * 2u32.saturating_pow(attempt - 1);
                            eprintln!(
                                "Warning: batch {} failed ({}), retry {}/{} in {:?}",
                                batch_no + 1,
                                err,
                                attempt,
                                self.max_retries,
                                backoff
                            );
                            tokio::time::sleep(backoff).await;
                            continue;
                        }
                        eprintln!(
                            "Warning: batch {} failed after {} retries: {}",
                            batch_no + 1,
                            self.max_retries,
                            err
                        );
                        report.failed += docs.len() as u64;
                        break;
                    }
                }
            }

            progress.report(ProgressEvent::Loading {
                index: index.to_string(),
                n: report.submitted,
                total,
            });
        }

        Ok(report)
    }
}
