//! Full-corpus duplicate detection and removal.
//!
//! Streams the raw collection page by page, projecting only the three key
//! fields, and remembers the fingerprint of every [`RecordKey`] seen, so
//! each seen-set entry costs one fixed-size digest regardless of how long
//! the name and time strings are. A document whose key was already seen is
//! queued for deletion; the queue is flushed as one bulk delete at the end
//! of the scan. First seen wins — the tie-break is store scan order, which
//! is treated as arbitrary.
//!
//! The pass is idempotent: re-running it on an already-deduplicated
//! collection deletes nothing.

use std::collections::HashSet;

use anyhow::Result;

use crate::cancel::CancelToken;
use crate::models::RecordKey;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::DocumentStore;

/// Fields projected during the scan; everything else stays on the server.
const KEY_FIELDS: [&str; 3] = ["name", "year", "finish_time"];

/// Final counts for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct DedupeReport {
    pub scanned: u64,
    /// Documents queued for deletion (later occurrences of a seen key).
    pub duplicates: u64,
    pub deleted: u64,
    pub delete_failures: u64,
    /// True when the scan stopped at a cancellation checkpoint; no deletes
    /// are issued for a cancelled scan.
    pub cancelled: bool,
}

/// Remove all but the first-seen document per uniqueness key.
///
/// Not safe against concurrent writers: a duplicate written after the scan
/// passes its position will survive until the next run.
pub async fn resolve_duplicates(
    store: &dyn DocumentStore,
    index: &str,
    page_size: usize,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<DedupeReport> {
    let mut report = DedupeReport::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut to_delete: Vec<String> = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            eprintln!(
                "Warning: duplicate scan cancelled after {} documents",
                report.scanned
            );
            if let Some(ref c) = cursor {
                let _ = store.end_scan(index, c).await;
            }
            report.cancelled = true;
            return Ok(report);
        }

        let page = match store
            .scan_page(index, &KEY_FIELDS, cursor.as_deref(), page_size)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                if let Some(ref c) = cursor {
                    let _ = store.end_scan(index, c).await;
                }
                return Err(err);
            }
        };

        for doc in &page.docs {
            let fingerprint = RecordKey::from_document(&doc.source).fingerprint();
            if seen.contains(&fingerprint) {
                to_delete.push(doc.id.clone());
            } else {
                seen.insert(fingerprint);
            }
            report.scanned += 1;
        }

        progress.report(ProgressEvent::Scanning {
            index: index.to_string(),
            n: report.scanned,
        });

        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    report.duplicates = to_delete.len() as u64;
    if to_delete.is_empty() {
        return Ok(report);
    }

    let outcome = store.bulk_delete(index, &to_delete).await?;
    report.deleted = outcome.succeeded;
    report.delete_failures = outcome.failed();
    if report.delete_failures > 0 {
        eprintln!(
            "Warning: {} duplicates failed to delete",
            report.delete_failures
        );
    }

    Ok(report)
}
