//! Document-store abstraction for Finishline.
//!
//! The [`DocumentStore`] trait defines the operations the pipeline issues
//! against the external store (an OpenSearch-compatible service), enabling
//! pluggable backends: the HTTP client for production and an in-memory
//! store for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes. The
//! store owns the collections; the pipeline only issues operations and must
//! tolerate the store being unavailable or partially applying a batch.

pub mod http;
pub mod memory;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Failure of a single document within a bulk operation.
#[derive(Debug, Clone)]
pub struct BulkItemError {
    /// Zero-based position of the document within the submitted batch.
    pub position: usize,
    /// Store-reported reason, for logging.
    pub reason: String,
}

/// Per-item outcome of a bulk write or bulk delete.
///
/// A partial failure is not an `Err`: the operation was applied for
/// `succeeded` documents and the rest are itemized in `errors`. Callers
/// aggregate these into their reported counts.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub succeeded: u64,
    pub errors: Vec<BulkItemError>,
}

impl BulkOutcome {
    pub fn failed(&self) -> u64 {
        self.errors.len() as u64
    }
}

/// One document returned from a scan, with its store-assigned id and the
/// projected source fields.
#[derive(Debug, Clone)]
pub struct ScanDoc {
    pub id: String,
    pub source: Value,
}

/// A bounded page of scan results.
///
/// `cursor` is `Some` while more pages remain; feed it back into
/// [`DocumentStore::scan_page`] to continue. Scan order is store-defined
/// and must be treated as arbitrary unless the backend documents otherwise.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub docs: Vec<ScanDoc>,
    pub cursor: Option<String>,
}

/// Typed store failures the pipeline reacts to specifically.
///
/// Carried inside `anyhow::Error`; callers downcast to distinguish a
/// missing collection (auto-create once, retry the batch) from transient
/// connectivity failures (retry with backoff).
#[derive(Debug)]
pub enum StoreError {
    /// The target collection does not exist.
    IndexNotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IndexNotFound(index) => write!(f, "index not found: {}", index),
        }
    }
}

impl std::error::Error for StoreError {}

/// Abstract document-store backend.
///
/// All operations are async (via `async-trait`); in-memory implementations
/// return immediately-ready futures.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`exists`](DocumentStore::exists) | Check whether a collection exists |
/// | [`create_index`](DocumentStore::create_index) | Create a collection |
/// | [`delete_index`](DocumentStore::delete_index) | Drop a collection |
/// | [`bulk_write`](DocumentStore::bulk_write) | Index a batch of documents |
/// | [`bulk_delete`](DocumentStore::bulk_delete) | Delete a batch by id |
/// | [`scan_page`](DocumentStore::scan_page) | Page through a collection |
/// | [`count`](DocumentStore::count) | Count documents in a collection |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether the collection exists.
    async fn exists(&self, index: &str) -> Result<bool>;

    /// Create the collection. Fails if it already exists.
    async fn create_index(&self, index: &str) -> Result<()>;

    /// Drop the collection. Fails with [`StoreError::IndexNotFound`] if it
    /// does not exist.
    async fn delete_index(&self, index: &str) -> Result<()>;

    /// Index a batch of documents, reporting per-item outcomes.
    async fn bulk_write(&self, index: &str, docs: &[Value]) -> Result<BulkOutcome>;

    /// Delete a batch of documents by id, reporting per-item outcomes.
    async fn bulk_delete(&self, index: &str, ids: &[String]) -> Result<BulkOutcome>;

    /// Fetch one page of documents, projecting only `fields` (all fields if
    /// empty). Pass the returned cursor back to continue the scan.
    async fn scan_page(
        &self,
        index: &str,
        fields: &[&str],
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage>;

    /// Release server-side resources held by an unfinished scan.
    ///
    /// Called with the outstanding cursor when a scan is abandoned before
    /// its final page (cancellation, error between pages); a scan that runs
    /// to completion cleans up on its own. Backends with no per-scan state
    /// keep the default no-op.
    async fn end_scan(&self, _index: &str, _cursor: &str) -> Result<()> {
        Ok(())
    }

    /// Number of documents in the collection.
    async fn count(&self, index: &str) -> Result<u64>;
}
