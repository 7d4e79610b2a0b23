//! HTTP [`DocumentStore`] client for OpenSearch-compatible services.
//!
//! Talks to the store's REST API with `reqwest`: index lifecycle via
//! HEAD/PUT/DELETE, batched writes and deletes via `_bulk` NDJSON with
//! per-item error parsing, paged scans via the scroll API with `_source`
//! projection, and `_count`.
//!
//! Credentials are passed through as HTTP basic auth; the per-call timeout
//! comes from configuration and applies to every request.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use crate::config::StoreConfig;

use super::{BulkItemError, BulkOutcome, DocumentStore, ScanDoc, ScanPage, StoreError};

/// How long the server keeps a scroll context alive between pages.
const SCROLL_KEEPALIVE: &str = "2m";

pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(ref user) = self.username {
            req = req.basic_auth(user, self.password.as_deref());
        }
        req
    }

    /// Submit an NDJSON `_bulk` body and fold the per-item results.
    ///
    /// `action` names the result key inside each item ("index" or "delete").
    async fn submit_bulk(&self, index: &str, body: String, action: &str) -> Result<BulkOutcome> {
        let response = self
            .request(Method::POST, "_bulk")
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .context("bulk request failed")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("bulk request returned {}: {}", status, body);
        }

        let parsed: Value = response
            .json()
            .await
            .context("bulk response was not valid JSON")?;

        let items = parsed
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("bulk response missing items array"))?;

        let mut outcome = BulkOutcome::default();
        let mut missing_index = 0usize;
        for (position, item) in items.iter().enumerate() {
            let result = item
                .get(action)
                .ok_or_else(|| anyhow!("bulk item missing '{}' result", action))?;
            let item_status = result.get("status").and_then(Value::as_u64).unwrap_or(0);
            if (200..300).contains(&item_status) {
                outcome.succeeded += 1;
            } else {
                let error = result.get("error");
                let kind = error
                    .and_then(|e| e.get("type"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if kind == "index_not_found_exception" {
                    missing_index += 1;
                }
                let reason = error
                    .and_then(|e| e.get("reason"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                outcome.errors.push(BulkItemError {
                    position,
                    reason: format!("status {}: {}", item_status, reason),
                });
            }
        }

        // Every item bounced off a missing index: surface it as the typed
        // error so the loader can create the collection and retry the batch.
        if missing_index == items.len() && !items.is_empty() {
            return Err(StoreError::IndexNotFound(index.to_string()).into());
        }

        Ok(outcome)
    }

    /// Drop a server-side scroll context so it does not linger until the
    /// keepalive expires.
    async fn delete_scroll(&self, scroll_id: &str) -> Result<()> {
        self.request(Method::DELETE, "_search/scroll")
            .json(&json!({ "scroll_id": scroll_id }))
            .send()
            .await
            .context("scroll cleanup failed")?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn exists(&self, index: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, index)
            .send()
            .await
            .with_context(|| format!("exists check failed for index {}", index))?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => bail!("exists check for {} returned {}", index, status),
        }
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        let response = self
            .request(Method::PUT, index)
            .send()
            .await
            .with_context(|| format!("create failed for index {}", index))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("create index {} returned {}: {}", index, status, body);
        }
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, index)
            .send()
            .await
            .with_context(|| format!("delete failed for index {}", index))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("delete index {} returned {}: {}", index, status, body);
        }
        Ok(())
    }

    async fn bulk_write(&self, index: &str, docs: &[Value]) -> Result<BulkOutcome> {
        if docs.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let mut body = String::new();
        for doc in docs {
            body.push_str(&json!({ "index": { "_index": index } }).to_string());
            body.push('\n');
            body.push_str(&doc.to_string());
            body.push('\n');
        }
        self.submit_bulk(index, body, "index").await
    }

    async fn bulk_delete(&self, index: &str, ids: &[String]) -> Result<BulkOutcome> {
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let mut body = String::new();
        for id in ids {
            body.push_str(&json!({ "delete": { "_index": index, "_id": id } }).to_string());
            body.push('\n');
        }
        self.submit_bulk(index, body, "delete").await
    }

    async fn scan_page(
        &self,
        index: &str,
        fields: &[&str],
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage> {
        let response = match cursor {
            None => {
                let source: Value = if fields.is_empty() {
                    json!(true)
                } else {
                    json!(fields)
                };
                self.request(Method::POST, &format!("{}/_search", index))
                    .query(&[("scroll", SCROLL_KEEPALIVE)])
                    .json(&json!({
                        "size": page_size,
                        "_source": source,
                        "query": { "match_all": {} },
                    }))
                    .send()
                    .await
                    .with_context(|| format!("scan failed for index {}", index))?
            }
            Some(scroll_id) => self
                .request(Method::POST, "_search/scroll")
                .json(&json!({
                    "scroll": SCROLL_KEEPALIVE,
                    "scroll_id": scroll_id,
                }))
                .send()
                .await
                .context("scroll continuation failed")?,
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("scan of {} returned {}: {}", index, status, body);
        }

        let parsed: Value = response
            .json()
            .await
            .context("scan response was not valid JSON")?;

        let scroll_id = parsed
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let hits = parsed
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("scan response missing hits"))?;

        let docs: Vec<ScanDoc> = hits
            .iter()
            .filter_map(|hit| {
                let id = hit.get("_id").and_then(Value::as_str)?.to_string();
                let source = hit.get("_source").cloned().unwrap_or(json!({}));
                Some(ScanDoc { id, source })
            })
            .collect();

        // The scroll is exhausted when a page comes back empty; clean up the
        // server-side context then.
        let cursor = if docs.is_empty() {
            if let Some(ref id) = scroll_id {
                let _ = self.delete_scroll(id).await;
            }
            None
        } else {
            scroll_id
        };

        Ok(ScanPage { docs, cursor })
    }

    async fn end_scan(&self, _index: &str, cursor: &str) -> Result<()> {
        self.delete_scroll(cursor).await
    }

    async fn count(&self, index: &str) -> Result<u64> {
        let response = self
            .request(Method::GET, &format!("{}/_count", index))
            .send()
            .await
            .with_context(|| format!("count failed for index {}", index))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()).into());
        }
        if !status.is_success() {
            bail!("count of {} returned {}", index, status);
        }
        let parsed: Value = response
            .json()
            .await
            .context("count response was not valid JSON")?;
        parsed
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("count response missing count field"))
    }
}
