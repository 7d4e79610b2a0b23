//! In-memory [`DocumentStore`] implementation for testing.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Scan order is insertion order, and scan cursors are plain offsets into
//! the collection's document vector.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{BulkOutcome, DocumentStore, ScanDoc, ScanPage, StoreError};

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    indices: RwLock<HashMap<String, Vec<(String, Value)>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents currently in a collection, in insertion order.
    /// Test helper; not part of the store contract.
    pub fn documents(&self, index: &str) -> Vec<Value> {
        let indices = self.indices.read().unwrap();
        indices
            .get(index)
            .map(|docs| docs.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }
}

fn project(source: &Value, fields: &[&str]) -> Value {
    if fields.is_empty() {
        return source.clone();
    }
    let mut out = serde_json::Map::new();
    if let Some(obj) = source.as_object() {
        for field in fields {
            if let Some(v) = obj.get(*field) {
                out.insert((*field).to_string(), v.clone());
            }
        }
    }
    Value::Object(out)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn exists(&self, index: &str) -> Result<bool> {
        Ok(self.indices.read().unwrap().contains_key(index))
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        let mut indices = self.indices.write().unwrap();
        if indices.contains_key(index) {
            return Err(anyhow!("index already exists: {}", index));
        }
        indices.insert(index.to_string(), Vec::new());
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let mut indices = self.indices.write().unwrap();
        if indices.remove(index).is_none() {
            return Err(StoreError::IndexNotFound(index.to_string()).into());
        }
        Ok(())
    }

    async fn bulk_write(&self, index: &str, docs: &[Value]) -> Result<BulkOutcome> {
        let mut indices = self.indices.write().unwrap();
        let stored = indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        for doc in docs {
            stored.push((Uuid::new_v4().to_string(), doc.clone()));
        }
        Ok(BulkOutcome {
            succeeded: docs.len() as u64,
            errors: Vec::new(),
        })
    }

    async fn bulk_delete(&self, index: &str, ids: &[String]) -> Result<BulkOutcome> {
        let mut indices = self.indices.write().unwrap();
        let stored = indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        let mut outcome = BulkOutcome::default();
        for (position, id) in ids.iter().enumerate() {
            let before = stored.len();
            stored.retain(|(doc_id, _)| doc_id != id);
            if stored.len() < before {
                outcome.succeeded += 1;
            } else {
                outcome.errors.push(super::BulkItemError {
                    position,
                    reason: format!("document not found: {}", id),
                });
            }
        }
        Ok(outcome)
    }

    async fn scan_page(
        &self,
        index: &str,
        fields: &[&str],
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage> {
        let indices = self.indices.read().unwrap();
        let stored = indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let offset: usize = match cursor {
            Some(c) => c.parse().map_err(|_| anyhow!("invalid scan cursor: {}", c))?,
            None => 0,
        };

        let end = (offset + page_size).min(stored.len());
        let docs = stored[offset.min(stored.len())..end]
            .iter()
            .map(|(id, doc)| ScanDoc {
                id: id.clone(),
                source: project(doc, fields),
            })
            .collect();

        let cursor = if end < stored.len() {
            Some(end.to_string())
        } else {
            None
        };

        Ok(ScanPage { docs, cursor })
    }

    async fn count(&self, index: &str) -> Result<u64> {
        let indices = self.indices.read().unwrap();
        let stored = indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        Ok(stored.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_write_count() {
        let store = InMemoryStore::new();
        store.create_index("runs").await.unwrap();
        let outcome = store
            .bulk_write("runs", &[json!({"a": 1}), json!({"a": 2})])
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(store.count("runs").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_to_missing_index_is_typed() {
        let store = InMemoryStore::new();
        let err = store.bulk_write("missing", &[json!({})]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::IndexNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_pages_with_projection() {
        let store = InMemoryStore::new();
        store.create_index("runs").await.unwrap();
        let docs: Vec<Value> = (0..5).map(|i| json!({"n": i, "extra": "x"})).collect();
        store.bulk_write("runs", &docs).await.unwrap();

        let mut cursor: Option<String> = None;
        let mut seen = Vec::new();
        loop {
            let page = store
                .scan_page("runs", &["n"], cursor.as_deref(), 2)
                .await
                .unwrap();
            for doc in &page.docs {
                assert!(doc.source.get("extra").is_none());
                seen.push(doc.source["n"].as_i64().unwrap());
            }
            match page.cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_missing_ids() {
        let store = InMemoryStore::new();
        store.create_index("runs").await.unwrap();
        store.bulk_write("runs", &[json!({"a": 1})]).await.unwrap();
        let page = store.scan_page("runs", &[], None, 10).await.unwrap();
        let id = page.docs[0].id.clone();

        let outcome = store
            .bulk_delete("runs", &[id, "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(store.count("runs").await.unwrap(), 0);
    }
}
