//! In-memory [`TableStore`] for preview mode and tests.
//!
//! Behaves like a small PostgREST: integer `id`s and `created_at` timestamps
//! are generated on insert, and every mutation is published to subscribers
//! of the table. Failures can be injected per operation and table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use aquarium_core::{PRODUCTS_TABLE, sample};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

use crate::error::{Result, StoreError};
use crate::query::{Select, value_text};
use crate::store::{ChangeEvent, ChangeKind, Subscription, TableStore};

const CHANGE_BUFFER: usize = 64;

/// A store operation, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// Table store held entirely in memory.
#[derive(Clone)]
pub struct MemoryTableStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failures: Mutex<Vec<(Operation, String)>>,
    next_id: AtomicI64,
    ticks: AtomicI64,
    epoch: DateTime<Utc>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl std::fmt::Debug for MemoryTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTableStore").finish_non_exhaustive()
    }
}

impl Default for MemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTableStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(MemoryInner {
                tables: Mutex::new(HashMap::new()),
                failures: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
                ticks: AtomicI64::new(0),
                epoch: Utc::now(),
                changes,
            }),
        }
    }

    /// Create a store holding the preview catalog, newest first in sample
    /// order.
    #[must_use]
    pub fn with_sample_catalog() -> Self {
        let store = Self::new();
        let rows = sample::catalog()
            .into_iter()
            .rev()
            .filter_map(|p| serde_json::to_value(p).ok())
            .collect();
        store.seed(PRODUCTS_TABLE, rows);
        store
    }

    /// Put rows in place without notifying subscribers. Missing `id` and
    /// `created_at` columns are generated.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        let stamped: Vec<Value> = rows.into_iter().map(|row| self.stamp(row)).collect();
        self.tables()
            .entry(table.to_string())
            .or_default()
            .extend(stamped);
    }

    /// Every row of a table, in insertion order.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables().get(table).cloned().unwrap_or_default()
    }

    /// Make the next `operation` on `table` fail.
    pub fn fail_next(&self, operation: Operation, table: &str) {
        self.inner
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((operation, table.to_string()));
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self, operation: Operation, table: &str) -> Result<()> {
        let mut failures = self
            .inner
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = failures
            .iter()
            .position(|(op, t)| *op == operation && t == table)
        {
            failures.remove(pos);
            return Err(StoreError::Unavailable(format!(
                "injected {operation:?} failure on {table}"
            )));
        }
        Ok(())
    }

    /// Fill in generated columns.
    fn stamp(&self, mut row: Value) -> Value {
        let Some(fields) = row.as_object_mut() else {
            return row;
        };

        match fields.get("id").and_then(Value::as_i64) {
            Some(id) => {
                self.inner.next_id.fetch_max(id + 1, Ordering::SeqCst);
            }
            None => {
                let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
                fields.insert("id".to_string(), Value::from(id));
            }
        }

        if !fields.contains_key("created_at") {
            let tick = self.inner.ticks.fetch_add(1, Ordering::SeqCst);
            let created_at = self.inner.epoch + Duration::microseconds(tick);
            fields.insert(
                "created_at".to_string(),
                Value::from(created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }
        row
    }

    fn publish(&self, table: &str, kind: ChangeKind) {
        // No subscribers is fine.
        let _ = self.inner.changes.send(ChangeEvent {
            table: table.to_string(),
            kind,
        });
    }
}

fn id_matches(row: &Value, id: &str) -> bool {
    row.get("id").and_then(value_text).as_deref() == Some(id)
}

impl TableStore for MemoryTableStore {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Value>> {
        self.check_failure(Operation::Select, table)?;
        Ok(query.apply(self.rows(table)))
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        self.check_failure(Operation::Insert, table)?;
        if rows.iter().any(|r| !r.is_object()) {
            return Err(StoreError::Rejected {
                status: 400,
                message: "rows must be JSON objects".to_string(),
            });
        }

        let stored: Vec<Value> = rows.into_iter().map(|row| self.stamp(row)).collect();
        self.tables()
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        self.publish(table, ChangeKind::Insert);
        Ok(stored)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<()> {
        self.check_failure(Operation::Update, table)?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::Rejected {
                status: 400,
                message: "patch must be a JSON object".to_string(),
            });
        };

        let updated = {
            let mut tables = self.tables();
            let rows = tables.entry(table.to_string()).or_default();
            let mut updated = false;
            for row in rows.iter_mut().filter(|r| id_matches(r, id)) {
                if let Some(fields) = row.as_object_mut() {
                    for (key, value) in &patch {
                        if key != "id" {
                            fields.insert(key.clone(), value.clone());
                        }
                    }
                    updated = true;
                }
            }
            updated
        };

        if updated {
            self.publish(table, ChangeKind::Update);
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.check_failure(Operation::Delete, table)?;
        let removed = {
            let mut tables = self.tables();
            let rows = tables.entry(table.to_string()).or_default();
            let before = rows.len();
            rows.retain(|r| !id_matches(r, id));
            rows.len() != before
        };

        if removed {
            self.publish(table, ChangeKind::Delete);
        }
        Ok(())
    }

    async fn subscribe(&self, table: &str) -> Result<Subscription> {
        let mut changes = self.inner.changes.subscribe();
        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
        let table = table.to_string();

        let task = tokio::spawn(async move {
            loop {
                let event = match changes.recv().await {
                    Ok(event) if event.table == table => event,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(table = %table, skipped, "Change feed lagged");
                        ChangeEvent {
                            table: table.clone(),
                            kind: ChangeKind::Resync,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, task))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration as StdDuration;

    use aquarium_core::Product;
    use serde_json::json;

    use super::*;
    use crate::query::Direction;
    use crate::store::fetch_rows;

    #[tokio::test]
    async fn test_insert_generates_ids_and_increasing_timestamps() {
        let store = MemoryTableStore::new();
        let stored = store
            .insert("orders", vec![json!({"customer_name": "a"}), json!({"customer_name": "b"})])
            .await
            .unwrap();

        assert_eq!(stored[0]["id"], 1);
        assert_eq!(stored[1]["id"], 2);
        let first = stored[0]["created_at"].as_str().unwrap();
        let second = stored[1]["created_at"].as_str().unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_sample_catalog_reads_newest_first_in_sample_order() {
        let store = MemoryTableStore::with_sample_catalog();
        let query = Select::all()
            .eq("status", "available")
            .order("created_at", Direction::Descending);
        let products: Vec<Product> = fetch_rows(&store, PRODUCTS_TABLE, &query).await.unwrap();

        let ids: Vec<i64> = products.iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        let next = store.insert(PRODUCTS_TABLE, vec![json!({"name": "x"})]).await.unwrap();
        assert_eq!(next[0]["id"], 6);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() {
        let store = MemoryTableStore::with_sample_catalog();

        store
            .update(PRODUCTS_TABLE, "2", json!({"price": 999, "id": 77}))
            .await
            .unwrap();
        let row = store
            .rows(PRODUCTS_TABLE)
            .into_iter()
            .find(|r| r["id"] == 2)
            .unwrap();
        assert_eq!(row["price"], 999);

        store.delete(PRODUCTS_TABLE, "2").await.unwrap();
        assert!(store.rows(PRODUCTS_TABLE).iter().all(|r| r["id"] != 2));
        assert_eq!(store.rows(PRODUCTS_TABLE).len(), 4);
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let store = MemoryTableStore::new();
        store.fail_next(Operation::Insert, "order_items");

        assert!(store.insert("orders", vec![json!({})]).await.is_ok());
        let err = store
            .insert("order_items", vec![json!({})])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.rows("order_items").is_empty());
        assert!(store.insert("order_items", vec![json!({})]).await.is_ok());
    }

    #[tokio::test]
    async fn test_subscription_receives_table_events_only() {
        let store = MemoryTableStore::new();
        let mut feed = store.subscribe("products").await.unwrap();

        store.insert("orders", vec![json!({})]).await.unwrap();
        store.insert("products", vec![json!({"name": "a"})]).await.unwrap();
        store.delete("products", "404").await.unwrap();
        store.delete("products", "2").await.unwrap();

        let first = tokio::time::timeout(StdDuration::from_secs(1), feed.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.kind, ChangeKind::Insert);
        let second = tokio::time::timeout(StdDuration::from_secs(1), feed.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.kind, ChangeKind::Delete);
        assert_eq!(second.table, "products");
    }
}
