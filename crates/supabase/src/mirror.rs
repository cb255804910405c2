//! Cached, change-driven copy of one table query.
//!
//! A [`TableMirror`] holds the latest successfully loaded rows as an
//! `Arc<Vec<T>>` snapshot that is swapped whole, so readers never see a
//! partial list. Loads never fail outward: an error is logged, the status
//! flips to [`SyncStatus::Failed`] and the previous rows stay in place.
//!
//! Change notifications only *request* a refresh. A single refresher task
//! performs loads, and any number of requests that arrive while a load is in
//! flight collapse into one further load.
//!
//! Every successful load bumps a [`watch`] counter, so pages holding the rows
//! open can be told to re-render.

use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::query::Select;
use crate::store::{TableStore, fetch_rows};

/// Outcome of the most recent load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Never loaded.
    #[default]
    Pending,
    Ready,
    /// The last load failed; rows are from an earlier load, if any.
    Failed,
}

/// A point-in-time view of the mirror.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub rows: Arc<Vec<T>>,
    pub status: SyncStatus,
    /// When rows were last replaced.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Number of load attempts so far.
    pub loads: u64,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            status: self.status,
            loaded_at: self.loaded_at,
            loads: self.loads,
        }
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(Vec::new()),
            status: SyncStatus::Pending,
            loaded_at: None,
            loads: 0,
        }
    }
}

/// Background tasks keeping a mirror fresh. Dropping this stops them.
#[derive(Debug, Default)]
pub struct MirrorTasks {
    handles: Vec<JoinHandle<()>>,
}

impl MirrorTasks {
    /// Whether a change feed is attached.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.handles.len() > 1
    }
}

impl Drop for MirrorTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// In-memory copy of the rows returned by one query.
pub struct TableMirror<S, T> {
    inner: Arc<MirrorInner<S, T>>,
}

struct MirrorInner<S, T> {
    store: S,
    table: String,
    query: Select,
    snapshot: RwLock<Snapshot<T>>,
    refresh: Notify,
    changes: watch::Sender<u64>,
    _rows: PhantomData<fn() -> T>,
}

impl<S, T> Clone for TableMirror<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, T> TableMirror<S, T>
where
    S: TableStore + 'static,
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create an empty mirror of `query` on `table`.
    #[must_use]
    pub fn new(store: S, table: impl Into<String>, query: Select) -> Self {
        Self {
            inner: Arc::new(MirrorInner {
                store,
                table: table.into(),
                query,
                snapshot: RwLock::new(Snapshot::default()),
                refresh: Notify::new(),
                changes: watch::channel(0).0,
                _rows: PhantomData,
            }),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// The mirrored table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.inner.table
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current rows.
    #[must_use]
    pub fn rows(&self) -> Arc<Vec<T>> {
        self.snapshot().rows
    }

    /// Status of the most recent load.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.snapshot().status
    }

    /// Receiver of the successful load count. Only loads after this call
    /// are reported as changes.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Run the query once and replace the rows on success.
    pub async fn load(&self) -> SyncStatus {
        let table = self.inner.table.as_str();
        let result: Result<Vec<T>> = fetch_rows(&self.inner.store, table, &self.inner.query).await;

        let mut snapshot = self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        snapshot.loads += 1;
        match result {
            Ok(rows) => {
                tracing::info!(table, count = rows.len(), "Loaded rows");
                snapshot.rows = Arc::new(rows);
                snapshot.status = SyncStatus::Ready;
                snapshot.loaded_at = Some(Utc::now());
                self.inner.changes.send_modify(|version| *version += 1);
            }
            Err(e) => {
                tracing::error!(
                    table,
                    error = %e,
                    kept = snapshot.rows.len(),
                    "Failed to load rows, keeping previous snapshot"
                );
                snapshot.status = SyncStatus::Failed;
            }
        }
        snapshot.status
    }

    /// Ask the refresher for a load. Requests made while a load is pending
    /// or running collapse into one.
    pub fn request_refresh(&self) {
        self.inner.refresh.notify_one();
    }

    /// Spawn the single task that serves refresh requests.
    #[must_use]
    pub fn spawn_refresher(&self) -> JoinHandle<()> {
        let mirror = self.clone();
        tokio::spawn(async move {
            loop {
                mirror.inner.refresh.notified().await;
                mirror.load().await;
            }
        })
    }

    /// Subscribe to the table's change feed and request a refresh on every
    /// event.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be opened.
    pub async fn subscribe(&self) -> Result<JoinHandle<()>> {
        let mut feed = self.inner.store.subscribe(&self.inner.table).await?;
        let mirror = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                tracing::debug!(table = %event.table, kind = ?event.kind, "Change received");
                mirror.request_refresh();
            }
            tracing::warn!(table = %mirror.inner.table, "Change feed ended");
        }))
    }

    /// Initial load, refresher and change feed. Without a feed the mirror
    /// still serves explicit refreshes.
    pub async fn start(&self) -> MirrorTasks {
        self.load().await;
        let mut handles = vec![self.spawn_refresher()];
        match self.subscribe().await {
            Ok(handle) => handles.push(handle),
            Err(e) => tracing::warn!(
                table = %self.inner.table,
                error = %e,
                "Running without live updates"
            ),
        }
        MirrorTasks { handles }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use aquarium_core::{PRODUCTS_TABLE, Product};
    use serde_json::json;

    use super::*;
    use crate::memory::{MemoryTableStore, Operation};
    use crate::query::Direction;

    fn visible_products(store: &MemoryTableStore) -> TableMirror<MemoryTableStore, Product> {
        TableMirror::new(
            store.clone(),
            PRODUCTS_TABLE,
            Select::all()
                .eq("status", "available")
                .order("created_at", Direction::Descending),
        )
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_load_replaces_rows_newest_first() {
        let store = MemoryTableStore::with_sample_catalog();
        let mirror = visible_products(&store);
        assert_eq!(mirror.status(), SyncStatus::Pending);

        assert_eq!(mirror.load().await, SyncStatus::Ready);
        let rows = mirror.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].name, "Red Albino");
        assert!(mirror.snapshot().loaded_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_rows() {
        let store = MemoryTableStore::with_sample_catalog();
        let mirror = visible_products(&store);
        mirror.load().await;

        store.fail_next(Operation::Select, PRODUCTS_TABLE);
        assert_eq!(mirror.load().await, SyncStatus::Failed);
        assert_eq!(mirror.rows().len(), 4);

        assert_eq!(mirror.load().await, SyncStatus::Ready);
    }

    #[tokio::test]
    async fn test_failed_first_load_is_empty() {
        let store = MemoryTableStore::with_sample_catalog();
        store.fail_next(Operation::Select, PRODUCTS_TABLE);
        let mirror = visible_products(&store);

        assert_eq!(mirror.load().await, SyncStatus::Failed);
        assert!(mirror.rows().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let store = MemoryTableStore::new();
        store.seed(
            PRODUCTS_TABLE,
            vec![
                json!({"name": "Good", "status": "available", "price": 100}),
                json!({"name": "   ", "status": "available"}),
                json!({"name": "Odd", "status": "vanished"}),
            ],
        );
        let mirror: TableMirror<_, Product> =
            TableMirror::new(store, PRODUCTS_TABLE, Select::all());

        assert_eq!(mirror.load().await, SyncStatus::Ready);
        assert_eq!(mirror.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_successful_loads_are_announced() {
        let store = MemoryTableStore::with_sample_catalog();
        let mirror = visible_products(&store);
        let mut changes = mirror.changes();
        assert!(!changes.has_changed().unwrap());

        mirror.load().await;
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 1);

        store.fail_next(Operation::Select, PRODUCTS_TABLE);
        mirror.load().await;
        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_refresh_requests_coalesce() {
        let store = MemoryTableStore::with_sample_catalog();
        let mirror = visible_products(&store);

        for _ in 0..10 {
            mirror.request_refresh();
        }
        let _refresher = MirrorTasks {
            handles: vec![mirror.spawn_refresher()],
        };

        wait_for(|| mirror.snapshot().loads == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(mirror.snapshot().loads, 1);
    }

    #[tokio::test]
    async fn test_change_feed_triggers_reload() {
        let store = MemoryTableStore::with_sample_catalog();
        let mirror = visible_products(&store);
        let tasks = mirror.start().await;
        assert!(tasks.is_live());
        assert_eq!(mirror.rows().len(), 4);

        store
            .insert(
                PRODUCTS_TABLE,
                vec![json!({"name": "Full Red", "status": "available", "price": 700})],
            )
            .await
            .unwrap();
        wait_for(|| mirror.rows().len() == 5).await;
        assert_eq!(mirror.rows()[0].name, "Full Red");

        store
            .update(PRODUCTS_TABLE, "1", json!({"status": "sold"}))
            .await
            .unwrap();
        wait_for(|| mirror.rows().len() == 4).await;
    }
}
