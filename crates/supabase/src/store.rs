//! The [`TableStore`] seam and typed helpers over it.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::query::Select;

/// Row-level access to a hosted table store.
pub trait TableStore: Send + Sync {
    /// Rows matching `query`.
    fn select(&self, table: &str, query: &Select)
    -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Insert rows, returning them as stored (with generated columns).
    fn insert(&self, table: &str, rows: Vec<Value>)
    -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Apply `patch` to the row with the given id.
    fn update(&self, table: &str, id: &str, patch: Value)
    -> impl Future<Output = Result<()>> + Send;

    /// Delete the row with the given id.
    fn delete(&self, table: &str, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Open a change feed for `table`.
    fn subscribe(&self, table: &str) -> impl Future<Output = Result<Subscription>> + Send;
}

/// What happened to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// The feed may have missed events (reconnect or lag).
    Resync,
}

impl ChangeKind {
    /// Map a trigger operation name (`INSERT`, `UPDATE`, `DELETE`).
    #[must_use]
    pub fn from_op(op: &str) -> Self {
        match op.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Resync,
        }
    }
}

/// A change notification for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
}

/// An open change feed. Dropping it stops the feed.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a receiver fed by `task`.
    #[must_use]
    pub const fn new(events: mpsc::Receiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self {
            events,
            task: Some(task),
        }
    }

    /// Next event, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Decode rows, skipping and logging any that fail validation.
#[must_use]
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned();
            match serde_json::from_value(row) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!(table, id = ?id, error = %e, "Skipping malformed row");
                    None
                }
            }
        })
        .collect()
}

/// Select and decode rows.
pub async fn fetch_rows<S, T>(store: &S, table: &str, query: &Select) -> Result<Vec<T>>
where
    S: TableStore,
    T: DeserializeOwned,
{
    let rows = store.select(table, query).await?;
    Ok(decode_rows(table, rows))
}

/// Select one row by id.
pub async fn fetch_one<S, T>(store: &S, table: &str, id: &str) -> Result<Option<T>>
where
    S: TableStore,
    T: DeserializeOwned,
{
    let query = Select::all().eq("id", id).limit(1);
    let rows = store.select(table, &query).await?;
    Ok(decode_rows(table, rows).into_iter().next())
}

/// Insert payloads and decode the stored rows.
///
/// Unlike reads, a returned row that fails to decode is an error: the caller
/// needs the generated columns.
pub async fn insert_rows<S, P, T>(store: &S, table: &str, payloads: &[P]) -> Result<Vec<T>>
where
    S: TableStore,
    P: Serialize + Sync,
    T: DeserializeOwned,
{
    let rows = payloads
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let stored = store.insert(table, rows).await?;
    stored
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Update one row by id with a serializable patch.
pub async fn update_row<S, P>(store: &S, table: &str, id: &str, patch: &P) -> Result<()>
where
    S: TableStore,
    P: Serialize + Sync,
{
    let patch = serde_json::to_value(patch)?;
    store.update(table, id, patch).await
}

/// Delete one row by id.
pub async fn delete_row<S: TableStore>(store: &S, table: &str, id: &str) -> Result<()> {
    store.delete(table, id).await
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: i64,
        name: String,
    }

    #[test]
    fn test_change_kind_from_op() {
        assert_eq!(ChangeKind::from_op("INSERT"), ChangeKind::Insert);
        assert_eq!(ChangeKind::from_op("update"), ChangeKind::Update);
        assert_eq!(ChangeKind::from_op(" DELETE "), ChangeKind::Delete);
        assert_eq!(ChangeKind::from_op("TRUNCATE"), ChangeKind::Resync);
    }

    #[test]
    fn test_decode_rows_skips_malformed() {
        let rows = vec![
            json!({"id": 1, "name": "a"}),
            json!({"name": "no id"}),
            json!({"id": 3, "name": "c"}),
        ];
        let decoded: Vec<Row> = decode_rows("products", rows);
        assert_eq!(
            decoded,
            vec![
                Row {
                    id: 1,
                    name: "a".to_string()
                },
                Row {
                    id: 3,
                    name: "c".to_string()
                },
            ]
        );
    }
}
