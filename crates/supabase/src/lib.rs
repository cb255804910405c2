//! Aquarium Studio remote store.
//!
//! # Architecture
//!
//! - [`TableStore`] is the seam between the apps and the hosted table store:
//!   row-level `select`/`insert`/`update`/`delete` plus a per-table change feed
//! - [`SupabaseClient`] talks PostgREST over `reqwest`; its change feed is a
//!   Postgres `LISTEN` on `<table>_changes` via `sqlx`
//! - [`MemoryTableStore`] backs preview mode and tests
//! - [`TableMirror`] keeps an in-memory snapshot of one query, refreshed on
//!   every change notification (coalesced)
//!
//! Rows cross the seam as `serde_json::Value`; [`fetch_rows`] and
//! [`insert_rows`] decode them into the typed contracts of `aquarium-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use aquarium_core::{PRODUCTS_TABLE, Product};
//! use aquarium_supabase::{Direction, MemoryTableStore, Select, TableMirror};
//!
//! let store = MemoryTableStore::with_sample_catalog();
//! let query = Select::all()
//!     .eq("status", "available")
//!     .order("created_at", Direction::Descending);
//! let mirror: TableMirror<_, Product> = TableMirror::new(store, PRODUCTS_TABLE, query);
//! let _tasks = mirror.start().await;
//! let products = mirror.rows();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod backend;
mod client;
mod error;
mod memory;
mod mirror;
mod query;
pub mod realtime;
mod remote;
mod store;

pub use backend::Backend;
pub use client::SupabaseClient;
pub use error::{Result, StoreError};
pub use memory::{MemoryTableStore, Operation};
pub use mirror::{MirrorTasks, Snapshot, SyncStatus, TableMirror};
pub use query::{Direction, Select};
pub use remote::{RemoteConfig, RemoteMode, is_placeholder};
pub use store::{
    ChangeEvent, ChangeKind, Subscription, TableStore, decode_rows, delete_row, fetch_one,
    fetch_rows, insert_rows, update_row,
};
