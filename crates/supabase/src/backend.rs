use serde_json::Value;

use crate::client::SupabaseClient;
use crate::error::Result;
use crate::memory::MemoryTableStore;
use crate::query::Select;
use crate::store::{Subscription, TableStore};

/// The store an app runs against: the hosted project, or memory in preview
/// mode and tests.
#[derive(Debug, Clone)]
pub enum Backend {
    Supabase(SupabaseClient),
    Memory(MemoryTableStore),
}

impl Backend {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Supabase(_) => "supabase",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<SupabaseClient> for Backend {
    fn from(client: SupabaseClient) -> Self {
        Self::Supabase(client)
    }
}

impl From<MemoryTableStore> for Backend {
    fn from(store: MemoryTableStore) -> Self {
        Self::Memory(store)
    }
}

impl TableStore for Backend {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Value>> {
        match self {
            Self::Supabase(client) => client.select(table, query).await,
            Self::Memory(store) => store.select(table, query).await,
        }
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        match self {
            Self::Supabase(client) => client.insert(table, rows).await,
            Self::Memory(store) => store.insert(table, rows).await,
        }
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<()> {
        match self {
            Self::Supabase(client) => client.update(table, id, patch).await,
            Self::Memory(store) => store.update(table, id, patch).await,
        }
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        match self {
            Self::Supabase(client) => client.delete(table, id).await,
            Self::Memory(store) => store.delete(table, id).await,
        }
    }

    async fn subscribe(&self, table: &str) -> Result<Subscription> {
        match self {
            Self::Supabase(client) => client.subscribe(table).await,
            Self::Memory(store) => store.subscribe(table).await,
        }
    }
}
