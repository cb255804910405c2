//! Seed the products table with the sample catalog.
//!
//! Writes go through the same REST endpoint and anon key the apps use, so
//! the table's row-level policies must allow inserts for that key.

use aquarium_core::{PRODUCTS_TABLE, Product, sample};
use aquarium_supabase::{
    RemoteConfig, RemoteMode, Select, StoreError, TableStore, fetch_rows, insert_rows,
};

/// What a seed run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The table already had rows and `force` was not set.
    Skipped,
    /// This many products were inserted.
    Inserted(usize),
}

/// Seed the configured Supabase project.
///
/// # Errors
///
/// Returns an error if Supabase is not configured or the insert fails.
pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let remote = RemoteConfig::resolve(
        std::env::var("SUPABASE_URL").ok().as_deref(),
        std::env::var("SUPABASE_ANON_KEY").ok().as_deref(),
        None,
    )?;
    if let RemoteMode::Preview { reason } = &remote.mode {
        return Err(format!("Cannot seed in preview mode: {reason}").into());
    }

    let backend = remote.backend()?;
    match seed_products(&backend, force).await? {
        SeedOutcome::Skipped => {
            tracing::warn!("Products table is not empty, nothing seeded (use --force to insert)");
        }
        SeedOutcome::Inserted(count) => {
            tracing::info!(count, "Sample products inserted");
        }
    }
    Ok(())
}

/// Insert the sample catalog unless the table already has rows.
///
/// # Errors
///
/// Returns an error if the existence check or the insert fails.
pub async fn seed_products<S: TableStore>(
    store: &S,
    force: bool,
) -> Result<SeedOutcome, StoreError> {
    if !force {
        let existing: Vec<Product> =
            fetch_rows(store, PRODUCTS_TABLE, &Select::all().limit(1)).await?;
        if !existing.is_empty() {
            return Ok(SeedOutcome::Skipped);
        }
    }

    let inserted: Vec<Product> = insert_rows(store, PRODUCTS_TABLE, &sample::drafts()).await?;
    Ok(SeedOutcome::Inserted(inserted.len()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aquarium_supabase::MemoryTableStore;

    use super::*;

    #[tokio::test]
    async fn test_seed_inserts_into_empty_table() {
        let store = MemoryTableStore::new();
        let outcome = seed_products(&store, false).await.unwrap();
        assert_eq!(outcome, SeedOutcome::Inserted(sample::drafts().len()));
        assert_eq!(store.rows(PRODUCTS_TABLE).len(), sample::drafts().len());
    }

    #[tokio::test]
    async fn test_seed_skips_populated_table_unless_forced() {
        let store = MemoryTableStore::with_sample_catalog();
        let before = store.rows(PRODUCTS_TABLE).len();

        let outcome = seed_products(&store, false).await.unwrap();
        assert_eq!(outcome, SeedOutcome::Skipped);
        assert_eq!(store.rows(PRODUCTS_TABLE).len(), before);

        let outcome = seed_products(&store, true).await.unwrap();
        assert_eq!(outcome, SeedOutcome::Inserted(sample::drafts().len()));
        assert_eq!(store.rows(PRODUCTS_TABLE).len(), before * 2);
    }
}
