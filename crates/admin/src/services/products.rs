//! Product mutations.
//!
//! Every mutation is one request to the remote store followed by a full
//! refetch of the admin's cached product list. A failed write leaves the
//! cached list untouched. In preview mode every write is refused before it
//! reaches the store.

use aquarium_core::{DraftError, PRODUCTS_TABLE, Product, ProductDraft, ProductForm, ProductId};
use aquarium_supabase::{
    Direction, Select, StoreError, SyncStatus, TableMirror, TableStore, delete_row, fetch_one,
    insert_rows, update_row,
};
use thiserror::Error;
use tracing::instrument;

/// Why a product mutation was not applied.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Preview mode: changes are not saved")]
    ReadOnly,

    #[error("Invalid product: {0}")]
    Invalid(#[from] DraftError),

    #[error("Product {0} not found")]
    NotFound(ProductId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MutationError {
    /// Message for the operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ReadOnly | Self::NotFound(_) => self.to_string(),
            Self::Invalid(e) => capitalize(&e.to_string()),
            Self::Store(e) => format!("Save failed: {}", e.user_message()),
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// All products, newest first.
#[must_use]
pub fn all_products_query() -> Select {
    Select::all().order("created_at", Direction::Descending)
}

/// Product list and writes for the admin panel.
pub struct ProductService<S> {
    mirror: TableMirror<S, Product>,
    read_only: bool,
}

impl<S> Clone for ProductService<S> {
    fn clone(&self) -> Self {
        Self {
            mirror: self.mirror.clone(),
            read_only: self.read_only,
        }
    }
}

impl<S: TableStore + 'static> ProductService<S> {
    /// Create a service over `store`. A read-only service refuses writes.
    #[must_use]
    pub fn new(store: S, read_only: bool) -> Self {
        Self {
            mirror: TableMirror::new(store, PRODUCTS_TABLE, all_products_query()),
            read_only,
        }
    }

    /// The cached product list.
    #[must_use]
    pub const fn mirror(&self) -> &TableMirror<S, Product> {
        &self.mirror
    }

    /// Whether writes are refused.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Refetch the product list.
    pub async fn refresh(&self) -> SyncStatus {
        self.mirror.load().await
    }

    /// Load one product for editing. Read-only mode looks in the cached list.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the store fails.
    #[instrument(skip(self))]
    pub async fn find(&self, id: ProductId) -> Result<Product, MutationError> {
        if self.read_only {
            return self
                .mirror
                .rows()
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(MutationError::NotFound(id));
        }
        fetch_one(self.mirror.store(), PRODUCTS_TABLE, &id.to_string())
            .await?
            .ok_or(MutationError::NotFound(id))
    }

    /// Create a product and refetch the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is read-only, the form is invalid or
    /// the store rejects the insert.
    #[instrument(skip(self, form))]
    pub async fn create(&self, form: ProductForm) -> Result<ProductId, MutationError> {
        self.ensure_writable()?;
        let draft = ProductDraft::try_from(form)?;

        let created: Vec<Product> =
            insert_rows(self.mirror.store(), PRODUCTS_TABLE, &[draft]).await?;
        let id = created
            .first()
            .map(|p| p.id)
            .ok_or_else(|| StoreError::Unavailable("insert returned no rows".to_string()))?;

        tracing::info!(product_id = %id, "Product created");
        self.refresh().await;
        Ok(id)
    }

    /// Replace a product's fields and refetch the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is read-only, the form is invalid or
    /// the store rejects the update.
    #[instrument(skip(self, form))]
    pub async fn update(&self, id: ProductId, form: ProductForm) -> Result<(), MutationError> {
        self.ensure_writable()?;
        let draft = ProductDraft::try_from(form)?;

        update_row(self.mirror.store(), PRODUCTS_TABLE, &id.to_string(), &draft).await?;

        tracing::info!(product_id = %id, "Product updated");
        self.refresh().await;
        Ok(())
    }

    /// Delete a product and refetch the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is read-only or the store rejects the
    /// delete.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), MutationError> {
        self.ensure_writable()?;

        delete_row(self.mirror.store(), PRODUCTS_TABLE, &id.to_string()).await?;

        tracing::info!(product_id = %id, "Product deleted");
        self.refresh().await;
        Ok(())
    }

    const fn ensure_writable(&self) -> Result<(), MutationError> {
        if self.read_only {
            return Err(MutationError::ReadOnly);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use aquarium_core::{Money, ProductStatus};
    use aquarium_supabase::{MemoryTableStore, Operation};

    use super::*;

    fn form(name: &str, price: &str) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            category: "Albino".to_string(),
            gender: "Male".to_string(),
            price: price.to_string(),
            stock: "abc".to_string(),
            status: "available".to_string(),
            ..ProductForm::default()
        }
    }

    async fn live_service() -> (MemoryTableStore, ProductService<MemoryTableStore>) {
        let store = MemoryTableStore::with_sample_catalog();
        let service = ProductService::new(store.clone(), false);
        service.refresh().await;
        (store, service)
    }

    #[tokio::test]
    async fn test_create_inserts_and_refetches() {
        let (store, service) = live_service().await;

        let id = service.create(form("  Yellow Cobra ", "700")).await.unwrap();

        assert_eq!(store.rows(PRODUCTS_TABLE).len(), 6);
        let rows = service.mirror().rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].name, "Yellow Cobra");
        assert_eq!(rows[0].price, Money::new(700));
        assert_eq!(rows[0].stock, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_form_without_writing() {
        let (store, service) = live_service().await;

        let err = service.create(form("", "700")).await.unwrap_err();
        assert!(matches!(err, MutationError::Invalid(DraftError::MissingName)));

        let err = service.create(form("Yellow Cobra", "free")).await.unwrap_err();
        assert!(matches!(err, MutationError::Invalid(DraftError::MissingPrice)));
        assert_eq!(err.user_message(), "Product price is required");

        assert_eq!(store.rows(PRODUCTS_TABLE).len(), 5);
    }

    #[tokio::test]
    async fn test_update_changes_row_and_refetches() {
        let (_store, service) = live_service().await;
        let target = service.mirror().rows()[0].clone();

        let mut edit = ProductForm::from(&target);
        edit.price = "650".to_string();
        edit.status = "hold".to_string();
        service.update(target.id, edit).await.unwrap();

        let updated = service.find(target.id).await.unwrap();
        assert_eq!(updated.price, Money::new(650));
        assert_eq!(updated.status, ProductStatus::Hold);
        let cached = service.mirror().rows();
        assert!(cached.iter().any(|p| p.id == target.id && p.price == Money::new(650)));
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_refetches() {
        let (store, service) = live_service().await;
        let target = service.mirror().rows()[0].id;

        service.delete(target).await.unwrap();

        assert_eq!(store.rows(PRODUCTS_TABLE).len(), 4);
        assert!(service.mirror().rows().iter().all(|p| p.id != target));
        assert!(matches!(
            service.find(target).await,
            Err(MutationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cached_list() {
        let (store, service) = live_service().await;
        let before = service.mirror().snapshot().loads;
        store.fail_next(Operation::Insert, PRODUCTS_TABLE);

        let err = service.create(form("Yellow Cobra", "700")).await.unwrap_err();

        assert!(matches!(err, MutationError::Store(_)));
        assert!(err.user_message().starts_with("Save failed"));
        assert_eq!(service.mirror().rows().len(), 5);
        assert_eq!(service.mirror().snapshot().loads, before);
    }

    #[tokio::test]
    async fn test_read_only_refuses_writes_but_finds_cached() {
        let store = MemoryTableStore::with_sample_catalog();
        let service = ProductService::new(store.clone(), true);
        service.refresh().await;

        let err = service.create(form("Yellow Cobra", "700")).await.unwrap_err();
        assert!(matches!(err, MutationError::ReadOnly));
        assert!(matches!(
            service.delete(ProductId::new(1)).await,
            Err(MutationError::ReadOnly)
        ));
        assert_eq!(store.rows(PRODUCTS_TABLE).len(), 5);

        let found = service.find(ProductId::new(1)).await.unwrap();
        assert_eq!(found.name, "Red Albino");
    }
}
