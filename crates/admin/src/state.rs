//! Application state shared across handlers.

use std::sync::Arc;

use aquarium_core::{ORDERS_TABLE, Order};
use aquarium_supabase::{Backend, Direction, MirrorTasks, Select, StoreError, TableMirror};

use crate::config::AdminConfig;
use crate::services::ProductService;

/// Mirror of every order, newest first.
pub type OrderMirror = TableMirror<Backend, Order>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    products: ProductService<Backend>,
    orders: OrderMirror,
}

impl AppState {
    /// Create a new application state for the configured remote mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote client cannot be created.
    pub fn new(config: AdminConfig) -> Result<Self, StoreError> {
        let backend = config.remote.backend()?;
        Ok(Self::with_backend(config, backend))
    }

    /// Create a state over an explicit backend. Writes are refused when the
    /// configuration is in preview mode.
    #[must_use]
    pub fn with_backend(config: AdminConfig, backend: Backend) -> Self {
        let read_only = config.remote.is_preview();
        let orders = TableMirror::new(
            backend.clone(),
            ORDERS_TABLE,
            Select::all().order("created_at", Direction::Descending),
        );
        let products = ProductService::new(backend, read_only);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                products,
                orders,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the product service.
    #[must_use]
    pub fn products(&self) -> &ProductService<Backend> {
        &self.inner.products
    }

    /// Get a reference to the cached orders.
    #[must_use]
    pub fn orders(&self) -> &OrderMirror {
        &self.inner.orders
    }

    /// Whether the panel serves sample data.
    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.inner.config.remote.is_preview()
    }

    /// Load products and orders and keep both in sync with their tables.
    pub async fn start_sync(&self) -> (MirrorTasks, MirrorTasks) {
        let products = self.inner.products.mirror().start().await;
        let orders = self.inner.orders.start().await;
        (products, orders)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preview_state_is_read_only_with_all_sample_products() {
        let state = AppState::new(AdminConfig::for_tests()).unwrap();
        assert!(state.is_preview());
        assert!(state.products().is_read_only());

        let _tasks = state.start_sync().await;

        assert_eq!(state.products().mirror().rows().len(), 5);
        assert!(state.orders().rows().is_empty());
    }
}
