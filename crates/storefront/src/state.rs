//! Application state shared across handlers.

use std::sync::Arc;

use aquarium_core::{PRODUCTS_TABLE, Product, ProductStatus};
use aquarium_supabase::{Backend, Direction, MirrorTasks, Select, StoreError, TableMirror};

use crate::config::StorefrontConfig;

/// Mirror of the products the storefront shows.
pub type CatalogMirror = TableMirror<Backend, Product>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration, the remote store and the cached catalog.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogMirror,
}

impl AppState {
    /// Create a new application state for the configured remote mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote client cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StoreError> {
        let backend = config.remote.backend()?;
        Ok(Self::with_backend(config, backend))
    }

    /// Create a state over an explicit backend.
    #[must_use]
    pub fn with_backend(config: StorefrontConfig, backend: Backend) -> Self {
        let catalog = TableMirror::new(backend, PRODUCTS_TABLE, visible_products_query());
        Self {
            inner: Arc::new(AppStateInner { config, catalog }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the remote store.
    #[must_use]
    pub fn store(&self) -> &Backend {
        self.inner.catalog.store()
    }

    /// Get a reference to the cached catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogMirror {
        &self.inner.catalog
    }

    /// Whether the storefront serves sample data.
    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.inner.config.remote.is_preview()
    }

    /// Load the catalog and keep it in sync with the products table.
    pub async fn start_catalog_sync(&self) -> MirrorTasks {
        self.inner.catalog.start().await
    }
}

/// Products with the storefront-visible status, newest first.
#[must_use]
pub fn visible_products_query() -> Select {
    Select::all()
        .eq("status", ProductStatus::Available.as_str())
        .order("created_at", Direction::Descending)
}
