//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to /products
//!
//! # Products
//! GET  /products               - Stats plus product table (?q=keyword)
//! POST /products               - Create product
//! POST /products/refresh       - Refetch the product list
//! GET  /products/new           - Empty product form
//! GET  /products/{id}/edit     - Product form prefilled from the row
//! POST /products/{id}          - Update product
//! GET  /products/{id}/delete   - Delete confirmation
//! POST /products/{id}/delete   - Delete product (requires confirm=yes)
//!
//! # Orders
//! GET  /orders                 - Orders, newest first (read-only)
//! ```

pub mod orders;
pub mod products;

use aquarium_supabase::RemoteMode;
use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::models::Flash;
use crate::state::AppState;

/// Everything the base layout needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub site_name: String,
    /// Why the panel is in preview mode, if it is.
    pub preview: Option<String>,
    pub flash: Option<Flash>,
    /// Top-level section for nav highlighting.
    pub section: &'static str,
}

impl PageContext {
    /// Build the layout context, consuming any pending flash message.
    pub async fn load(state: &AppState, session: &Session, section: &'static str) -> Self {
        let preview = match &state.config().remote.mode {
            RemoteMode::Preview { reason } => Some(reason.clone()),
            RemoteMode::Live { .. } => None,
        };
        Self {
            site_name: state.config().site_name.clone(),
            preview,
            flash: Flash::take(session).await,
            section,
        }
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/refresh", post(products::refresh))
        .route("/new", get(products::new_form))
        .route("/{id}", post(products::update))
        .route("/{id}/edit", get(products::edit_form))
        .route(
            "/{id}/delete",
            get(products::confirm_delete).post(products::delete),
        )
}

/// Create all routes for the admin panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/products") }))
        .nest("/products", product_routes())
        .route("/orders", get(orders::index))
}
