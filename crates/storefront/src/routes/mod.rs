//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog page (?q=keyword&tag=type:Albino)
//! GET  /catalog/grid           - Product grid fragment (HTMX, per keystroke)
//! GET  /catalog/events         - Catalog reload events (SSE, refetches the grid)
//!
//! # Cart (HTMX fragments, full-page redirects without HTMX)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update            - Change quantity by a delta (returns cart_items fragment)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Order form
//! POST /checkout               - Place order (preview mode: mail link)
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;

use aquarium_supabase::RemoteMode;
use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::config::SiteSettings;
use crate::models::Flash;
use crate::services::SessionCart;
use crate::state::AppState;

/// Everything the base layout needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub site: SiteSettings,
    /// Why the storefront is in preview mode, if it is.
    pub preview: Option<String>,
    pub flash: Option<Flash>,
    pub cart_count: u32,
}

impl PageContext {
    /// Build the layout context, consuming any pending flash message.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn load(
        state: &AppState,
        session: &Session,
    ) -> Result<Self, tower_sessions::session::Error> {
        let cart = SessionCart::load(session).await?;
        Ok(Self {
            site: state.config().site.clone(),
            preview: preview_reason(state),
            flash: Flash::take(session).await,
            cart_count: cart.cart().item_count(),
        })
    }
}

fn preview_reason(state: &AppState) -> Option<String> {
    match &state.config().remote.mode {
        RemoteMode::Preview { reason } => Some(reason.clone()),
        RemoteMode::Live { .. } => None,
    }
}

/// Whether the request was issued by HTMX.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/grid", get(catalog::grid))
        .route("/events", get(catalog::events))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .nest("/catalog", catalog_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
}
