//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the session; product data comes from the cached
//! catalog and is snapshotted into the cart line when added.

use aquarium_core::ProductId;
use aquarium_core::cart::{CartLine, CartStore, MemoryStorage};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{Flash, FlashKind};
use crate::routes::{PageContext, is_htmx};
use crate::services::SessionCart;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: i64,
    pub name: String,
    pub image_url: String,
    pub price: String,
    pub quantity: u32,
    pub subtotal: String,
}

impl CartLineView {
    fn new(line: &CartLine, currency: &str) -> Self {
        Self {
            product_id: line.product.id.as_i64(),
            name: line.product.name.clone(),
            image_url: line.product.image_or_placeholder().to_string(),
            price: line.product.price.display(currency),
            quantity: line.quantity,
            subtotal: line.subtotal().display(currency),
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Render a cart in the given currency.
    #[must_use]
    pub fn new(cart: &CartStore<MemoryStorage>, currency: &str) -> Self {
        Self {
            lines: cart
                .get()
                .iter()
                .map(|line| CartLineView::new(line, currency))
                .collect(),
            total: cart.total().display(currency),
            item_count: cart.item_count(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    pub quantity: Option<u32>,
}

/// Quantity change form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i64,
    /// Signed change, e.g. `1` or `-1`.
    pub delta: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i64,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartShowTemplate> {
    let page = PageContext::load(&state, &session).await?;
    let cart = SessionCart::load(&session).await?;
    Ok(CartShowTemplate {
        cart: CartView::new(cart.cart(), &page.site.currency),
        page,
    })
}

/// Add a catalog product to the cart.
///
/// Returns the count badge with an HTMX trigger so other cart widgets
/// refresh, or redirects to the cart page for plain form posts.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let product = state
        .catalog()
        .rows()
        .iter()
        .find(|p| p.id == product_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    let quantity = form.quantity.unwrap_or(1);

    let count = SessionCart::update(&session, |cart| {
        cart.add(&product, quantity);
        cart.item_count()
    })
    .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[("product_id", product_id.to_string().as_str())],
    );

    if is_htmx(&headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate { count },
        )
            .into_response());
    }

    Flash::set(
        &session,
        FlashKind::Success,
        format!("Added {} to your cart", product.name),
    )
    .await;
    Ok(Redirect::to("/cart").into_response())
}

/// Change a line's quantity; a result of zero or less removes the line.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    mutate(&state, &session, &headers, |cart| {
        cart.update_quantity(product_id, form.delta);
    })
    .await
}

/// Remove a line.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    mutate(&state, &session, &headers, |cart| {
        cart.remove(product_id);
    })
    .await
}

/// Empty the cart.
#[instrument(skip(state, session, headers))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    mutate(&state, &session, &headers, CartStore::clear).await
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<CartCountTemplate> {
    let cart = SessionCart::load(&session).await?;
    Ok(CartCountTemplate {
        count: cart.cart().item_count(),
    })
}

/// Apply a cart operation and answer with the items fragment or a redirect.
async fn mutate(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    op: impl FnOnce(&mut CartStore<MemoryStorage>),
) -> Result<Response> {
    let currency = &state.config().site.currency;
    let cart = SessionCart::update(session, |cart| {
        op(cart);
        CartView::new(cart, currency)
    })
    .await?;

    if is_htmx(headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate { cart },
        )
            .into_response());
    }
    Ok(Redirect::to("/cart").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use aquarium_core::sample;

    use super::*;

    #[test]
    fn test_cart_view_formats_lines_and_total() {
        let catalog = sample::catalog();
        let mut cart = CartStore::new(MemoryStorage::new());
        cart.add(&catalog[0], 3);
        cart.add(&catalog[2], 1);

        let view = CartView::new(&cart, "NT$");

        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.lines[0].subtotal, "NT$ 1,800");
        assert_eq!(view.lines[1].price, "NT$ 1,200");
        assert_eq!(view.total, "NT$ 3,000");
        assert_eq!(view.item_count, 4);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_empty_cart_view() {
        let cart = CartStore::new(MemoryStorage::new());
        let view = CartView::new(&cart, "NT$");
        assert!(view.is_empty());
        assert_eq!(view.total, "NT$ 0");
    }
}
