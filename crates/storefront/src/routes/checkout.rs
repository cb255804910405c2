//! Checkout route handlers.
//!
//! Live mode writes the order to the remote store. Preview mode has nowhere
//! to write, so the order summary is handed to the customer's mail client
//! instead and the cart is cleared unconditionally.

use aquarium_core::cart::CartLine;
use aquarium_core::links::{line_link, mailto_link, order_summary};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::models::{Flash, FlashKind};
use crate::routes::PageContext;
use crate::routes::cart::CartView;
use crate::services::{
    CheckoutDetails, CheckoutError, CheckoutFlow, CheckoutForm, CheckoutState, OrderReceipt,
    SessionCart,
};
use crate::state::AppState;

/// Subject of preview-mode order mails.
const ORDER_MAIL_SUBJECT: &str = "New order";

/// Checkout form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutFormTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub error: Option<String>,
}

/// Order placed template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub page: PageContext,
    pub order_id: String,
    pub total: String,
    /// False when the order header was kept without its lines.
    pub lines_written: bool,
    /// LINE chat prefilled with the order summary.
    pub line_link: String,
}

/// Display the checkout form. An empty cart sends the customer back.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response> {
    let cart = SessionCart::load(&session).await?;
    let mut flow = CheckoutFlow::new();
    if let Err(e) = flow.open(&cart.cart().get()) {
        return Ok(back_to_cart(&session, &e).await);
    }

    let page = PageContext::load(&state, &session).await?;
    Ok(CheckoutFormTemplate {
        cart: CartView::new(cart.cart(), &page.site.currency),
        page,
        form: CheckoutForm::default(),
        error: None,
    }
    .into_response())
}

/// Place the order.
#[instrument(skip(state, session, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    if state.is_preview() {
        return submit_by_mail(&state, &session, form).await;
    }

    let mut cart = SessionCart::load(&session).await?;
    let lines = cart.cart().get();
    let mut flow = CheckoutFlow::new();
    if let Err(e) = flow.open(&lines) {
        return Ok(back_to_cart(&session, &e).await);
    }
    let details = match CheckoutDetails::try_from(&form) {
        Ok(details) => details,
        Err(e) => return form_page(&state, &session, form, Some(e.user_message())).await,
    };

    let policy = state.config().checkout.partial_order;
    let outcome = flow
        .submit(state.store(), cart.cart_mut(), &form, policy)
        .await
        .cloned();
    cart.save(&session).await?;

    match outcome {
        Ok(CheckoutState::Success(receipt)) => {
            add_breadcrumb(
                "checkout",
                "Order placed",
                &[("order_id", receipt.order_id.to_string().as_str())],
            );
            success_page(&state, &session, &receipt, &lines, &details).await
        }
        Ok(CheckoutState::Failed(message)) => {
            form_page(&state, &session, form, Some(message)).await
        }
        Ok(other) => {
            tracing::error!(state = ?other, "Checkout ended in an unexpected state");
            let message = "Something went wrong, please try again.".to_string();
            form_page(&state, &session, form, Some(message)).await
        }
        Err(e) => form_page(&state, &session, form, Some(e.user_message())).await,
    }
}

/// Preview mode: validate, hand the summary to the mail client, clear the
/// cart.
async fn submit_by_mail(
    state: &AppState,
    session: &Session,
    form: CheckoutForm,
) -> Result<Response> {
    let cart = SessionCart::load(session).await?;
    let lines = cart.cart().get();
    if lines.is_empty() {
        return Ok(back_to_cart(session, &CheckoutError::EmptyCart).await);
    }
    let details = match CheckoutDetails::try_from(&form) {
        Ok(details) => details,
        Err(e) => return form_page(state, session, form, Some(e.user_message())).await,
    };

    let config = state.config();
    let body = order_summary(&lines, &details.contact(), &config.site.currency);
    let link = mailto_link(&config.checkout.order_email, ORDER_MAIL_SUBJECT, &body);

    SessionCart::update(session, |cart| cart.clear()).await?;
    tracing::info!(line_count = lines.len(), "Preview order handed to mail client");
    Ok(Redirect::to(&link).into_response())
}

async fn success_page(
    state: &AppState,
    session: &Session,
    receipt: &OrderReceipt,
    lines: &[CartLine],
    details: &CheckoutDetails,
) -> Result<Response> {
    let page = PageContext::load(state, session).await?;
    let summary = order_summary(lines, &details.contact(), &page.site.currency);
    Ok(CheckoutSuccessTemplate {
        order_id: receipt.order_id.to_string(),
        total: receipt.total.display(&page.site.currency),
        lines_written: receipt.lines_written,
        line_link: line_link(&page.site.line_id, &summary),
        page,
    }
    .into_response())
}

async fn form_page(
    state: &AppState,
    session: &Session,
    form: CheckoutForm,
    error: Option<String>,
) -> Result<Response> {
    let page = PageContext::load(state, session).await?;
    let cart = SessionCart::load(session).await?;
    Ok(CheckoutFormTemplate {
        cart: CartView::new(cart.cart(), &page.site.currency),
        page,
        form,
        error,
    }
    .into_response())
}

async fn back_to_cart(session: &Session, error: &CheckoutError) -> Response {
    Flash::set(session, FlashKind::Warning, error.user_message()).await;
    Redirect::to("/cart").into_response()
}
