//! Orders list route handler (read-only).

use aquarium_core::Order;
use aquarium_supabase::SyncStatus;
use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use chrono::{DateTime, Utc};
use tower_sessions::Session;
use tracing::instrument;

use crate::routes::PageContext;
use crate::state::AppState;

/// Order row view for templates.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_line_id: String,
    pub shipping_address: String,
    pub total: String,
    pub status: &'static str,
    pub note: String,
    pub created_at: String,
}

impl OrderRowView {
    fn new(order: &Order, currency: &str) -> Self {
        Self {
            id: order.id.as_i64(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_line_id: order.customer_line_id.clone().unwrap_or_default(),
            shipping_address: order.shipping_address.clone(),
            total: order.total().display(currency),
            status: order.status.label(),
            note: order.note.clone().unwrap_or_default(),
            created_at: format_timestamp(order.created_at),
        }
    }
}

fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "-".to_string(),
        |at| at.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Orders list page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderRowView>,
    pub loading: bool,
    pub load_failed: bool,
}

/// Orders list page handler.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> OrdersIndexTemplate {
    let page = PageContext::load(&state, &session, "orders").await;
    let snapshot = state.orders().snapshot();
    let currency = &state.config().currency;

    OrdersIndexTemplate {
        page,
        orders: snapshot
            .rows
            .iter()
            .map(|o| OrderRowView::new(o, currency))
            .collect(),
        loading: snapshot.status == SyncStatus::Pending,
        load_failed: snapshot.status == SyncStatus::Failed,
    }
}
