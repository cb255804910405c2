//! Catalog page and the live-filtered product grid.
//!
//! Both read the cached catalog only; filtering never touches the network.
//! Open pages listen on `/catalog/events` and refetch the grid whenever the
//! cached catalog is reloaded.

use std::convert::Infallible;

use aquarium_core::Product;
use aquarium_core::filter::{ProductFilter, Tag, available_tags, filter_products};
use aquarium_core::links::{contact_to_buy_text, line_link};
use aquarium_supabase::{Snapshot, SyncStatus};
use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures::Stream;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::config::SiteSettings;
use crate::error::Result;
use crate::routes::PageContext;
use crate::state::AppState;

/// SSE event name the grid listens for.
pub const CATALOG_CHANGED_EVENT: &str = "catalog-changed";

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    pub q: String,
    pub tag: String,
}

impl CatalogQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter::new(&self.q, Tag::parse(&self.tag))
    }
}

/// Product card display data for templates.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub gender: Option<String>,
    pub price: String,
    pub stock: i64,
    pub stock_class: &'static str,
    pub note: Option<String>,
    pub image_url: String,
    pub line_link: String,
}

impl ProductCardView {
    fn new(product: &Product, site: &SiteSettings) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            category: product.category.clone(),
            gender: product.gender.clone(),
            price: product.price.display(&site.currency),
            stock: product.stock,
            stock_class: product.stock_level().css_class(),
            note: product.note.clone(),
            image_url: product.image_or_placeholder().to_string(),
            line_link: line_link(&site.line_id, &contact_to_buy_text(&product.name)),
        }
    }
}

/// Tag bar entry.
#[derive(Debug, Clone)]
pub struct TagView {
    pub label: String,
    pub value: String,
    pub active: bool,
}

/// The grid plus what to show instead of it.
#[derive(Debug, Clone)]
pub struct GridView {
    pub products: Vec<ProductCardView>,
    /// Never loaded yet.
    pub loading: bool,
    /// The last load failed; `products` may hold an older list.
    pub load_failed: bool,
}

impl GridView {
    fn new(snapshot: &Snapshot<Product>, filter: &ProductFilter, site: &SiteSettings) -> Self {
        let products = filter_products(&snapshot.rows, filter)
            .into_iter()
            .map(|p| ProductCardView::new(p, site))
            .collect();
        Self {
            products,
            loading: snapshot.status == SyncStatus::Pending,
            load_failed: snapshot.status == SyncStatus::Failed,
        }
    }
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogIndexTemplate {
    pub page: PageContext,
    pub query: String,
    pub tags: Vec<TagView>,
    pub grid: GridView,
}

/// Product grid fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub grid: GridView,
}

fn tag_bar(products: &[Product], active: &Tag) -> Vec<TagView> {
    std::iter::once(Tag::All)
        .chain(available_tags(products))
        .map(|tag| TagView {
            label: tag.label().to_string(),
            value: tag.query_value(),
            active: &tag == active,
        })
        .collect()
}

/// Display the catalog page.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CatalogQuery>,
) -> Result<CatalogIndexTemplate> {
    let page = PageContext::load(&state, &session).await?;
    let snapshot = state.catalog().snapshot();
    let filter = query.filter();

    Ok(CatalogIndexTemplate {
        tags: tag_bar(&snapshot.rows, filter.tag()),
        grid: GridView::new(&snapshot, &filter, &page.site),
        query: query.q,
        page,
    })
}

/// Re-render the product grid for the current keyword and tag (HTMX).
#[instrument(skip(state))]
pub async fn grid(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ProductGridTemplate {
    let snapshot = state.catalog().snapshot();
    ProductGridTemplate {
        grid: GridView::new(&snapshot, &query.filter(), &state.config().site),
    }
}

/// Stream a `catalog-changed` event after every successful catalog load.
///
/// The event data is the load counter; the page refetches `/catalog/grid`
/// with its current keyword and tag.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut changes = state.catalog().changes();
    let stream = async_stream::stream! {
        while changes.changed().await.is_ok() {
            let version = *changes.borrow_and_update();
            tracing::debug!(version, "Catalog changed, notifying page");
            yield Ok(Event::default()
                .event(CATALOG_CHANGED_EVENT)
                .data(version.to_string()));
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}
