//! Product management route handlers.
//!
//! Every write goes through [`ProductService`](crate::services::ProductService),
//! which refetches the product list afterwards. Validation and store failures
//! re-render the form with the operator's input intact.

use aquarium_core::filter::{ProductFilter, Tag, filter_products};
use aquarium_core::stats::CatalogStats;
use aquarium_core::{Product, ProductForm, ProductId, ProductStatus};
use aquarium_supabase::SyncStatus;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::{Flash, FlashKind};
use crate::routes::PageContext;
use crate::services::MutationError;
use crate::state::AppState;

/// Products list query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductsQuery {
    pub q: String,
}

/// Delete confirmation form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub confirm: String,
}

/// Product row view for templates.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub gender: String,
    pub price: String,
    pub stock: i64,
    pub stock_class: &'static str,
    pub status: &'static str,
    pub image_url: String,
}

impl ProductRowView {
    fn new(product: &Product, currency: &str) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            category: product.category.clone().unwrap_or_default(),
            gender: product.gender.clone().unwrap_or_default(),
            price: product.price.display(currency),
            stock: product.stock,
            stock_class: product.stock_level().css_class(),
            status: product.status.label(),
            image_url: product.image_or_placeholder().to_string(),
        }
    }
}

/// Headline numbers, formatted.
#[derive(Debug, Clone)]
pub struct StatsView {
    pub product_count: usize,
    pub total_stock: i64,
    pub order_count: usize,
    pub revenue: String,
}

impl StatsView {
    fn new(stats: &CatalogStats, currency: &str) -> Self {
        Self {
            product_count: stats.product_count,
            total_stock: stats.total_stock,
            order_count: stats.order_count,
            revenue: stats.revenue.display(currency),
        }
    }
}

/// Status dropdown entry.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn status_options(selected: &str) -> Vec<StatusOption> {
    let selected = selected
        .trim()
        .parse::<ProductStatus>()
        .unwrap_or_default();
    ProductStatus::ALL
        .into_iter()
        .map(|status| StatusOption {
            value: status.as_str(),
            label: status.label(),
            selected: status == selected,
        })
        .collect()
}

/// Products list page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub query: String,
    pub stats: StatsView,
    pub products: Vec<ProductRowView>,
    pub loading: bool,
    pub load_failed: bool,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub title: String,
    pub action: String,
    pub form: ProductForm,
    pub statuses: Vec<StatusOption>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn new(page: PageContext, target: Option<ProductId>, form: ProductForm) -> Self {
        let (title, action) = match target {
            Some(id) => (format!("Edit product #{id}"), format!("/products/{id}")),
            None => ("New product".to_string(), "/products".to_string()),
        };
        Self {
            page,
            title,
            action,
            statuses: status_options(&form.status),
            form,
            error: None,
        }
    }
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "products/delete.html")]
pub struct DeleteProductTemplate {
    pub page: PageContext,
    pub product: ProductRowView,
}

/// Map a lookup failure to an HTTP error.
fn lookup_error(err: MutationError) -> AppError {
    match err {
        MutationError::NotFound(id) => AppError::NotFound(format!("product {id}")),
        MutationError::Store(e) => AppError::Store(e),
        other => AppError::BadRequest(other.user_message()),
    }
}

/// Products list page handler.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ProductsQuery>,
) -> ProductsIndexTemplate {
    let page = PageContext::load(&state, &session, "products").await;
    let snapshot = state.products().mirror().snapshot();
    let orders = state.orders().rows();
    let currency = &state.config().currency;

    let stats = CatalogStats::compute(&snapshot.rows, &orders);
    let filter = ProductFilter::new(&query.q, Tag::All);
    let products = filter_products(&snapshot.rows, &filter)
        .into_iter()
        .map(|p| ProductRowView::new(p, currency))
        .collect();

    ProductsIndexTemplate {
        page,
        query: query.q,
        stats: StatsView::new(&stats, currency),
        products,
        loading: snapshot.status == SyncStatus::Pending,
        load_failed: snapshot.status == SyncStatus::Failed,
    }
}

/// Refetch the product list on demand.
#[instrument(skip(state, session))]
pub async fn refresh(State(state): State<AppState>, session: Session) -> Redirect {
    match state.products().refresh().await {
        SyncStatus::Ready => {
            Flash::set(&session, FlashKind::Success, "Product list refreshed").await;
        }
        SyncStatus::Pending | SyncStatus::Failed => {
            Flash::set(&session, FlashKind::Error, "Products could not be loaded").await;
        }
    }
    Redirect::to("/products")
}

/// Empty product form.
#[instrument(skip(state, session))]
pub async fn new_form(State(state): State<AppState>, session: Session) -> ProductFormTemplate {
    let page = PageContext::load(&state, &session, "products").await;
    let form = ProductForm {
        status: ProductStatus::default().as_str().to_string(),
        ..ProductForm::default()
    };
    ProductFormTemplate::new(page, None, form)
}

/// Product form prefilled from the stored row.
#[instrument(skip(state, session))]
pub async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<ProductFormTemplate> {
    let product = state.products().find(id).await.map_err(lookup_error)?;
    let page = PageContext::load(&state, &session, "products").await;
    Ok(ProductFormTemplate::new(
        page,
        Some(id),
        ProductForm::from(&product),
    ))
}

/// Create a product.
#[instrument(skip(state, session, form))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Response {
    match state.products().create(form.clone()).await {
        Ok(id) => {
            Flash::set(&session, FlashKind::Success, format!("Product #{id} created")).await;
            Redirect::to("/products").into_response()
        }
        Err(err) => mutation_failed(&state, &session, None, form, &err).await,
    }
}

/// Update a product.
#[instrument(skip(state, session, form))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Response {
    match state.products().update(id, form.clone()).await {
        Ok(()) => {
            Flash::set(&session, FlashKind::Success, format!("Product #{id} updated")).await;
            Redirect::to("/products").into_response()
        }
        Err(err) => mutation_failed(&state, &session, Some(id), form, &err).await,
    }
}

/// Delete confirmation page.
#[instrument(skip(state, session))]
pub async fn confirm_delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<DeleteProductTemplate> {
    let product = state.products().find(id).await.map_err(lookup_error)?;
    let page = PageContext::load(&state, &session, "products").await;
    Ok(DeleteProductTemplate {
        product: ProductRowView::new(&product, &state.config().currency),
        page,
    })
}

/// Delete a product once the operator has confirmed.
#[instrument(skip(state, session, form))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<DeleteForm>,
) -> Redirect {
    if form.confirm != "yes" {
        Flash::set(&session, FlashKind::Warning, "Delete cancelled").await;
        return Redirect::to("/products");
    }

    match state.products().delete(id).await {
        Ok(()) => {
            Flash::set(&session, FlashKind::Success, format!("Product #{id} deleted")).await;
        }
        Err(err @ MutationError::ReadOnly) => {
            Flash::set(&session, FlashKind::Warning, err.user_message()).await;
        }
        Err(err) => {
            tracing::error!(product_id = %id, error = %err, "Product delete failed");
            Flash::set(&session, FlashKind::Error, err.user_message()).await;
        }
    }
    Redirect::to("/products")
}

/// Report a failed create or update.
///
/// Preview mode goes back to the list with a warning; anything else
/// re-renders the form with the submitted values.
async fn mutation_failed(
    state: &AppState,
    session: &Session,
    target: Option<ProductId>,
    form: ProductForm,
    err: &MutationError,
) -> Response {
    if matches!(err, MutationError::ReadOnly) {
        Flash::set(session, FlashKind::Warning, err.user_message()).await;
        return Redirect::to("/products").into_response();
    }
    if matches!(err, MutationError::Store(_)) {
        tracing::error!(error = %err, "Product save failed");
    }

    let page = PageContext::load(state, session, "products").await;
    let mut template = ProductFormTemplate::new(page, target, form);
    template.error = Some(err.user_message());
    template.into_response()
}
