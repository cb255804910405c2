//! Product rows and the admin write payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Money, ProductId, ProductStatus, StockLevel};

/// Remote table holding the catalog.
pub const PRODUCTS_TABLE: &str = "products";

/// Image shown when a product has no `image_url`.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x300?text=No+Image";

/// A catalog product as read from the remote store.
///
/// Decoding is the validation boundary: a row without an `id` or with a
/// blank `name` or unknown `status` fails to decode and is dropped by the
/// caller. `null` numbers become zero and blank optional text becomes `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(deserialize_with = "non_blank")]
    pub name: String,
    /// Category tag (`type` column).
    #[serde(rename = "type", default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stock: i64,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Stock level bucket for display.
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::from_stock(self.stock)
    }

    /// Image URL, falling back to the placeholder.
    #[must_use]
    pub fn image_or_placeholder(&self) -> &str {
        self.image_url.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }
}

/// Raw admin form input, every field as typed by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub gender: String,
    pub price: String,
    pub stock: String,
    pub image_url: String,
    pub status: String,
    pub note: String,
}

/// Validated product payload for create and update writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub gender: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
    pub status: ProductStatus,
    pub note: Option<String>,
}

/// Reasons a product form is refused before any write is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("product name is required")]
    MissingName,
    #[error("product price is required")]
    MissingPrice,
}

impl TryFrom<ProductForm> for ProductDraft {
    type Error = DraftError;

    fn try_from(form: ProductForm) -> Result<Self, Self::Error> {
        let name = form.name.trim().to_string();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        let price = Money::new(parse_lenient(&form.price));
        if price.is_zero() {
            return Err(DraftError::MissingPrice);
        }

        Ok(Self {
            name,
            category: trimmed(&form.category),
            gender: trimmed(&form.gender),
            price,
            stock: parse_lenient(&form.stock),
            image_url: trimmed(&form.image_url),
            status: form.status.trim().parse().unwrap_or_default(),
            note: trimmed(&form.note),
        })
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category.clone().unwrap_or_default(),
            gender: product.gender.clone().unwrap_or_default(),
            price: product.price.amount().to_string(),
            stock: product.stock.to_string(),
            image_url: product.image_url.clone().unwrap_or_default(),
            status: product.status.as_str().to_string(),
            note: product.note.clone().unwrap_or_default(),
        }
    }
}

/// Parse an integer field, treating anything unparsable as zero.
fn parse_lenient(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

fn trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn non_blank<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("name must not be blank"));
    }
    Ok(value)
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
