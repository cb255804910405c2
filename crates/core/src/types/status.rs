//! Status enums for products and orders.

use serde::{Deserialize, Serialize};

/// Catalog status of a product.
///
/// The first three values are the real catalog states. The order-lifecycle
/// values are accepted too because the admin form historically offered them
/// for products as well; only `Available` is shown on the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Available,
    Sold,
    Hold,
    Pending,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl ProductStatus {
    /// All statuses in the order the admin form lists them.
    pub const ALL: [Self; 8] = [
        Self::Available,
        Self::Sold,
        Self::Hold,
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Wire value, as stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
            Self::Hold => "hold",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label for the admin table.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "On sale",
            Self::Sold => "Sold",
            Self::Hold => "On hold",
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether the storefront lists products in this status.
    #[must_use]
    pub const fn is_storefront_visible(self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid product status: {s}"))
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether the order contributes to revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Stock level bucket used to color stock counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockLevel {
    OutOfStock,
    Low,
    InStock,
}

/// Stock at or below this count is shown as low.
pub const LOW_STOCK_THRESHOLD: i64 = 3;

impl StockLevel {
    /// Bucket a stock count.
    #[must_use]
    pub const fn from_stock(stock: i64) -> Self {
        if stock <= 0 {
            Self::OutOfStock
        } else if stock <= LOW_STOCK_THRESHOLD {
            Self::Low
        } else {
            Self::InStock
        }
    }

    /// CSS class for templates.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::OutOfStock => "out-of-stock",
            Self::Low => "low-stock",
            Self::InStock => "in-stock",
        }
    }
}
