//! Admin dashboard statistics.

use crate::types::{Money, Order, Product};

/// Headline numbers for the admin panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub product_count: usize,
    pub total_stock: i64,
    pub order_count: usize,
    /// Sum of order totals, excluding cancelled orders.
    pub revenue: Money,
}

impl CatalogStats {
    #[must_use]
    pub fn compute(products: &[Product], orders: &[Order]) -> Self {
        Self {
            product_count: products.len(),
            total_stock: products
                .iter()
                .fold(0i64, |sum, p| sum.saturating_add(p.stock)),
            order_count: orders.len(),
            revenue: orders
                .iter()
                .filter(|o| o.status.counts_as_revenue())
                .map(Order::total)
                .sum(),
        }
    }
}
