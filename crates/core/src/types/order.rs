//! Order headers and order lines.
//!
//! Orders are write-only from the storefront. Each order line embeds a
//! denormalized copy of the product name and price so later catalog edits
//! never rewrite order history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, OrderId, OrderStatus, ProductId};
use crate::cart::CartLine;

/// Remote table holding order headers.
pub const ORDERS_TABLE: &str = "orders";

/// Remote table holding order lines.
pub const ORDER_ITEMS_TABLE: &str = "order_items";

/// Order header payload written at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_line_id: Option<String>,
    pub shipping_address: String,
    pub total_amount: Money,
    pub note: Option<String>,
    pub status: OrderStatus,
}

/// Order line payload, one per cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

impl NewOrderLine {
    /// Snapshot a cart line for the given order.
    #[must_use]
    pub fn from_cart_line(order_id: OrderId, line: &CartLine) -> Self {
        Self {
            order_id,
            product_id: line.product.id,
            product_name: line.product.name.clone(),
            price: line.product.price,
            quantity: line.quantity,
            subtotal: line.subtotal(),
        }
    }
}

/// An order header as read back by the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub customer_line_id: Option<String>,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub total_amount: Option<Money>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Total, treating a missing amount as zero.
    #[must_use]
    pub fn total(&self) -> Money {
        self.total_amount.unwrap_or_default()
    }
}

/// Just the generated identifier from an insert with representation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InsertedOrder {
    pub id: OrderId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sample;

    #[test]
    fn test_order_line_snapshots_cart_line() {
        let product = sample::catalog().remove(0);
        let line = CartLine {
            product,
            quantity: 3,
        };
        let order_line = NewOrderLine::from_cart_line(OrderId::new(9), &line);
        assert_eq!(order_line.order_id, OrderId::new(9));
        assert_eq!(order_line.product_id, line.product.id);
        assert_eq!(order_line.subtotal, line.product.price * 3);

        let value = serde_json::to_value(&order_line).unwrap();
        assert_eq!(value["order_id"], 9);
        assert_eq!(value["quantity"], 3);
    }

    #[test]
    fn test_new_order_serializes_pending_status() {
        let order = NewOrder {
            customer_name: "Lin".to_string(),
            customer_phone: "0912".to_string(),
            customer_line_id: None,
            shipping_address: "Taipei".to_string(),
            total_amount: Money::new(1800),
            note: None,
            status: OrderStatus::default(),
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["total_amount"], 1800);
        assert!(value["customer_line_id"].is_null());
    }

    #[test]
    fn test_order_decodes_sparse_row() {
        let order: Order =
            serde_json::from_value(json!({"id": 4, "total_amount": null, "status": "cancelled"}))
                .unwrap();
        assert_eq!(order.total(), Money::ZERO);
        assert_eq!(order.status, OrderStatus::Cancelled);
    }
}
