//! Checkout and order submission.
//!
//! An order is written as two independent requests: the header into
//! `orders`, then one row per cart line into `order_items` referencing the
//! generated order id. The store offers no transaction across the two, so a
//! failed lines write leaves an orphaned header. [`PartialOrderPolicy`]
//! decides what happens then.

use std::fmt;
use std::str::FromStr;

use aquarium_core::cart::{CartLine, CartStore, KeyValueStore};
use aquarium_core::links::OrderContact;
use aquarium_core::{
    InsertedOrder, Money, NewOrder, NewOrderLine, ORDER_ITEMS_TABLE, ORDERS_TABLE, OrderId,
    OrderStatus,
};
use aquarium_supabase::{StoreError, TableStore, delete_row, insert_rows};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// Handling of an order whose header was written but whose lines were not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialOrderPolicy {
    /// Delete the header again and report failure; the cart is kept.
    #[default]
    Compensate,
    /// Keep the header without lines and report success.
    AcceptPartial,
}

impl fmt::Display for PartialOrderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compensate => write!(f, "compensate"),
            Self::AcceptPartial => write!(f, "accept"),
        }
    }
}

impl FromStr for PartialOrderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compensate" => Ok(Self::Compensate),
            "accept" | "accept-partial" => Ok(Self::AcceptPartial),
            other => Err(format!(
                "unknown policy '{other}', expected 'compensate' or 'accept'"
            )),
        }
    }
}

/// Raw checkout form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_line_id: String,
    pub shipping_address: String,
    pub note: String,
}

/// Validated contact and shipping details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_line_id: Option<String>,
    pub shipping_address: String,
    pub note: Option<String>,
}

impl TryFrom<&CheckoutForm> for CheckoutDetails {
    type Error = CheckoutError;

    fn try_from(form: &CheckoutForm) -> Result<Self, Self::Error> {
        Ok(Self {
            customer_name: required(&form.customer_name, "Name")?,
            customer_phone: required(&form.customer_phone, "Phone")?,
            customer_line_id: optional(&form.customer_line_id),
            shipping_address: required(&form.shipping_address, "Shipping address")?,
            note: optional(&form.note),
        })
    }
}

impl CheckoutDetails {
    /// Contact fields for an order summary.
    #[must_use]
    pub fn contact(&self) -> OrderContact {
        OrderContact {
            name: self.customer_name.clone(),
            phone: self.customer_phone.clone(),
            line_id: self.customer_line_id.clone(),
            address: self.shipping_address.clone(),
            note: self.note.clone(),
        }
    }

    fn new_order(&self, total_amount: Money) -> NewOrder {
        NewOrder {
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            customer_line_id: self.customer_line_id.clone(),
            shipping_address: self.shipping_address.clone(),
            total_amount,
            note: self.note.clone(),
            status: OrderStatus::Pending,
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, CheckoutError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Why a checkout did not produce an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Could not submit from the {0} state")]
    InvalidState(&'static str),

    #[error("Failed to create order: {0}")]
    Header(#[source] StoreError),

    #[error("Failed to save items for order {order_id}: {source}")]
    Lines {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },
}

impl CheckoutError {
    /// Message for the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart | Self::MissingField(_) | Self::InvalidState(_) => self.to_string(),
            Self::Header(_) | Self::Lines { .. } => {
                "We could not place your order. Your cart has been kept, please try again."
                    .to_string()
            }
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total: Money,
    pub line_count: usize,
    /// False when the lines write failed under [`PartialOrderPolicy::AcceptPartial`].
    pub lines_written: bool,
}

/// Write an order header and its lines.
///
/// # Errors
///
/// Returns an error if the cart is empty, the header write fails, or the
/// lines write fails under [`PartialOrderPolicy::Compensate`].
#[instrument(skip(store, lines, details), fields(line_count = lines.len()))]
pub async fn submit_order<S: TableStore>(
    store: &S,
    lines: &[CartLine],
    details: &CheckoutDetails,
    policy: PartialOrderPolicy,
) -> Result<OrderReceipt, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let total: Money = lines.iter().map(CartLine::subtotal).sum();
    let header = details.new_order(total);

    let inserted: Vec<InsertedOrder> = insert_rows(store, ORDERS_TABLE, &[header])
        .await
        .map_err(CheckoutError::Header)?;
    let order_id = inserted
        .first()
        .map(|o| o.id)
        .ok_or_else(|| {
            CheckoutError::Header(StoreError::Unavailable(
                "order insert returned no rows".to_string(),
            ))
        })?;

    let order_lines: Vec<NewOrderLine> = lines
        .iter()
        .map(|line| NewOrderLine::from_cart_line(order_id, line))
        .collect();

    let lines_written =
        match insert_rows::<_, _, serde_json::Value>(store, ORDER_ITEMS_TABLE, &order_lines).await
        {
            Ok(_) => true,
            Err(source) => match policy {
                PartialOrderPolicy::Compensate => {
                    compensate(store, order_id).await;
                    return Err(CheckoutError::Lines { order_id, source });
                }
                PartialOrderPolicy::AcceptPartial => {
                    tracing::warn!(
                        order_id = %order_id,
                        error = %source,
                        "Order lines failed, keeping order without lines"
                    );
                    false
                }
            },
        };

    tracing::info!(order_id = %order_id, total = total.amount(), lines_written, "Order placed");
    Ok(OrderReceipt {
        order_id,
        total,
        line_count: order_lines.len(),
        lines_written,
    })
}

/// Remove a header whose lines could not be written.
async fn compensate<S: TableStore>(store: &S, order_id: OrderId) {
    match delete_row(store, ORDERS_TABLE, &order_id.to_string()).await {
        Ok(()) => tracing::warn!(order_id = %order_id, "Order lines failed, order header removed"),
        Err(e) => tracing::error!(
            order_id = %order_id,
            error = %e,
            "Order lines failed and the orphaned order header could not be removed"
        ),
    }
}

/// Where a checkout attempt stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckoutState {
    #[default]
    Idle,
    FormOpen,
    Submitting,
    Success(OrderReceipt),
    /// Customer-facing reason.
    Failed(String),
}

impl CheckoutState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FormOpen => "form-open",
            Self::Submitting => "submitting",
            Self::Success(_) => "success",
            Self::Failed(_) => "failed",
        }
    }
}

/// One checkout attempt: `Idle → FormOpen → Submitting → Success | Failed`.
#[derive(Debug, Default)]
pub struct CheckoutFlow {
    state: CheckoutState,
}

impl CheckoutFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Open the form. An empty cart leaves the state unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] if there is nothing to order.
    pub fn open(&mut self, lines: &[CartLine]) -> Result<(), CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if matches!(self.state, CheckoutState::Idle | CheckoutState::Failed(_)) {
            self.state = CheckoutState::FormOpen;
        }
        Ok(())
    }

    /// Validate the form, snapshot the cart and place the order. The cart is
    /// cleared only on success.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the form open, if the flow is not open or
    /// the form is invalid. Store failures are reported through the
    /// [`CheckoutState::Failed`] state instead.
    pub async fn submit<S, K>(
        &mut self,
        store: &S,
        cart: &mut CartStore<K>,
        form: &CheckoutForm,
        policy: PartialOrderPolicy,
    ) -> Result<&CheckoutState, CheckoutError>
    where
        S: TableStore,
        K: KeyValueStore,
    {
        if self.state != CheckoutState::FormOpen {
            return Err(CheckoutError::InvalidState(self.state.name()));
        }
        let details = CheckoutDetails::try_from(form)?;

        self.state = CheckoutState::Submitting;
        let lines = cart.get();

        self.state = match submit_order(store, &lines, &details, policy).await {
            Ok(receipt) => {
                cart.clear();
                CheckoutState::Success(receipt)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Checkout failed");
                CheckoutState::Failed(e.user_message())
            }
        };
        Ok(&self.state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use aquarium_core::cart::MemoryStorage;
    use aquarium_core::sample;
    use aquarium_supabase::{MemoryTableStore, Operation};

    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm {
            customer_name: " Lin ".to_string(),
            customer_phone: "0912345678".to_string(),
            customer_line_id: String::new(),
            shipping_address: "Taipei".to_string(),
            note: "Evening please".to_string(),
        }
    }

    /// Cart with product 1 x3 (1800) and product 2 x1 (450).
    fn cart() -> CartStore<MemoryStorage> {
        let catalog = sample::catalog();
        let mut cart = CartStore::new(MemoryStorage::new());
        cart.add(&catalog[0], 3);
        cart.add(&catalog[1], 1);
        cart
    }

    fn open_flow(cart: &CartStore<MemoryStorage>) -> CheckoutFlow {
        let mut flow = CheckoutFlow::new();
        flow.open(&cart.get()).unwrap();
        flow
    }

    #[tokio::test]
    async fn test_successful_checkout_writes_header_and_lines() {
        let store = MemoryTableStore::new();
        let mut cart = cart();
        let mut flow = open_flow(&cart);

        let state = flow
            .submit(&store, &mut cart, &form(), PartialOrderPolicy::Compensate)
            .await
            .unwrap()
            .clone();

        let CheckoutState::Success(receipt) = state else {
            panic!("expected success, got {state:?}");
        };
        assert_eq!(receipt.total, Money::new(2250));
        assert_eq!(receipt.line_count, 2);
        assert!(receipt.lines_written);
        assert!(cart.get().is_empty());

        let orders = store.rows(ORDERS_TABLE);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0]["total_amount"], 2250);
        assert_eq!(orders[0]["status"], "pending");
        assert_eq!(orders[0]["customer_name"], "Lin");
        assert!(orders[0]["customer_line_id"].is_null());

        let items = store.rows(ORDER_ITEMS_TABLE);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i["order_id"] == orders[0]["id"]));
        assert_eq!(items[0]["subtotal"], 1800);
        assert_eq!(items[0]["product_name"], "Red Albino");
    }

    #[tokio::test]
    async fn test_header_failure_keeps_cart_and_writes_nothing() {
        let store = MemoryTableStore::new();
        store.fail_next(Operation::Insert, ORDERS_TABLE);
        let mut cart = cart();
        let mut flow = open_flow(&cart);

        let state = flow
            .submit(&store, &mut cart, &form(), PartialOrderPolicy::Compensate)
            .await
            .unwrap();

        assert!(matches!(state, CheckoutState::Failed(_)));
        assert_eq!(cart.get().len(), 2);
        assert!(store.rows(ORDERS_TABLE).is_empty());
        assert!(store.rows(ORDER_ITEMS_TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_lines_failure_compensates_by_default() {
        let store = MemoryTableStore::new();
        store.fail_next(Operation::Insert, ORDER_ITEMS_TABLE);
        let mut cart = cart();
        let mut flow = open_flow(&cart);

        let state = flow
            .submit(&store, &mut cart, &form(), PartialOrderPolicy::default())
            .await
            .unwrap();

        assert!(matches!(state, CheckoutState::Failed(_)));
        assert_eq!(cart.get().len(), 2);
        assert!(store.rows(ORDERS_TABLE).is_empty());
        assert!(store.rows(ORDER_ITEMS_TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_lines_failure_with_failed_compensation_reports_failure() {
        let store = MemoryTableStore::new();
        store.fail_next(Operation::Insert, ORDER_ITEMS_TABLE);
        store.fail_next(Operation::Delete, ORDERS_TABLE);
        let details = CheckoutDetails::try_from(&form()).unwrap();

        let err = submit_order(&store, &cart().get(), &details, PartialOrderPolicy::Compensate)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Lines { .. }));
        assert_eq!(store.rows(ORDERS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn test_lines_failure_accepted_as_partial_order() {
        let store = MemoryTableStore::new();
        store.fail_next(Operation::Insert, ORDER_ITEMS_TABLE);
        let mut cart = cart();
        let mut flow = open_flow(&cart);

        let state = flow
            .submit(&store, &mut cart, &form(), PartialOrderPolicy::AcceptPartial)
            .await
            .unwrap()
            .clone();

        let CheckoutState::Success(receipt) = state else {
            panic!("expected success, got {state:?}");
        };
        assert!(!receipt.lines_written);
        assert!(cart.get().is_empty());
        assert_eq!(store.rows(ORDERS_TABLE).len(), 1);
        assert!(store.rows(ORDER_ITEMS_TABLE).is_empty());
    }

    #[test]
    fn test_empty_cart_cannot_open_form() {
        let mut flow = CheckoutFlow::new();
        assert!(matches!(flow.open(&[]), Err(CheckoutError::EmptyCart)));
        assert_eq!(flow.state(), &CheckoutState::Idle);
    }

    #[tokio::test]
    async fn test_submit_requires_open_form() {
        let store = MemoryTableStore::new();
        let mut cart = cart();
        let mut flow = CheckoutFlow::new();

        let err = flow
            .submit(&store, &mut cart, &form(), PartialOrderPolicy::Compensate)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState("idle")));
    }

    #[tokio::test]
    async fn test_invalid_form_keeps_form_open() {
        let store = MemoryTableStore::new();
        let mut cart = cart();
        let mut flow = open_flow(&cart);
        let mut form = form();
        form.shipping_address = "   ".to_string();

        let err = flow
            .submit(&store, &mut cart, &form, PartialOrderPolicy::Compensate)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Shipping address is required");
        assert_eq!(flow.state(), &CheckoutState::FormOpen);
        assert!(store.rows(ORDERS_TABLE).is_empty());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "compensate".parse::<PartialOrderPolicy>().unwrap(),
            PartialOrderPolicy::Compensate
        );
        assert_eq!(
            "Accept-Partial".parse::<PartialOrderPolicy>().unwrap(),
            PartialOrderPolicy::AcceptPartial
        );
        assert!("sometimes".parse::<PartialOrderPolicy>().is_err());
    }
}
