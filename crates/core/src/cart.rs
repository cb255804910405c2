//! Local cart store.
//!
//! The cart is an ordered list of line items persisted as one JSON string
//! under [`CART_STORAGE_KEY`] in a string key/value store. Every mutation
//! reads the list, changes it and writes the whole list back; there is no
//! locking, so two writers sharing a store race last-writer-wins.
//!
//! Anything that fails to decode reads as an empty cart. A corrupt or
//! foreign value is never an error for the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Money, Product, ProductId};

/// Key under which the cart is persisted.
pub const CART_STORAGE_KEY: &str = "aquarium_cart";

/// A string-keyed, string-valued store (the shape of browser local storage).
pub trait KeyValueStore {
    /// Read a value.
    fn get_item(&self, key: &str) -> Option<String>;
    /// Write a value, replacing any previous one.
    fn set_item(&mut self, key: &str, value: String);
    /// Delete a value.
    fn remove_item(&mut self, key: &str);
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a single entry.
    #[must_use]
    pub fn with_item(key: &str, value: String) -> Self {
        let mut storage = Self::new();
        storage.set_item(key, value);
        storage
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove_item(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// One cart line: the product as it was when added, plus a quantity.
///
/// The product fields are flattened next to `quantity` in the stored JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Snapshotted price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.product.price * self.quantity
    }
}

/// Cart operations over a [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct CartStore<S> {
    storage: S,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Wrap a store.
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Borrow the underlying store.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Unwrap the underlying store.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Current line items. Empty when nothing is stored or the value does not
    /// decode.
    pub fn get(&self) -> Vec<CartLine> {
        let Some(raw) = self.storage.get_item(CART_STORAGE_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Discarding undecodable cart");
            Vec::new()
        })
    }

    /// Add `quantity` of a product, merging with an existing line for the
    /// same id. A quantity of zero leaves the cart unchanged.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Vec<CartLine> {
        let mut lines = self.get();
        if quantity == 0 {
            return lines;
        }

        if let Some(line) = lines.iter_mut().find(|l| l.product.id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            lines.push(CartLine {
                product: product.clone(),
                quantity,
            });
        }

        self.save(&lines);
        lines
    }

    /// Remove the line for a product.
    pub fn remove(&mut self, product_id: ProductId) -> Vec<CartLine> {
        let mut lines = self.get();
        lines.retain(|l| l.product.id != product_id);
        self.save(&lines);
        lines
    }

    /// Delete the persisted cart entirely.
    pub fn clear(&mut self) {
        self.storage.remove_item(CART_STORAGE_KEY);
    }

    /// Change a line's quantity by `delta`. A result of zero or less removes
    /// the line. Unknown ids leave the cart unchanged.
    pub fn update_quantity(&mut self, product_id: ProductId, delta: i64) -> Vec<CartLine> {
        let mut lines = self.get();
        let Some(line) = lines.iter_mut().find(|l| l.product.id == product_id) else {
            return lines;
        };

        let next = i64::from(line.quantity).saturating_add(delta);
        if next <= 0 {
            return self.remove(product_id);
        }
        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);

        self.save(&lines);
        lines
    }

    /// Sum of snapshotted price times quantity, recomputed on every call.
    pub fn total(&self) -> Money {
        self.get().iter().map(CartLine::subtotal).sum()
    }

    /// Total number of items across all lines.
    pub fn item_count(&self) -> u32 {
        self.get()
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    fn save(&mut self, lines: &[CartLine]) {
        match serde_json::to_string(lines) {
            Ok(raw) => self.storage.set_item(CART_STORAGE_KEY, raw),
            Err(e) => tracing::error!(error = %e, "Failed to encode cart"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::{ProductStatus, ProductId};

    fn product(id: i64, name: &str, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            category: None,
            gender: None,
            price: Money::new(price),
            stock: 5,
            status: ProductStatus::Available,
            image_url: None,
            note: None,
            created_at: None,
        }
    }

    fn cart() -> CartStore<MemoryStorage> {
        CartStore::new(MemoryStorage::new())
    }

    #[test]
    fn test_empty_store_reads_as_empty_cart() {
        let cart = cart();
        assert!(cart.get().is_empty());
        assert_eq!(cart.total(), Money::ZERO);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_undecodable_value_reads_as_empty_cart() {
        for raw in ["not json", "{\"id\":1}", "[{\"quantity\":-1}]", ""] {
            let cart = CartStore::new(MemoryStorage::with_item(CART_STORAGE_KEY, raw.to_string()));
            assert!(cart.get().is_empty(), "{raw:?} should read as empty");
        }
    }

    #[test]
    fn test_repeated_adds_merge_into_one_line_per_id() {
        let mut cart = cart();
        let a = product(1, "A", 600);
        let b = product(2, "B", 450);

        cart.add(&a, 1);
        cart.add(&b, 2);
        cart.add(&a, 4);
        let lines = cart.add(&b, 1);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product.id, a.id);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[1].product.id, b.id);
        assert_eq!(lines[1].quantity, 3);
        assert_eq!(cart.get(), lines);
    }

    #[test]
    fn test_add_to_existing_line_scenario() {
        let mut cart = cart();
        let a = product(1, "A", 600);
        cart.add(&a, 1);

        let lines = cart.add(&a, 2);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(cart.total(), Money::new(1800));
    }

    #[test]
    fn test_add_zero_quantity_is_noop() {
        let mut cart = cart();
        assert!(cart.add(&product(1, "A", 600), 0).is_empty());
        assert_eq!(cart.storage().get_item(CART_STORAGE_KEY), None);
    }

    #[test]
    fn test_remove_drops_line_regardless_of_quantity() {
        let mut cart = cart();
        cart.add(&product(1, "A", 600), 7);
        cart.add(&product(2, "B", 450), 1);

        cart.remove(ProductId::new(1));

        let lines = cart.get();
        assert_eq!(lines.len(), 1);
        assert!(lines.iter().all(|l| l.product.id != ProductId::new(1)));
    }

    #[test]
    fn test_clear_deletes_key() {
        let mut cart = cart();
        cart.add(&product(1, "A", 600), 1);
        cart.clear();
        assert_eq!(cart.storage().get_item(CART_STORAGE_KEY), None);
        assert!(cart.get().is_empty());
    }

    #[test]
    fn test_update_quantity_positive_result_sets_quantity() {
        let mut cart = cart();
        cart.add(&product(1, "A", 600), 2);

        let lines = cart.update_quantity(ProductId::new(1), 3);
        assert_eq!(lines[0].quantity, 5);

        let lines = cart.update_quantity(ProductId::new(1), -4);
        assert_eq!(lines[0].quantity, 1);
        assert_eq!(cart.get()[0].quantity, 1);
    }

    #[test]
    fn test_update_quantity_to_zero_or_below_removes_line() {
        let mut cart = cart();
        cart.add(&product(1, "A", 600), 2);
        cart.add(&product(2, "B", 450), 1);

        assert_eq!(cart.update_quantity(ProductId::new(1), -2).len(), 1);
        assert!(cart.update_quantity(ProductId::new(2), -10).is_empty());
    }

    #[test]
    fn test_update_quantity_unknown_id_is_noop() {
        let mut cart = cart();
        cart.add(&product(1, "A", 600), 2);
        let lines = cart.update_quantity(ProductId::new(99), 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_total_uses_snapshotted_price() {
        let mut cart = cart();
        let mut a = product(1, "A", 600);
        cart.add(&a, 2);

        // The catalog price changes after the product was added.
        a.price = Money::new(9999);
        cart.add(&a, 1);

        assert_eq!(cart.get()[0].product.price, Money::new(600));
        assert_eq!(cart.total(), Money::new(1800));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_stored_json_flattens_product_fields() {
        let mut cart = cart();
        cart.add(&product(1, "A", 600), 2);
        let raw = cart.storage().get_item(CART_STORAGE_KEY).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["name"], "A");
        assert_eq!(value[0]["price"], 600);
        assert_eq!(value[0]["quantity"], 2);
    }

    #[test]
    fn test_two_writers_last_writer_wins() {
        let mut first = cart();
        first.add(&product(1, "A", 600), 1);
        let shared = first.storage().clone();

        let mut tab_a = CartStore::new(shared.clone());
        let mut tab_b = CartStore::new(shared);
        tab_a.add(&product(2, "B", 450), 1);
        tab_b.add(&product(3, "C", 300), 1);

        // Each tab only saw the original line; neither sees the other's add.
        assert_eq!(tab_a.get().len(), 2);
        assert_eq!(tab_b.get().len(), 2);
        assert!(tab_b.get().iter().all(|l| l.product.id != ProductId::new(2)));
    }
}
