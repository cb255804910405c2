//! Session-backed cart.
//!
//! The cart logic is synchronous over a string key/value store. Each request
//! loads the session's cart value into a [`MemoryStorage`], runs the cart
//! operations, and writes the value back. Concurrent requests from one
//! browser race last-writer-wins.

use aquarium_core::cart::{CartStore, KeyValueStore, MemoryStorage};
use serde_json::Value;
use tower_sessions::Session;

use crate::models::session_keys;

/// A cart loaded from a session for the duration of one request.
#[derive(Debug)]
pub struct SessionCart {
    original: Option<String>,
    store: CartStore<MemoryStorage>,
}

impl SessionCart {
    /// Load the cart from the session.
    ///
    /// A value that is not a string is kept as its JSON text, which then
    /// fails to decode and reads as an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        let original = session
            .get_value(session_keys::CART)
            .await?
            .map(|value| match value {
                Value::String(raw) => raw,
                other => other.to_string(),
            });

        let storage = original.clone().map_or_else(MemoryStorage::new, |raw| {
            MemoryStorage::with_item(session_keys::CART, raw)
        });

        Ok(Self {
            original,
            store: CartStore::new(storage),
        })
    }

    /// The cart.
    #[must_use]
    pub const fn cart(&self) -> &CartStore<MemoryStorage> {
        &self.store
    }

    /// The cart, for mutation.
    pub const fn cart_mut(&mut self) -> &mut CartStore<MemoryStorage> {
        &mut self.store
    }

    /// Write the cart back if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn save(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        let current = self.store.storage().get_item(session_keys::CART);
        if current == self.original {
            return Ok(());
        }
        match current {
            Some(raw) => session.insert(session_keys::CART, raw).await,
            None => session
                .remove_value(session_keys::CART)
                .await
                .map(|_| ()),
        }
    }

    /// Load, apply `op`, save.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read or written.
    pub async fn update<R>(
        session: &Session,
        op: impl FnOnce(&mut CartStore<MemoryStorage>) -> R,
    ) -> Result<R, tower_sessions::session::Error> {
        let mut cart = Self::load(session).await?;
        let result = op(cart.cart_mut());
        cart.save(session).await?;
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use aquarium_core::{ProductId, sample};
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_update_persists_cart_json_in_session() {
        let session = session();
        let product = sample::catalog().remove(0);

        let lines = SessionCart::update(&session, |cart| cart.add(&product, 3))
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);

        let raw: String = session.get(session_keys::CART).await.unwrap().unwrap();
        assert!(raw.contains("\"quantity\":3"));

        let cart = SessionCart::load(&session).await.unwrap();
        assert_eq!(cart.cart().total().amount(), 1800);
    }

    #[tokio::test]
    async fn test_clear_removes_session_key() {
        let session = session();
        let product = sample::catalog().remove(0);
        SessionCart::update(&session, |cart| cart.add(&product, 1))
            .await
            .unwrap();

        SessionCart::update(&session, CartStore::clear).await.unwrap();

        assert!(
            session
                .get_value(session_keys::CART)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_non_string_value_reads_as_empty_cart() {
        let session = session();
        session
            .insert(session_keys::CART, serde_json::json!({"not": "a cart"}))
            .await
            .unwrap();

        let cart = SessionCart::load(&session).await.unwrap();
        assert!(cart.cart().get().is_empty());

        let lines = SessionCart::update(&session, |cart| {
            cart.update_quantity(ProductId::new(1), 1)
        })
        .await
        .unwrap();
        assert!(lines.is_empty());
    }
}
