//! Session-related types.
//!
//! The session is the storefront's per-browser key/value store: it holds the
//! cart under the same key a browser would use for local storage, plus a
//! one-shot flash message.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Warning,
    Error,
}

impl FlashKind {
    /// CSS class for the message banner.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Warning => "flash-warning",
            Self::Error => "flash-error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Store a flash for the next page.
    pub async fn set(session: &Session, kind: FlashKind, message: impl Into<String>) {
        if let Err(e) = session.insert(keys::FLASH, Self::new(kind, message)).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Take the pending flash, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session.remove::<Self>(keys::FLASH).await.ok().flatten()
    }
}

/// Session keys.
pub mod keys {
    /// Key for the JSON-encoded cart line items.
    pub const CART: &str = aquarium_core::cart::CART_STORAGE_KEY;

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}
