//! Session-related types for the admin panel.
//!
//! Mutation outcomes are reported on the page after the redirect that
//! follows every write, so they travel through the session.

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
    /// Store a flash for the next page.
    pub async fn set(session: &Session, kind: FlashKind, message: impl Into<String>) {
        let flash = Self {
            kind,
            message: message.into(),
        };
        if let Err(e) = session.insert(keys::FLASH, flash).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Take the pending flash, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session.remove::<Self>(keys::FLASH).await.ok().flatten()
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for the pending flash message.
    pub const FLASH: &str = "admin_flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        Flash::set(&session, FlashKind::Warning, "Preview mode").await;

        let flash = Flash::take(&session).await.unwrap();
        assert_eq!(flash.kind, FlashKind::Warning);
        assert_eq!(flash.message, "Preview mode");
        assert!(Flash::take(&session).await.is_none());
    }
}
