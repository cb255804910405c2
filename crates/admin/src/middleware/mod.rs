//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Session layer (flash messages)

pub mod session;

pub use session::{SESSION_COOKIE_NAME, create_session_layer};
