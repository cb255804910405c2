//! Session-held types for the admin panel.

pub mod session;

pub use session::{Flash, FlashKind, keys as session_keys};
