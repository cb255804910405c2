//! Aquarium Studio Core - Domain types and client-side logic.
//!
//! This crate provides the pieces shared by every Aquarium Studio component:
//! - `storefront` - Public catalog, cart and checkout
//! - `admin` - Product management panel
//! - `cli` - Schema migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no network access, no
//! database access, no HTTP. Persistence is abstracted behind
//! [`cart::KeyValueStore`] so the cart behaves identically in tests and in a
//! session-backed web app.
//!
//! # Modules
//!
//! - [`types`] - Product, order and money contracts
//! - [`cart`] - Local cart store (merge-by-id line items)
//! - [`filter`] - Keyword and tag filtering over a cached catalog
//! - [`stats`] - Catalog and revenue statistics for the admin panel
//! - [`links`] - Order summaries and messaging/mail deep links
//! - [`sample`] - Static catalog used in preview mode

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod filter;
pub mod links;
pub mod sample;
pub mod stats;
pub mod types;

pub use types::*;
