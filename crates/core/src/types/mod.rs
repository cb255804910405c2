//! Core types for Aquarium Studio.
//!
//! These are the data contracts for rows exchanged with the hosted table
//! store. Remote rows are decoded into these types at the boundary; anything
//! that does not fit is rejected there rather than leaking into rendering.

pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod status;

pub use id::*;
pub use money::{DEFAULT_CURRENCY, Money};
pub use order::{InsertedOrder, NewOrder, NewOrderLine, ORDER_ITEMS_TABLE, ORDERS_TABLE, Order};
pub use product::{
    DraftError, PLACEHOLDER_IMAGE, PRODUCTS_TABLE, Product, ProductDraft, ProductForm,
};
pub use status::*;
