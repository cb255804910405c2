//! Admin business logic between routes and the remote store.

pub mod products;

pub use products::{MutationError, ProductService, all_products_query};
