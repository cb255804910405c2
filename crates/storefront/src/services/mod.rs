//! Storefront business logic between routes and the remote store.

pub mod cart;
pub mod checkout;

pub use cart::SessionCart;
pub use checkout::{
    CheckoutDetails, CheckoutError, CheckoutFlow, CheckoutForm, CheckoutState, OrderReceipt,
    PartialOrderPolicy, submit_order,
};
