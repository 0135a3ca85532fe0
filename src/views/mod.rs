//! Render models derived from application state.
//!
//! Views hold display-ready strings and flags only; any renderer (terminal,
//! web front-end, tests) binds to them without touching the services.

pub mod cart;
pub mod checkout;
pub mod format;
pub mod session;

pub use cart::{CartRow, CartView, TotalsView};
pub use checkout::{CheckoutView, OrderConfirmationView};
pub use session::HeaderView;
