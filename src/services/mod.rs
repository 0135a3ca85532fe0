// Session and cart
pub mod cart;
pub mod session;

// Checkout form and payment gateway round trip
pub mod checkout;
pub mod payment;

// Fire-and-forget behaviour tracking
pub mod analytics;
