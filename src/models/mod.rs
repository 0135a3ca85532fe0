//! Wire types exchanged with the shop backend.

pub mod analytics;
pub mod cart;
pub mod order;
pub mod user;

pub use analytics::{BehaviorAction, BehaviorEvent};
pub use cart::{CartItemId, CartLineItem, ProductId, Quantity};
pub use order::{
    CreateOrderRequest, CustomerInfo, Order, OrderId, OrderStatus, PaymentInitiation,
    PaymentVerification,
};
pub use user::{AccessToken, LoginResponse, RegisterRequest, Role, User};
