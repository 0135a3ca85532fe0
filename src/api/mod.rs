//! Backend contract consumed by the storefront.

use async_trait::async_trait;

use crate::errors::ClientError;
use crate::models::{
    AccessToken, BehaviorEvent, CartItemId, CartLineItem, CreateOrderRequest, LoginResponse, Order,
    PaymentVerification, ProductId, Quantity, RegisterRequest, User,
};

mod http;

pub use http::HttpStorefrontApi;

/// The backend exposes two routes that delete a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalRoute {
    /// `DELETE /api/cart/remove/{id}`, used by the cart drawer
    Legacy,
    /// `DELETE /api/cart/{id}`, used by the checkout page
    Canonical,
}

impl RemovalRoute {
    pub(crate) fn path(self, item: CartItemId) -> String {
        match self {
            Self::Legacy => format!("api/cart/remove/{}", item),
            Self::Canonical => format!("api/cart/{}", item),
        }
    }
}

/// One method per backend endpoint. Authenticated calls take the bearer token
/// explicitly so callers decide what happens when none is stored.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// `POST /api/auth/login` (form encoded)
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError>;

    /// `POST /api/auth/register`
    async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError>;

    /// `GET /api/auth/me`
    async fn current_user(&self, token: &AccessToken) -> Result<User, ClientError>;

    /// `GET /api/cart/`
    async fn cart_items(&self, token: &AccessToken) -> Result<Vec<CartLineItem>, ClientError>;

    /// `POST /api/cart/add/{product}?quantity=N`
    async fn add_to_cart(
        &self,
        token: &AccessToken,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), ClientError>;

    async fn remove_cart_item(
        &self,
        token: &AccessToken,
        item: CartItemId,
        route: RemovalRoute,
    ) -> Result<(), ClientError>;

    /// `PUT /api/cart/{item}` with `{"quantity": N}`
    async fn update_cart_item(
        &self,
        token: &AccessToken,
        item: CartItemId,
        quantity: Quantity,
    ) -> Result<(), ClientError>;

    /// `DELETE /api/cart/clear`
    async fn clear_cart(&self, token: &AccessToken) -> Result<(), ClientError>;

    /// `POST /api/orders/`
    async fn create_order(
        &self,
        token: &AccessToken,
        request: &CreateOrderRequest,
    ) -> Result<Order, ClientError>;

    /// `POST /api/orders/verify-payment/{reference}`
    async fn verify_payment(
        &self,
        token: &AccessToken,
        reference: &str,
    ) -> Result<PaymentVerification, ClientError>;

    /// `POST /api/analytics/track-behavior`
    async fn track_behavior(
        &self,
        token: &AccessToken,
        event: &BehaviorEvent,
    ) -> Result<(), ClientError>;
}
