use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::api::{RemovalRoute, StorefrontApi};
use crate::errors::ClientError;
use crate::events::NoticeLevel;
use crate::models::{AccessToken, CartItemId, ProductId, Quantity};
use crate::navigation::{Location, Redirect};
use crate::state::{AppState, CartSnapshot, ResourceKey};

const LOGIN_TO_VIEW_CART: &str = "Please login to view cart";
const LOGIN_TO_ADD: &str = "Please login to add items to cart";
const LOGIN_TO_CHECKOUT: &str = "Please login to checkout";

/// Keeps the local cart snapshot in step with the backend cart resource.
///
/// Every successful mutation is followed by a full reload; the snapshot is never
/// patched locally.
#[derive(Clone)]
pub struct CartSynchronizer {
    api: Arc<dyn StorefrontApi>,
    state: Arc<AppState>,
}

impl CartSynchronizer {
    pub fn new(api: Arc<dyn StorefrontApi>, state: Arc<AppState>) -> Self {
        Self { api, state }
    }

    pub fn api(&self) -> &Arc<dyn StorefrontApi> {
        &self.api
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Fetches the cart and reconciles it into state. Silent: callers decide
    /// whether a failure deserves a notice.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<Arc<CartSnapshot>, ClientError> {
        let token = self.state.require_token(LOGIN_TO_VIEW_CART)?;
        self.reload_with(&token).await
    }

    async fn reload_with(&self, token: &AccessToken) -> Result<Arc<CartSnapshot>, ClientError> {
        let ticket = self.state.begin_reload();
        let items = self.api.cart_items(token).await.map_err(|e| {
            self.state.sign_out_if_rejected(&e);
            e
        })?;
        self.state.reconcile_cart(ticket, items);
        Ok(self.state.cart())
    }

    /// Snapshot for the cart drawer; signed-out shoppers get a notice instead.
    pub fn open(&self) -> Result<Arc<CartSnapshot>, ClientError> {
        self.token_or_notice(LOGIN_TO_VIEW_CART)?;
        Ok(self.state.cart())
    }

    /// Adds `quantity` (default one) of a product.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        product: ProductId,
        quantity: Option<Quantity>,
    ) -> Result<(), ClientError> {
        let token = self.token_or_notice(LOGIN_TO_ADD)?;
        let quantity = quantity.unwrap_or_default();

        let _guard = self.state.lock_resource(ResourceKey::Product(product)).await;
        let result = self.api.add_to_cart(&token, product, quantity).await;
        if result.is_ok() {
            info!(%product, %quantity, "Added product to cart");
        }
        self.settle(&token, result, Some("Product added to cart!"), "Error adding to cart")
            .await
    }

    /// Removes a line. The checkout page and the drawer word failures differently.
    #[instrument(skip(self))]
    pub async fn remove(&self, item: CartItemId, route: RemovalRoute) -> Result<(), ClientError> {
        let token = self.token_or_notice(LOGIN_TO_VIEW_CART)?;

        let _guard = self.state.lock_resource(ResourceKey::Item(item)).await;
        let result = self.api.remove_cart_item(&token, item, route).await;
        if result.is_ok() {
            info!(%item, "Removed cart item");
        }
        let fallback = match route {
            RemovalRoute::Legacy => "Error removing item",
            RemovalRoute::Canonical => "Failed to remove item",
        };
        self.settle(&token, result, Some("Item removed from cart"), fallback)
            .await
    }

    /// Sets a line's quantity, clamped to `[1, 99]` before anything is sent.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        item: CartItemId,
        requested: i64,
    ) -> Result<Quantity, ClientError> {
        let token = self.token_or_notice(LOGIN_TO_VIEW_CART)?;
        let quantity = Quantity::clamped(requested);

        let _guard = self.state.lock_resource(ResourceKey::Item(item)).await;
        let result = self.api.update_cart_item(&token, item, quantity).await;
        if result.is_ok() {
            info!(%item, %quantity, requested, "Updated cart item quantity");
        }
        self.settle(&token, result, None, "Failed to update quantity")
            .await?;
        Ok(quantity)
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), ClientError> {
        let token = self.token_or_notice(LOGIN_TO_VIEW_CART)?;

        let _guard = self.state.lock_resource(ResourceKey::Cart).await;
        let result = self.api.clear_cart(&token).await;
        if result.is_ok() {
            info!("Cleared cart");
            // Known empty even if the follow-up reload fails.
            self.state.clear_cart();
        }
        self.settle(&token, result, Some("Cart cleared"), "Error clearing cart")
            .await
    }

    /// Sends a signed-in shopper to the checkout page.
    pub fn require_checkout(&self) -> Result<Redirect, ClientError> {
        self.token_or_notice(LOGIN_TO_CHECKOUT)?;
        let redirect = Redirect::now(Location::Checkout);
        self.state.events().navigate(redirect.clone());
        Ok(redirect)
    }

    fn token_or_notice(&self, message: &str) -> Result<AccessToken, ClientError> {
        self.state.require_token(message).map_err(|e| {
            self.state.events().notify(NoticeLevel::Error, message);
            e
        })
    }

    /// Reloads after a successful mutation and reports the outcome.
    async fn settle(
        &self,
        token: &AccessToken,
        result: Result<(), ClientError>,
        success: Option<&str>,
        fallback: &str,
    ) -> Result<(), ClientError> {
        match result {
            Ok(()) => {
                if let Err(e) = self.reload_with(token).await {
                    warn!(error = %e, "Cart reload after mutation failed");
                }
                if let Some(message) = success {
                    self.state.events().notify(NoticeLevel::Success, message);
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Cart mutation failed");
                self.state.sign_out_if_rejected(&e);
                self.state
                    .events()
                    .notify(NoticeLevel::Error, e.notice_message(fallback));
                Err(e)
            }
        }
    }
}
