//! Storefront client library
//!
//! Client-side glue for the shop backend: the signed-in session mirrored from a
//! stored access token, the cart snapshot reconciled against the backend cart
//! resource, the checkout form state machine and the payment callback leg.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod api;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod navigation;
pub mod services;
pub mod state;
pub mod storage;
pub mod views;

use std::sync::Arc;

pub use api::{HttpStorefrontApi, StorefrontApi};
pub use config::ClientConfig;
pub use errors::{ClientError, ErrorKind};
pub use state::AppState;

/// Everything a front-end needs, wired against one backend and one token store.
#[derive(Clone)]
pub struct Storefront {
    pub state: Arc<AppState>,
    pub config: Arc<ClientConfig>,
    pub session: services::session::SessionService,
    pub cart: services::cart::CartSynchronizer,
    pub payments: services::payment::PaymentRedirectHandler,
    pub analytics: services::analytics::BehaviorTracker,
}

impl Storefront {
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn StorefrontApi>,
        token_store: Arc<dyn storage::TokenStore>,
    ) -> Self {
        let config = Arc::new(config);
        let state = Arc::new(AppState::new(token_store, config.pricing.policy()));
        let cart = services::cart::CartSynchronizer::new(api.clone(), state.clone());

        Self {
            session: services::session::SessionService::new(
                api.clone(),
                state.clone(),
                cart.clone(),
                config.clone(),
            ),
            payments: services::payment::PaymentRedirectHandler::new(
                api.clone(),
                state.clone(),
                config.clone(),
            ),
            analytics: services::analytics::BehaviorTracker::new(api, state.clone()),
            cart,
            state,
            config,
        }
    }

    /// Connects to the configured backend over HTTP.
    pub fn connect(
        config: ClientConfig,
        token_store: Arc<dyn storage::TokenStore>,
    ) -> Result<Self, ClientError> {
        let api = Arc::new(HttpStorefrontApi::new(&config)?);
        Ok(Self::new(config, api, token_store))
    }

    /// Starts a checkout form bound to this storefront's session and cart.
    pub fn checkout(&self) -> services::checkout::CheckoutOrchestrator {
        services::checkout::CheckoutOrchestrator::new(
            self.cart.clone(),
            self.state.clone(),
            self.config.clone(),
        )
    }
}
