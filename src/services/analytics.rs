use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::StorefrontApi;
use crate::errors::ClientError;
use crate::models::{AccessToken, BehaviorAction, BehaviorEvent, ProductId};
use crate::state::AppState;

/// Reports shopper actions to the backend's behaviour log.
///
/// Delivery is best effort: nothing is retried and failures never reach the
/// shopper.
#[derive(Clone)]
pub struct BehaviorTracker {
    api: Arc<dyn StorefrontApi>,
    state: Arc<AppState>,
}

impl BehaviorTracker {
    pub fn new(api: Arc<dyn StorefrontApi>, state: Arc<AppState>) -> Self {
        Self { api, state }
    }

    /// Sends the event in the background. Returns whether anything was sent.
    ///
    /// Anonymous shoppers and events without a product are skipped.
    pub fn track(&self, action: BehaviorAction, product: Option<ProductId>) -> bool {
        let Some((token, event)) = self.prepare(action, product) else {
            return false;
        };

        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.track_behavior(&token, &event).await {
                warn!(error = %e, action = %event.action, "Behaviour tracking failed");
            }
        });
        true
    }

    /// Same as [`track`](Self::track) but waits for delivery, for callers
    /// that exit right after.
    pub async fn track_now(
        &self,
        action: BehaviorAction,
        product: Option<ProductId>,
    ) -> Result<bool, ClientError> {
        match self.prepare(action, product) {
            Some((token, event)) => {
                self.api.track_behavior(&token, &event).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn prepare(
        &self,
        action: BehaviorAction,
        product: Option<ProductId>,
    ) -> Option<(AccessToken, BehaviorEvent)> {
        let product = product?;
        match self.state.token() {
            Ok(Some(token)) => Some((token, BehaviorEvent::now(action, product))),
            _ => {
                debug!(%action, "Skipping behaviour event for anonymous shopper");
                None
            }
        }
    }
}
