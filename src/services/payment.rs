use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

use crate::api::StorefrontApi;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::events::NoticeLevel;
use crate::navigation::{Location, Redirect};
use crate::state::AppState;

const VERIFICATION_FAILED: &str = "Payment verification failed. Please contact support.";

/// Query parameters the gateway may put the reference in, by preference.
const REFERENCE_PARAMS: [&str; 2] = ["reference", "trxref"];

/// Handles the shopper's return from the external payment page.
#[derive(Clone)]
pub struct PaymentRedirectHandler {
    api: Arc<dyn StorefrontApi>,
    state: Arc<AppState>,
    config: Arc<ClientConfig>,
}

impl PaymentRedirectHandler {
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        state: Arc<AppState>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self { api, state, config }
    }

    /// True on the callback path, or whenever a reference parameter is present.
    pub fn is_callback(&self, url: &Url) -> bool {
        if url.path() == self.config.payment_callback_path {
            return true;
        }
        let query = url.query().unwrap_or_default();
        REFERENCE_PARAMS
            .iter()
            .any(|param| query.contains(&format!("{}=", param)))
    }

    /// `reference` if non-empty, else `trxref`.
    pub fn payment_reference(url: &Url) -> Option<String> {
        REFERENCE_PARAMS.iter().find_map(|param| {
            url.query_pairs()
                .find(|(key, value)| key == *param && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        })
    }

    /// Verifies the payment named in `url`.
    ///
    /// `Ok(None)` when the URL is not a callback or carries no reference.
    /// Verification is attempted once; there is no retry.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn handle(&self, url: &Url) -> Result<Option<Redirect>, ClientError> {
        if !self.is_callback(url) {
            return Ok(None);
        }
        let Some(reference) = Self::payment_reference(url) else {
            return Ok(None);
        };

        self.state
            .events()
            .notify(NoticeLevel::Info, "Verifying payment...");

        let verification = match self.state.token() {
            Ok(Some(token)) => self.api.verify_payment(&token, &reference).await,
            _ => Err(ClientError::Unauthenticated(
                "payment verification needs a signed-in shopper".into(),
            )),
        };

        match verification {
            Ok(verification) if verification.is_success() => {
                info!(%reference, "Payment verified");
                self.state.events().notify(
                    NoticeLevel::Success,
                    "Payment successful! Your order has been confirmed.",
                );
                let redirect = Redirect::after(
                    Location::Orders,
                    self.config.payment_success_redirect_delay(),
                );
                self.state.events().navigate(redirect.clone());
                Ok(Some(redirect))
            }
            Ok(verification) => {
                warn!(%reference, status = %verification.status, "Payment not confirmed");
                self.fail(verification.message.unwrap_or(verification.status))
            }
            Err(e) => {
                warn!(%reference, error = %e, "Payment verification request failed");
                self.state.sign_out_if_rejected(&e);
                self.fail(e.to_string())
            }
        }
    }

    fn fail(&self, reason: String) -> Result<Option<Redirect>, ClientError> {
        self.state
            .events()
            .notify(NoticeLevel::Error, VERIFICATION_FAILED);
        Err(ClientError::PaymentVerification(reason))
    }
}
