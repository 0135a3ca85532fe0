use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::cart::CartSynchronizer;
use crate::api::StorefrontApi;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::events::NoticeLevel;
use crate::models::{AccessToken, RegisterRequest, User};
use crate::navigation::{Location, Redirect};
use crate::state::{AppState, SessionStatus};

/// What happened after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Admins are sent to the dashboard after a short delay
    Admin(Redirect),
    /// Everyone else stays and gets their cart loaded
    Shopper,
}

/// Mirrors the signed-in account from the stored token.
#[derive(Clone)]
pub struct SessionService {
    api: Arc<dyn StorefrontApi>,
    state: Arc<AppState>,
    cart: CartSynchronizer,
    config: Arc<ClientConfig>,
}

impl SessionService {
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        state: Arc<AppState>,
        cart: CartSynchronizer,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            api,
            state,
            cart,
            config,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.state.session()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.current_user()
    }

    /// Restores the session from a stored token.
    ///
    /// Any failure to fetch the current user shows the signed-out state. The
    /// token is discarded too, unless `keep_token_on_transient_failure` is set
    /// and the backend did not explicitly reject it.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionStatus {
        let token = match self.state.token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.state.set_session(SessionStatus::SignedOut);
                return SessionStatus::SignedOut;
            }
            Err(e) => {
                warn!(error = %e, "Token store unreadable; starting signed out");
                self.state.set_session(SessionStatus::SignedOut);
                return SessionStatus::SignedOut;
            }
        };

        match self.api.current_user(&token).await {
            Ok(user) => {
                info!(username = %user.username, role = %user.role, "Session restored");
                let status = SessionStatus::SignedIn(user);
                self.state.set_session(status.clone());

                if let Err(e) = self.cart.reload().await {
                    warn!(error = %e, "Initial cart load failed");
                }
                status
            }
            Err(e) => {
                let discard = !self.config.keep_token_on_transient_failure || e.is_auth_rejection();
                warn!(error = %e, discard_token = discard, "Current user fetch failed");

                if discard {
                    if let Err(e) = self.state.discard_token() {
                        warn!(error = %e, "Failed to discard token");
                    }
                }
                self.state.set_session(SessionStatus::SignedOut);
                SessionStatus::SignedOut
            }
        }
    }

    /// Signs in, stores the token and routes the user by role.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, ClientError> {
        let response = match self.api.login(username, password).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login rejected");
                self.state
                    .events()
                    .notify(NoticeLevel::Error, e.notice_message("Login failed"));
                return Err(e);
            }
        };

        let token = AccessToken::new(response.access_token);
        if let Err(e) = self.state.store_token(&token) {
            self.state.events().notify(NoticeLevel::Error, "Login failed");
            return Err(e);
        }
        self.state
            .events()
            .notify(NoticeLevel::Success, "Login successful!");

        match self.api.current_user(&token).await {
            Ok(user) => {
                info!(username = %user.username, role = %user.role, "Logged in");
                let admin = user.is_admin();
                self.state.set_session(SessionStatus::SignedIn(user));

                if admin {
                    let redirect =
                        Redirect::after(Location::Admin, self.config.admin_redirect_delay());
                    self.state.events().notify(
                        NoticeLevel::Success,
                        "Welcome Admin! Redirecting to admin dashboard...",
                    );
                    self.state.events().navigate(redirect.clone());
                    return Ok(LoginOutcome::Admin(redirect));
                }
            }
            Err(e) => warn!(error = %e, "Could not fetch user after login"),
        }

        if let Err(e) = self.cart.reload().await {
            warn!(error = %e, "Cart load after login failed");
        }
        Ok(LoginOutcome::Shopper)
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<(), ClientError> {
        if let Err(e) = request.validate() {
            let err = ClientError::from(e);
            self.state
                .events()
                .notify(NoticeLevel::Error, err.notice_message("Registration failed"));
            return Err(err);
        }

        match self.api.register(&request).await {
            Ok(()) => {
                info!("Registered account");
                self.state
                    .events()
                    .notify(NoticeLevel::Success, "Registration successful! Please login.");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Registration rejected");
                self.state
                    .events()
                    .notify(NoticeLevel::Error, e.notice_message("Registration failed"));
                Err(e)
            }
        }
    }

    /// Forgets token, user and cart, then returns to the landing page.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Redirect {
        if let Err(e) = self.state.clear() {
            warn!(error = %e, "Failed to remove stored token");
        }
        info!("Logged out");

        let redirect = Redirect::now(Location::Home);
        self.state
            .events()
            .notify(NoticeLevel::Info, "Logged out successfully");
        self.state.events().navigate(redirect.clone());
        redirect
    }
}
