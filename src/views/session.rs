use serde::Serialize;

use crate::state::{AppState, CartSnapshot, SessionStatus};

/// Navigation bar: who is signed in and the cart badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HeaderView {
    SignedOut,
    SignedIn {
        username: String,
        is_admin: bool,
        /// Number of distinct cart lines
        cart_badge: usize,
    },
}

impl HeaderView {
    pub fn render(session: &SessionStatus, cart: &CartSnapshot) -> Self {
        match session.user() {
            Some(user) => Self::SignedIn {
                username: user.username.clone(),
                is_admin: user.is_admin(),
                cart_badge: cart.line_count(),
            },
            None => Self::SignedOut,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::render(&state.session(), &state.cart())
    }
}
