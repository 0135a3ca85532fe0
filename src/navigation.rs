//! Redirect targets.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::models::OrderId;

/// A page the storefront can send the shopper to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Home,
    Admin,
    Checkout,
    Orders,
    Order(OrderId),
    PaymentCallback,
    /// Off-site page, e.g. the payment gateway
    External(Url),
}

impl Location {
    /// Path (or absolute URL for external targets).
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Admin => "/admin".to_string(),
            Self::Checkout => "/checkout".to_string(),
            Self::Orders => "/orders".to_string(),
            Self::Order(id) => format!("/orders/{}", id),
            Self::PaymentCallback => "/payment/callback".to_string(),
            Self::External(url) => url.to_string(),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

/// Navigation request, optionally deferred so a notice can be read first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: Location,
    pub delay: Duration,
}

impl Redirect {
    pub fn now(location: Location) -> Self {
        Self {
            location,
            delay: Duration::ZERO,
        }
    }

    pub fn after(location: Location, delay: Duration) -> Self {
        Self { location, delay }
    }
}
