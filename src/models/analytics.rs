use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::cart::ProductId;

/// Shopper actions reported to the behaviour log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BehaviorAction {
    View,
    AddToCart,
    Purchase,
}

/// Body of `POST /api/analytics/track-behavior`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub action: BehaviorAction,
    pub product_id: ProductId,
    pub timestamp: DateTime<Utc>,
}

impl BehaviorEvent {
    pub fn now(action: BehaviorAction, product_id: ProductId) -> Self {
        Self {
            action,
            product_id,
            timestamp: Utc::now(),
        }
    }
}
