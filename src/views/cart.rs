use serde::Serialize;

use super::format::money;
use crate::models::{CartItemId, Quantity};
use crate::services::checkout::totals::{CheckoutTotals, PricingPolicy};
use crate::state::CartSnapshot;

pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty";

/// One cart line as displayed in the drawer and on the checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartRow {
    pub item_id: CartItemId,
    pub product_name: String,
    pub unit_price: String,
    pub quantity: u32,
    /// `GHS 25.00 x 2`
    pub price_line: String,
    pub line_total: String,
    pub decrement_enabled: bool,
    pub increment_enabled: bool,
}

/// Formatted order summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalsView {
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub free_shipping: bool,
}

impl TotalsView {
    pub fn render(totals: &CheckoutTotals, policy: &PricingPolicy) -> Self {
        let currency = policy.currency.as_str();
        Self {
            subtotal: money(totals.subtotal, currency),
            shipping: money(totals.shipping, currency),
            tax: money(totals.tax, currency),
            total: money(totals.total, currency),
            free_shipping: totals.ships_free(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub rows: Vec<CartRow>,
    /// Set when there is nothing to list
    pub empty_message: Option<&'static str>,
    pub totals: TotalsView,
}

impl CartView {
    pub fn render(cart: &CartSnapshot, policy: &PricingPolicy) -> Self {
        let currency = policy.currency.as_str();
        let rows = cart
            .items
            .iter()
            .map(|item| CartRow {
                item_id: item.id,
                product_name: item.product_name.clone(),
                unit_price: money(item.unit_price, currency),
                quantity: item.quantity,
                price_line: format!("{} x {}", money(item.unit_price, currency), item.quantity),
                line_total: money(item.line_total(), currency),
                decrement_enabled: item.quantity > Quantity::MIN,
                increment_enabled: item.quantity < Quantity::MAX,
            })
            .collect();

        Self {
            rows,
            empty_message: cart.is_empty().then_some(EMPTY_CART_MESSAGE),
            totals: TotalsView::render(&cart.totals, policy),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
