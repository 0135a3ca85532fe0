use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::models::CartLineItem;

/// Client-side pricing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Subtotals strictly above this ship free
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    /// Applied to subtotal + shipping
    pub tax_rate: Decimal,
    pub currency: String,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: dec!(1000),
            flat_shipping_fee: dec!(50),
            tax_rate: dec!(0.125),
            currency: "GHS".to_string(),
        }
    }
}

impl PricingPolicy {
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping_fee
        }
    }
}

/// Subtotal, shipping, tax and grand total of a cart.
///
/// Always rebuilt from the line items; never patched after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CheckoutTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CheckoutTotals {
    pub fn compute(items: &[CartLineItem], policy: &PricingPolicy) -> Self {
        let subtotal: Decimal = items.iter().map(CartLineItem::line_total).sum();
        let shipping = policy.shipping_for(subtotal);
        let tax = (subtotal + shipping) * policy.tax_rate;

        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }

    /// Grand total at display precision; this is what the shopper is charged.
    pub fn amount_due(&self) -> Decimal {
        self.total
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn ships_free(&self) -> bool {
        self.shipping.is_zero()
    }
}
