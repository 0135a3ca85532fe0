use serde::Serialize;

use super::cart::CartView;
use super::format::{money, order_date};
use crate::models::Order;
use crate::navigation::Location;
use crate::services::checkout::payment_method::PaymentMethodKind;
use crate::services::checkout::totals::PricingPolicy;
use crate::services::checkout::{CheckoutOrchestrator, CheckoutPhase};

/// Shown instead of the form when there is nothing to buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyCheckout {
    pub title: &'static str,
    pub hint: &'static str,
    pub action: (&'static str, Location),
}

impl Default for EmptyCheckout {
    fn default() -> Self {
        Self {
            title: "Your cart is empty",
            hint: "Add some products to get started",
            action: ("Continue Shopping", Location::Home),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CryptoPanelView {
    pub address: String,
    /// e.g. `0.00012826 BTC`
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutView {
    pub phase: CheckoutPhase,
    pub cart: CartView,
    pub empty: Option<EmptyCheckout>,
    /// The one payment panel on display
    pub visible_panel: Option<PaymentMethodKind>,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    /// First problem with the card details, while the card panel is shown
    pub card_advisory: Option<&'static str>,
    pub bank_reference: Option<String>,
    pub crypto: Option<CryptoPanelView>,
}

impl CheckoutView {
    pub fn render(checkout: &CheckoutOrchestrator, policy: &PricingPolicy) -> Self {
        let panels = checkout.panels();
        let visible_panel = checkout.visible_panel();

        let card_advisory = match visible_panel {
            Some(PaymentMethodKind::Card) => panels.card.advisory(),
            _ => None,
        };
        let crypto = match visible_panel {
            Some(PaymentMethodKind::Crypto) => {
                panels.crypto.quote.as_ref().map(|quote| CryptoPanelView {
                    address: quote.address.clone(),
                    amount: quote.display_amount(),
                })
            }
            _ => None,
        };

        Self {
            phase: checkout.phase(),
            cart: CartView::render(&checkout.cart(), policy),
            empty: (checkout.phase() == CheckoutPhase::Empty).then(EmptyCheckout::default),
            visible_panel,
            submit_enabled: checkout.submit_enabled(),
            submit_label: checkout.submit_label(),
            card_advisory,
            bank_reference: panels.bank_transfer.reference.clone(),
            crypto,
        }
    }
}

/// Modal shown once an order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmationView {
    pub title: &'static str,
    pub greeting: &'static str,
    /// `Order #12`
    pub order_number: String,
    pub total_amount: String,
    pub status: String,
    pub order_date: Option<String>,
    pub shipping_address: String,
    pub follow_up: &'static str,
    pub actions: [(&'static str, Location); 2],
}

impl OrderConfirmationView {
    pub fn render(order: &Order, policy: &PricingPolicy) -> Self {
        Self {
            title: "Order Confirmed!",
            greeting: "Thank you for your order!",
            order_number: format!("Order #{}", order.id),
            total_amount: money(order.total_amount, &policy.currency),
            status: capitalize(&order.status.to_string()),
            order_date: order.created_at.map(order_date),
            shipping_address: order.shipping_address.clone(),
            follow_up: "You will receive an email confirmation shortly. We'll notify you when your order ships.",
            actions: [
                ("Continue Shopping", Location::Home),
                ("View Order", Location::Order(order.id)),
            ],
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
