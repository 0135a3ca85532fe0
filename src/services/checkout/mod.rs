//! Checkout form state machine.

pub mod form;
pub mod masks;
pub mod payment_method;
pub mod totals;

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use strum::{AsRefStr, Display};
use tracing::{info, instrument, warn};
use url::Url;

use self::form::{CheckoutForm, FormField};
use self::payment_method::{
    bank_reference, CryptoAsset, CryptoQuote, PaymentMethod, PaymentMethodKind, PaymentPanels,
};
use self::totals::CheckoutTotals;
use super::cart::CartSynchronizer;
use crate::api::RemovalRoute;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::events::NoticeLevel;
use crate::models::{CartItemId, CreateOrderRequest, Order, PaymentInitiation};
use crate::navigation::{Location, Redirect};
use crate::state::{AppState, CartSnapshot};

/// Gateway the backend initialises for every order.
const GATEWAY_PAYMENT_METHOD: &str = "paystack";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckoutPhase {
    /// Nothing loaded yet
    Idle,
    /// Cart has items, no payment method chosen
    Loaded,
    /// Cart has no items; nothing can be bought from here
    Empty,
    PaymentMethodSelected,
    /// Order creation in flight
    Submitting,
    /// Order created; the shopper is leaving for the payment page
    Redirecting,
}

/// One checkout page: the form, the payment panels and where the flow stands.
pub struct CheckoutOrchestrator {
    cart: CartSynchronizer,
    state: Arc<AppState>,
    config: Arc<ClientConfig>,
    phase: CheckoutPhase,
    form: CheckoutForm,
    panels: PaymentPanels,
    selected: Option<PaymentMethodKind>,
    order: Option<Order>,
}

impl CheckoutOrchestrator {
    pub fn new(cart: CartSynchronizer, state: Arc<AppState>, config: Arc<ClientConfig>) -> Self {
        Self {
            cart,
            state,
            config,
            phase: CheckoutPhase::Idle,
            form: CheckoutForm::default(),
            panels: PaymentPanels::default(),
            selected: None,
            order: None,
        }
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    pub fn form(&self) -> &CheckoutForm {
        &self.form
    }

    pub fn panels(&self) -> &PaymentPanels {
        &self.panels
    }

    pub fn cart(&self) -> Arc<CartSnapshot> {
        self.state.cart()
    }

    /// The created order, once submission succeeded.
    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Totals recomputed from the current cart lines.
    pub fn totals(&self) -> CheckoutTotals {
        CheckoutTotals::compute(&self.state.cart().items, self.state.pricing())
    }

    /// Panel on display; only ever the selected method's.
    pub fn visible_panel(&self) -> Option<PaymentMethodKind> {
        self.selected
    }

    pub fn selected_method(&self) -> Option<PaymentMethod> {
        self.selected.map(|kind| self.panels.method(kind))
    }

    pub fn submit_enabled(&self) -> bool {
        matches!(
            self.phase,
            CheckoutPhase::Loaded | CheckoutPhase::PaymentMethodSelected
        )
    }

    pub fn submit_label(&self) -> &'static str {
        match self.phase {
            CheckoutPhase::Submitting | CheckoutPhase::Redirecting => "Processing Payment...",
            _ => "Place Order",
        }
    }

    fn ensure_editable(&self) -> Result<(), ClientError> {
        match self.phase {
            CheckoutPhase::Submitting | CheckoutPhase::Redirecting => Err(ClientError::InvalidState(
                format!("checkout is {}", self.phase),
            )),
            _ => Ok(()),
        }
    }

    fn settle_phase(&mut self, snapshot: &CartSnapshot) {
        self.phase = if snapshot.is_empty() {
            CheckoutPhase::Empty
        } else if self.selected.is_some() {
            CheckoutPhase::PaymentMethodSelected
        } else {
            CheckoutPhase::Loaded
        };
    }

    fn refresh_crypto_quote(&mut self) {
        if let Some(asset) = self.panels.crypto.asset {
            self.panels.crypto.quote = Some(asset.quote(self.totals().amount_due()));
        }
    }

    /// Loads the cart and prefills contact details from the profile.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<CheckoutPhase, ClientError> {
        self.ensure_editable()?;

        let snapshot = match self.cart.reload().await {
            Ok(snapshot) => snapshot,
            // Signed-out shoppers just see an idle page.
            Err(e @ ClientError::Unauthenticated(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Checkout cart load failed");
                self.state
                    .events()
                    .notify(NoticeLevel::Error, "Error loading cart items");
                return Err(e);
            }
        };

        if let Some(user) = self.state.current_user() {
            self.form.prefill_from(&user);
        }
        self.settle_phase(&snapshot);
        self.refresh_crypto_quote();

        info!(phase = %self.phase, lines = snapshot.line_count(), "Checkout loaded");
        Ok(self.phase)
    }

    /// Sets a contact or shipping field.
    pub fn set_field(
        &mut self,
        field: FormField,
        value: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.form.set(field, value);
        Ok(())
    }

    pub fn accept_terms(&mut self, accepted: bool) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.form.terms_accepted = accepted;
        Ok(())
    }

    /// Shows the chosen method's panel. Values typed into other panels are kept.
    #[instrument(skip(self))]
    pub fn select_payment_method(
        &mut self,
        kind: PaymentMethodKind,
    ) -> Result<PaymentMethod, ClientError> {
        match self.phase {
            CheckoutPhase::Loaded | CheckoutPhase::PaymentMethodSelected => {}
            phase => {
                return Err(ClientError::InvalidState(format!(
                    "cannot choose a payment method while {}",
                    phase
                )))
            }
        }

        if kind == PaymentMethodKind::BankTransfer && self.panels.bank_transfer.reference.is_none() {
            self.panels.bank_transfer.reference = Some(bank_reference(Utc::now()));
        }

        self.selected = Some(kind);
        self.phase = CheckoutPhase::PaymentMethodSelected;
        Ok(self.panels.method(kind))
    }

    /// Picks a coin on the crypto panel; `None` hides the deposit details.
    pub fn select_crypto_asset(
        &mut self,
        asset: Option<CryptoAsset>,
    ) -> Result<Option<CryptoQuote>, ClientError> {
        self.ensure_editable()?;
        self.panels.crypto.asset = asset;
        self.panels.crypto.quote = None;
        self.refresh_crypto_quote();
        Ok(self.panels.crypto.quote.clone())
    }

    pub fn set_mobile_provider(&mut self, provider: impl Into<String>) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.panels.mobile_money.provider = provider.into();
        Ok(())
    }

    pub fn set_mobile_number(&mut self, raw: &str) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.panels.mobile_money.set_mobile_number(raw);
        Ok(())
    }

    pub fn set_paypal_email(&mut self, email: impl Into<String>) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.panels.paypal.email = email.into();
        Ok(())
    }

    pub fn set_card_number(&mut self, raw: &str) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.panels.card.set_number(raw);
        Ok(())
    }

    pub fn set_card_expiry(&mut self, raw: &str) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.panels.card.set_expiry(raw);
        Ok(())
    }

    pub fn set_card_cvv(&mut self, raw: &str) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.panels.card.set_cvv(raw);
        Ok(())
    }

    pub fn set_card_name(&mut self, name: impl Into<String>) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.panels.card.name = name.into();
        Ok(())
    }

    /// Changes a line's quantity through the synchroniser.
    pub async fn update_quantity(
        &mut self,
        item: CartItemId,
        requested: i64,
    ) -> Result<(), ClientError> {
        self.ensure_editable()?;
        let result = self.cart.update_quantity(item, requested).await.map(|_| ());
        self.after_cart_edit();
        result
    }

    pub async fn remove_item(&mut self, item: CartItemId) -> Result<(), ClientError> {
        self.ensure_editable()?;
        let result = self.cart.remove(item, RemovalRoute::Canonical).await;
        self.after_cart_edit();
        result
    }

    fn after_cart_edit(&mut self) {
        if self.phase == CheckoutPhase::Idle {
            return;
        }
        let snapshot = self.state.cart();
        self.settle_phase(&snapshot);
        self.refresh_crypto_quote();
    }

    fn reject(&self, err: ClientError) -> ClientError {
        self.state
            .events()
            .notify(NoticeLevel::Error, err.notice_message("Checkout failed. Please try again."));
        err
    }

    /// Validates the form and creates the order.
    ///
    /// On success the shopper is sent to the gateway's authorization URL. Any
    /// failure leaves the form as it was so the shopper can retry.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<Redirect, ClientError> {
        match self.phase {
            CheckoutPhase::Loaded | CheckoutPhase::PaymentMethodSelected => {}
            CheckoutPhase::Empty => {
                return Err(ClientError::InvalidState("cart is empty".into()))
            }
            phase => {
                return Err(ClientError::InvalidState(format!(
                    "cannot submit while {}",
                    phase
                )))
            }
        }

        let token = self
            .state
            .require_token("Please login to complete checkout")
            .map_err(|e| self.reject(e))?;

        let kind = match self.selected {
            Some(kind) => kind,
            None => {
                return Err(self.reject(ClientError::validation(
                    FormField::PaymentMethod,
                    "Please select a payment method",
                )))
            }
        };

        self.form.validate().map_err(|e| self.reject(e))?;

        let totals = self.totals();
        let request = CreateOrderRequest {
            shipping_address: self.form.shipping_address(),
            customer_info: self.form.customer_info(),
            payment_method: GATEWAY_PAYMENT_METHOD.to_string(),
            payment_info: PaymentInitiation {
                email: self.form.email.clone(),
                amount: totals.amount_due(),
                callback_url: self.config.payment_callback_url(),
            },
            order_notes: self.form.order_notes.clone(),
        };

        self.phase = CheckoutPhase::Submitting;
        info!(method = %kind, amount = %request.payment_info.amount, "Submitting order");

        let order = match self.cart.api().create_order(&token, &request).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Order creation failed");
                self.phase = CheckoutPhase::PaymentMethodSelected;
                self.state.sign_out_if_rejected(&e);
                let message = match &e {
                    ClientError::Api { .. } => e.notice_message("Failed to create order"),
                    _ => e.notice_message("Checkout failed. Please try again."),
                };
                self.state.events().notify(NoticeLevel::Error, message);
                return Err(e);
            }
        };

        let authorization_url = order
            .authorization_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .and_then(|url| Url::parse(url).ok());

        match authorization_url {
            Some(url) => {
                info!(order_id = %order.id, "Order created; redirecting to payment page");
                self.order = Some(order);
                self.phase = CheckoutPhase::Redirecting;

                let redirect = Redirect::now(Location::External(url));
                self.state.events().navigate(redirect.clone());
                Ok(redirect)
            }
            None => {
                warn!(order_id = %order.id, "Order created without authorization URL");
                self.phase = CheckoutPhase::PaymentMethodSelected;
                self.state
                    .events()
                    .notify(NoticeLevel::Error, "Payment initialization failed");
                Err(ClientError::PaymentInitialization)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockStorefrontApi, StorefrontApi};
    use crate::events::UiEvent;
    use crate::models::{CartLineItem, OrderId, OrderStatus, ProductId};
    use crate::storage::MemoryTokenStore;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn line() -> CartLineItem {
        CartLineItem {
            id: CartItemId(1),
            product_id: ProductId(42),
            product_name: "Kente scarf".into(),
            unit_price: dec!(45.50),
            quantity: 2,
        }
    }

    fn orchestrator(api: MockStorefrontApi) -> CheckoutOrchestrator {
        let api: Arc<dyn StorefrontApi> = Arc::new(api);
        let config = Arc::new(ClientConfig::for_backend("http://shop.test"));
        let state = Arc::new(AppState::new(
            Arc::new(MemoryTokenStore::with_token("t")),
            config.pricing.policy(),
        ));
        CheckoutOrchestrator::new(CartSynchronizer::new(api, state.clone()), state, config)
    }

    fn fill(checkout: &mut CheckoutOrchestrator) {
        for (field, value) in [
            (FormField::FirstName, "Ama"),
            (FormField::LastName, "Mensah"),
            (FormField::Email, "ama@example.com"),
            (FormField::Phone, "0241234567"),
            (FormField::Address, "1 Oxford St"),
            (FormField::City, "Accra"),
            (FormField::PostalCode, "00233"),
        ] {
            checkout.set_field(field, value).unwrap();
        }
        checkout.accept_terms(true).unwrap();
    }

    fn order(authorization_url: Option<&str>) -> Order {
        Order {
            id: OrderId(9),
            total_amount: dec!(158.63),
            status: OrderStatus::Pending,
            shipping_address: "1 Oxford St, Accra 00233".into(),
            created_at: None,
            customer_name: None,
            customer_email: None,
            payment_method: Some("paystack".into()),
            paystack_reference: None,
            authorization_url: authorization_url.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn empty_cart_is_terminal() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![]));

        let mut checkout = orchestrator(api);
        assert_eq!(checkout.load().await.unwrap(), CheckoutPhase::Empty);
        assert!(!checkout.submit_enabled());
        assert_matches!(
            checkout.select_payment_method(PaymentMethodKind::Card),
            Err(ClientError::InvalidState(_))
        );
        assert_matches!(checkout.submit().await, Err(ClientError::InvalidState(_)));
    }

    #[tokio::test]
    async fn switching_methods_keeps_panel_values() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![line()]));

        let mut checkout = orchestrator(api);
        checkout.load().await.unwrap();

        checkout.select_payment_method(PaymentMethodKind::Card).unwrap();
        checkout.set_card_number("4111111111111111").unwrap();
        checkout.select_payment_method(PaymentMethodKind::BankTransfer).unwrap();

        assert_eq!(checkout.visible_panel(), Some(PaymentMethodKind::BankTransfer));
        assert_eq!(checkout.panels().card.number, "4111 1111 1111 1111");

        let reference = checkout.panels().bank_transfer.reference.clone().unwrap();
        assert!(reference.starts_with("ORDER-"));
        checkout.select_payment_method(PaymentMethodKind::Card).unwrap();
        checkout.select_payment_method(PaymentMethodKind::BankTransfer).unwrap();
        assert_eq!(checkout.panels().bank_transfer.reference, Some(reference));
    }

    #[tokio::test]
    async fn missing_payment_method_is_reported_first() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![line()]));
        // create_order has no expectation: calling it would panic.

        let mut checkout = orchestrator(api);
        checkout.load().await.unwrap();
        let mut events = checkout.state.subscribe();

        let err = checkout.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Please select a payment method");
        assert_eq!(
            events.try_recv().unwrap(),
            UiEvent::error("Please select a payment method")
        );
        assert_eq!(checkout.phase(), CheckoutPhase::Loaded);
    }

    #[tokio::test]
    async fn blank_field_blocks_submission_locally() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![line()]));

        let mut checkout = orchestrator(api);
        checkout.load().await.unwrap();
        checkout.select_payment_method(PaymentMethodKind::MobileMoney).unwrap();
        fill(&mut checkout);
        checkout.set_field(FormField::City, "").unwrap();

        let err = checkout.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill in city");
        assert_eq!(checkout.phase(), CheckoutPhase::PaymentMethodSelected);
    }

    #[tokio::test]
    async fn authorization_url_redirects_off_site() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![line()]));
        api.expect_create_order()
            .withf(|_, request| {
                request.payment_method == "paystack"
                    && request.payment_info.amount == dec!(158.63)
                    && request.payment_info.callback_url == "http://shop.test/payment/callback"
                    && request.shipping_address == "1 Oxford St, Accra 00233"
            })
            .times(1)
            .returning(|_, _| Ok(order(Some("https://checkout.paystack.com/abc"))));

        let mut checkout = orchestrator(api);
        checkout.load().await.unwrap();
        checkout.select_payment_method(PaymentMethodKind::Card).unwrap();
        fill(&mut checkout);

        let redirect = checkout.submit().await.unwrap();
        assert_eq!(redirect.location.path(), "https://checkout.paystack.com/abc");
        assert_eq!(checkout.phase(), CheckoutPhase::Redirecting);
        assert_eq!(checkout.order().map(|o| o.id), Some(OrderId(9)));
        assert!(checkout.set_field(FormField::City, "Kumasi").is_err());
    }

    #[tokio::test]
    async fn missing_authorization_url_fails_submission() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![line()]));
        api.expect_create_order().returning(|_, _| Ok(order(None)));

        let mut checkout = orchestrator(api);
        checkout.load().await.unwrap();
        checkout.select_payment_method(PaymentMethodKind::PayPal).unwrap();
        fill(&mut checkout);
        let mut events = checkout.state.subscribe();

        assert_matches!(
            checkout.submit().await,
            Err(ClientError::PaymentInitialization)
        );
        assert_eq!(checkout.phase(), CheckoutPhase::PaymentMethodSelected);
        assert!(checkout.submit_enabled());
        assert_eq!(
            events.try_recv().unwrap(),
            UiEvent::error("Payment initialization failed")
        );
    }

    #[tokio::test]
    async fn forbidden_order_creation_signs_out() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![line()]));
        api.expect_create_order().times(1).returning(|_, _| {
            Err(ClientError::Api {
                status: reqwest::StatusCode::FORBIDDEN,
                detail: None,
            })
        });

        let mut checkout = orchestrator(api);
        checkout.load().await.unwrap();
        checkout.select_payment_method(PaymentMethodKind::Card).unwrap();
        fill(&mut checkout);

        assert_matches!(checkout.submit().await, Err(ClientError::Api { .. }));
        assert!(!checkout.state.has_token());
        assert!(!checkout.state.session().is_signed_in());
        assert!(checkout.cart().is_empty());
    }

    #[tokio::test]
    async fn crypto_quote_follows_amount_due() {
        let mut api = MockStorefrontApi::new();
        api.expect_cart_items().returning(|_| Ok(vec![line()]));

        let mut checkout = orchestrator(api);
        checkout.load().await.unwrap();
        checkout.select_payment_method(PaymentMethodKind::Crypto).unwrap();

        let quote = checkout
            .select_crypto_asset(Some(CryptoAsset::Usdt))
            .unwrap()
            .unwrap();
        assert_eq!(quote.amount, dec!(158.63) * dec!(0.15));
        assert!(checkout.select_crypto_asset(None).unwrap().is_none());
    }
}
