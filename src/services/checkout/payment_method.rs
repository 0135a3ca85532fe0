use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::masks;

static EXPIRY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}$").unwrap());

/// Payment options offered on the checkout page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethodKind {
    MobileMoney,
    #[serde(rename = "paypal")]
    #[strum(serialize = "paypal")]
    PayPal,
    BankTransfer,
    Card,
    Crypto,
}

impl PaymentMethodKind {
    pub const ALL: [PaymentMethodKind; 5] = [
        PaymentMethodKind::MobileMoney,
        PaymentMethodKind::PayPal,
        PaymentMethodKind::BankTransfer,
        PaymentMethodKind::Card,
        PaymentMethodKind::Crypto,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MobileMoney => "Mobile Money",
            Self::PayPal => "PayPal",
            Self::BankTransfer => "Bank Transfer",
            Self::Card => "Credit/Debit Card",
            Self::Crypto => "Cryptocurrency",
        }
    }
}

/// Coins accepted on the crypto panel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CryptoAsset {
    Btc,
    Eth,
    Usdt,
    Ltc,
}

impl CryptoAsset {
    /// Fixed deposit address shown to the shopper.
    pub fn deposit_address(self) -> &'static str {
        match self {
            Self::Btc => "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
            Self::Eth => "0x742d35Cc6634C0532925a3b8D4C9db96C4b4d8b6",
            Self::Usdt => "TQn9Y2khDD95J42FQtQTdwVVRZqjqH3qKk",
            Self::Ltc => "ltc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
        }
    }

    /// Static placeholder conversion rate from the shop currency.
    pub fn placeholder_rate(self) -> Decimal {
        match self {
            Self::Btc => dec!(0.0000012),
            Self::Eth => dec!(0.00018),
            Self::Usdt => dec!(0.15),
            Self::Ltc => dec!(0.0085),
        }
    }

    pub fn code(self) -> String {
        self.as_ref().to_ascii_uppercase()
    }

    pub fn quote(self, amount_due: Decimal) -> CryptoQuote {
        CryptoQuote {
            asset: self,
            address: self.deposit_address().to_string(),
            amount: amount_due * self.placeholder_rate(),
        }
    }
}

/// Amount and address to pay with a given coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CryptoQuote {
    pub asset: CryptoAsset,
    pub address: String,
    pub amount: Decimal,
}

impl CryptoQuote {
    /// e.g. `0.00012826 BTC`
    pub fn display_amount(&self) -> String {
        let amount = self
            .amount
            .round_dp_with_strategy(8, RoundingStrategy::MidpointAwayFromZero);
        format!("{:.8} {}", amount, self.asset.code())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MobileMoneyDetails {
    pub provider: String,
    pub mobile_number: String,
}

impl MobileMoneyDetails {
    pub fn set_mobile_number(&mut self, raw: &str) {
        self.mobile_number = masks::mobile_number(raw);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PayPalDetails {
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BankTransferDetails {
    /// Transfer reference, generated the first time the panel is opened
    pub reference: Option<String>,
}

/// `ORDER-` followed by the last eight digits of the epoch milliseconds.
pub fn bank_reference(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    format!("ORDER-{}", tail)
}

#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    #[serde(skip_serializing)]
    pub cvv: String,
    pub name: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits: Vec<char> = masks::strip_spaces(&self.number).chars().collect();
        let last4: String = digits[digits.len().saturating_sub(4)..].iter().collect();
        f.debug_struct("CardDetails")
            .field("number", &format!("**** {}", last4))
            .field("expiry", &self.expiry)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CardDetails {
    pub fn set_number(&mut self, raw: &str) {
        self.number = masks::card_number(raw);
    }

    pub fn set_expiry(&mut self, raw: &str) {
        self.expiry = masks::expiry(raw);
    }

    pub fn set_cvv(&mut self, raw: &str) {
        self.cvv = masks::cvv(raw);
    }

    /// First problem with the entered card, if any. Shown next to the panel;
    /// it does not block order submission.
    pub fn advisory(&self) -> Option<&'static str> {
        if masks::strip_spaces(&self.number).len() < 13 {
            return Some("Invalid card number");
        }
        if !EXPIRY_REGEX.is_match(&self.expiry) {
            return Some("Invalid expiry date (use MM/YY format)");
        }
        if self.cvv.len() < 3 {
            return Some("Invalid CVV");
        }
        if self.name.trim().is_empty() {
            return Some("Please enter the name on card");
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CryptoDetails {
    pub asset: Option<CryptoAsset>,
    pub quote: Option<CryptoQuote>,
}

/// Everything typed into the payment panels.
///
/// Each panel keeps its values when another method is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentPanels {
    pub mobile_money: MobileMoneyDetails,
    pub paypal: PayPalDetails,
    pub bank_transfer: BankTransferDetails,
    pub card: CardDetails,
    pub crypto: CryptoDetails,
}

impl PaymentPanels {
    /// The selected method with its panel's current payload.
    pub fn method(&self, kind: PaymentMethodKind) -> PaymentMethod {
        match kind {
            PaymentMethodKind::MobileMoney => PaymentMethod::MobileMoney(self.mobile_money.clone()),
            PaymentMethodKind::PayPal => PaymentMethod::PayPal(self.paypal.clone()),
            PaymentMethodKind::BankTransfer => {
                PaymentMethod::BankTransfer(self.bank_transfer.clone())
            }
            PaymentMethodKind::Card => PaymentMethod::Card(self.card.clone()),
            PaymentMethodKind::Crypto => PaymentMethod::Crypto(self.crypto.clone()),
        }
    }
}

/// A payment method together with its own details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", content = "details", rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney(MobileMoneyDetails),
    #[serde(rename = "paypal")]
    PayPal(PayPalDetails),
    BankTransfer(BankTransferDetails),
    Card(CardDetails),
    Crypto(CryptoDetails),
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentMethodKind {
        match self {
            Self::MobileMoney(_) => PaymentMethodKind::MobileMoney,
            Self::PayPal(_) => PaymentMethodKind::PayPal,
            Self::BankTransfer(_) => PaymentMethodKind::BankTransfer,
            Self::Card(_) => PaymentMethodKind::Card,
            Self::Crypto(_) => PaymentMethodKind::Crypto,
        }
    }
}
