use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalogue identifier of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a line in the backend cart resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItemId(pub i64);

impl fmt::Display for CartItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A requested line quantity, always within `[Quantity::MIN, Quantity::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 99;

    /// Clamps any requested value into the allowed range.
    pub fn clamped(requested: i64) -> Self {
        Self(requested.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
    }

    /// Accepts the value only if it is already in range.
    pub fn new(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn one() -> Self {
        Self(Self::MIN)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::one()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One line of the cart as returned by `GET /api/cart/`.
///
/// The backend also sends `product_price`, `price` and `total_price`; the line
/// total is recomputed from quantity and unit price instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(rename = "price_at_time")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[rstest]
    #[case(0, 1)]
    #[case(-5, 1)]
    #[case(1, 1)]
    #[case(42, 42)]
    #[case(99, 99)]
    #[case(100, 99)]
    #[case(150, 99)]
    fn clamps_into_range(#[case] requested: i64, #[case] expected: u32) {
        assert_eq!(Quantity::clamped(requested).get(), expected);
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::new(100).is_none());
        assert_eq!(Quantity::new(7).map(Quantity::get), Some(7));
    }

    #[test]
    fn decodes_backend_line_and_recomputes_total() {
        let item: CartLineItem = serde_json::from_value(json!({
            "id": 11,
            "product_id": 42,
            "product_name": "Shea Butter",
            "product_price": 19.99,
            "price": 19.99,
            "quantity": 3,
            "total_price": 59.97,
            "price_at_time": 19.99
        }))
        .unwrap();

        assert_eq!(item.id, CartItemId(11));
        assert_eq!(item.product_id, ProductId(42));
        assert_eq!(item.line_total(), dec!(59.97));
    }
}
