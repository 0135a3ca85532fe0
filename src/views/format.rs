use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// `GHS 1234.50`
pub fn money(amount: Decimal, currency: &str) -> String {
    let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{} {:.2}", currency, amount)
}

/// `Jan 5, 2024`
pub fn order_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0), "GHS 0.00")]
    #[case(dec!(1234.5), "GHS 1234.50")]
    #[case(dec!(158.625), "GHS 158.63")]
    #[case(dec!(11.375), "GHS 11.38")]
    fn money_has_two_decimals(#[case] amount: Decimal, #[case] expected: &str) {
        assert_eq!(money(amount, "GHS"), expected);
    }

    #[test]
    fn dates_are_short_month_day_year() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 10, 15, 30).unwrap();
        assert_eq!(order_date(ts), "Jan 5, 2024");
    }
}
