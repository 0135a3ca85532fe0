//! Input masks applied as the shopper types.

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// `4111111111111111` -> `4111 1111 1111 1111`, at most 19 characters.
pub fn card_number(raw: &str) -> String {
    let digits = digits(raw);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 4);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    grouped.chars().take(19).collect()
}

/// `1225` -> `12/25`.
pub fn expiry(raw: &str) -> String {
    let digits = digits(raw);
    if digits.len() < 2 {
        return digits;
    }
    let (month, rest) = digits.split_at(2);
    let year: String = rest.chars().take(2).collect();
    format!("{}/{}", month, year)
}

pub fn cvv(raw: &str) -> String {
    digits(raw).chars().take(4).collect()
}

/// Local mobile number: digits, leading `0`, at most 10 characters.
pub fn mobile_number(raw: &str) -> String {
    let mut digits = digits(raw);
    if !digits.is_empty() && !digits.starts_with('0') {
        digits.insert(0, '0');
    }
    digits.chars().take(10).collect()
}

/// Card number without the grouping spaces.
pub fn strip_spaces(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4111111111111111", "4111 1111 1111 1111")]
    #[case("4111-1111-11", "4111 1111 11")]
    #[case("41111111111111112222", "4111 1111 1111 1111")]
    #[case("", "")]
    fn groups_card_digits(#[case] raw: &str, #[case] masked: &str) {
        assert_eq!(card_number(raw), masked);
    }

    #[rstest]
    #[case("1", "1")]
    #[case("12", "12/")]
    #[case("1225", "12/25")]
    #[case("12/259", "12/25")]
    fn formats_expiry(#[case] raw: &str, #[case] masked: &str) {
        assert_eq!(expiry(raw), masked);
    }

    #[test]
    fn cvv_keeps_four_digits() {
        assert_eq!(cvv("12a345"), "1234");
    }

    #[rstest]
    #[case("241234567", "0241234567")]
    #[case("0241234567", "0241234567")]
    #[case("+233 24 123 4567", "0233241234")]
    #[case("", "")]
    fn prefixes_mobile_number(#[case] raw: &str, #[case] masked: &str) {
        assert_eq!(mobile_number(raw), masked);
    }
}
