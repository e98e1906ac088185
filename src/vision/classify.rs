//! Text-shape classifiers for OCR fragments
//!
//! Regex-level checks only: they decide whether a fragment *looks* like a
//! price, a bare integer, or an integer behind a currency sign. No locale
//! or currency detection happens here.

use regex::Regex;
use std::sync::LazyLock;

/// Up to two decoration characters on either side, 1-4 integer digits,
/// optional thousands groups, and a mandatory 1-3 digit fraction.
static VALID_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.{0,2}[0-9]{1,4}(?:[.,][0-9]{3})*(?:[.,][0-9]{1,3}).{0,2}$")
        .expect("price pattern is valid")
});

static NUMBER_WITH_LEADING_CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.{0,2}[0-9]{1,5}$").expect("leading currency pattern is valid")
});

/// Numeric body of a price, used to pull the value out of a voted string
static PRICE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{1,5}(?:[.,][0-9]{3})*(?:[.,][0-9]{1,3})").expect("price value pattern is valid")
});

/// Whether the whole string is a fully formed price such as `12.99` or `$1,234.5`
pub fn is_valid_price(text: &str) -> bool {
    VALID_PRICE.is_match(text)
}

/// Whether every character is an ASCII digit. The empty string qualifies.
pub fn is_number_only(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_digit())
}

/// Whether the string is 1-5 digits behind at most two leading characters
/// (`$12`, `€ 5`, `149`).
pub fn is_number_with_leading_currency(text: &str) -> bool {
    NUMBER_WITH_LEADING_CURRENCY.is_match(text)
}

/// Parse the numeric value out of a price-shaped string.
///
/// Only the last `.`/`,` is taken as the decimal separator; any earlier ones
/// are thousands separators and dropped. Returns `None` when the string holds
/// no price-shaped substring.
pub fn extract_price_value(text: &str) -> Option<f64> {
    let found = PRICE_VALUE.find(text)?.as_str();
    let split = found.rfind(['.', ','])?;
    let integer: String = found[..split].chars().filter(char::is_ascii_digit).collect();
    let fraction = &found[split + 1..];
    format!("{}.{}", integer, fraction).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prices() {
        for text in ["12.99", "$1,234.5", "0,5", "€9.999", "12.99$", "1.234.567,89", "$ 4.50 "] {
            assert!(is_valid_price(text), "{text} should be a price");
        }
    }

    #[test]
    fn test_invalid_prices() {
        for text in ["12", "$12", "12.", "price 12.99", "12.99 EUR", "abc12.99", "", "Milk"] {
            assert!(!is_valid_price(text), "{text} should not be a price");
        }
    }

    #[test]
    fn test_number_only() {
        assert!(is_number_only("99"));
        assert!(is_number_only("007"));
        assert!(is_number_only(""));
        assert!(!is_number_only("9 9"));
        assert!(!is_number_only("99c"));
        assert!(!is_number_only("-1"));
    }

    #[test]
    fn test_number_with_leading_currency() {
        assert!(is_number_with_leading_currency("12"));
        assert!(is_number_with_leading_currency("$12"));
        assert!(is_number_with_leading_currency("US5"));
        assert!(is_number_with_leading_currency("12345"));
        assert!(!is_number_with_leading_currency("USD12"));
        assert!(!is_number_with_leading_currency("12.99"));
        assert!(!is_number_with_leading_currency("$"));
    }

    #[test]
    fn test_extract_price_value() {
        assert_eq!(extract_price_value("12.99"), Some(12.99));
        assert_eq!(extract_price_value("$4,50"), Some(4.5));
        assert_eq!(extract_price_value("1,234.5"), Some(1234.5));
        assert_eq!(extract_price_value("1.234.567,89"), Some(1_234_567.89));
        assert_eq!(extract_price_value("free"), None);
        assert_eq!(extract_price_value("12"), None);
    }
}
