//! Money display helpers.
//!
//! Amounts travel as decimal strings on the wire (e.g., `"19.99"`) and are
//! represented as [`rust_decimal::Decimal`] in memory; serde handles the
//! conversion at the boundaries. Totals are always derived by arithmetic
//! over line amounts, never parsed from storage.

use rust_decimal::Decimal;

/// Format an amount for display as US dollars (e.g., `$19.99`).
#[must_use]
pub fn display_usd(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_usd() {
        assert_eq!(display_usd(Decimal::new(1999, 2)), "$19.99");
        assert_eq!(display_usd(Decimal::ZERO), "$0.00");
        assert_eq!(display_usd(Decimal::new(5, 0)), "$5.00");
    }

    #[test]
    fn test_display_usd_rounds_to_cents() {
        assert_eq!(display_usd("19.995".parse().unwrap()), "$20.00");
    }
}
