//! Decimal arithmetic utilities for balance values.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::str::FromStr;

/// Parse plain (`123.45`) or scientific (`1.2345e2`) notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Round half away from zero, the way amounts are usually displayed.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Render with exactly `decimals` fractional digits (`12.5` -> `"12.50"`).
pub fn format_fixed(value: Decimal, decimals: u32) -> String {
    let mut rounded = round_to_precision(value, decimals);
    rounded.rescale(decimals);
    rounded.to_string()
}

/// Safe division that returns zero if divisor is zero.
///
/// Quotients too large for a `Decimal` saturate at `Decimal::MAX` / `Decimal::MIN`.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_div(denominator)
        .unwrap_or_else(|| saturated(numerator.is_sign_negative() != denominator.is_sign_negative()))
}

/// Signed percentage change from `from` to `to`; zero when `from` is zero.
///
/// Saturates instead of overflowing, so any pair of parsed balances is safe.
pub fn percent_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    let ratio = safe_div(to.saturating_sub(from), from);
    ratio.saturating_mul(dec!(100))
}

fn saturated(negative: bool) -> Decimal {
    if negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}
