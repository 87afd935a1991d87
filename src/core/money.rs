//! Fixed-point money helpers.
//!
//! Monetary inputs are decimal strings. They are rounded half-up to the column's
//! fractional digits before any comparison, then checked against the largest value
//! the column can hold. Persisted values are integer minor units.

use crate::errors::{Error, Result};
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Digits available to a fixed-point column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    /// Total significant digits
    pub total_digits: u32,
    /// Digits after the decimal point
    pub fractional_digits: u32,
}

impl Precision {
    /// Donation amounts, 18 digits with 2 decimals.
    pub const DONATION_AMOUNT: Self = Self::new(18, 2);
    /// Campaign goals, 18 digits with 2 decimals.
    pub const CAMPAIGN_GOAL: Self = Self::new(18, 2);

    /// Creates a precision descriptor.
    #[must_use]
    pub const fn new(total_digits: u32, fractional_digits: u32) -> Self {
        Self {
            total_digits,
            fractional_digits,
        }
    }

    /// Largest value a column of this precision can store.
    #[must_use]
    pub fn max_value(self) -> Decimal {
        max_value(self.total_digits, self.fractional_digits)
    }
}

/// Largest value representable with `total_digits` digits, `fractional_digits` of
/// them after the point.
///
/// `max_value(18, 2)` is `9999999999999999.99`. Returns zero when there is no room
/// for an integer part, and [`Decimal::MAX`] when the result exceeds what
/// `Decimal` can represent.
#[must_use]
pub fn max_value(total_digits: u32, fractional_digits: u32) -> Decimal {
    if total_digits <= fractional_digits {
        return Decimal::ZERO;
    }
    10_i128
        .checked_pow(total_digits)
        .and_then(|power| Decimal::try_from_i128_with_scale(power - 1, fractional_digits).ok())
        .unwrap_or(Decimal::MAX)
}

/// Rounds half away from zero to exactly `fractional_digits` places.
#[must_use]
pub fn quantize(value: Decimal, fractional_digits: u32) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(fractional_digits, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(fractional_digits);
    rounded
}

/// Positive number with an optional fraction and a non-negative exponent.
fn is_positive_numeral(value: &str) -> bool {
    static RE: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"^\+?(\d+\.?\d*|\.\d+)([eE]\+?\d+)?$").ok());
    RE.as_ref()
        .is_some_and(|re| re.is_match(value).unwrap_or(false))
}

/// Parses a user-entered amount for a column of the given precision.
///
/// Input that is not a number is treated as zero, so it fails with the same
/// "must be greater than 0" message as a zero or negative amount. A positive
/// number too large for `Decimal` fails as too large.
///
/// # Arguments
/// * `raw` - The string as submitted
/// * `precision` - Target column precision
/// * `field` - Human name used in error messages
pub fn parse_amount(raw: &str, precision: Precision, field: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    let max = precision.max_value();
    let parsed = match Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
        Ok(value) => value,
        Err(_) if is_positive_numeral(trimmed) => {
            return Err(Error::AmountTooLarge {
                field: field.to_string(),
                max,
            });
        }
        Err(_) => Decimal::ZERO,
    };
    let amount = quantize(parsed, precision.fractional_digits);

    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            field: field.to_string(),
            input: raw.to_string(),
        });
    }
    if amount > max {
        return Err(Error::AmountTooLarge {
            field: field.to_string(),
            max,
        });
    }
    Ok(amount)
}

/// Converts a decimal to integer minor units, rounding to the precision first.
pub fn to_minor_units(value: Decimal, precision: Precision) -> Result<i64> {
    let quantized = quantize(value, precision.fractional_digits);
    i64::try_from(quantized.mantissa()).map_err(|_| Error::AmountTooLarge {
        field: "Amount".to_string(),
        max: precision.max_value(),
    })
}

/// Converts persisted minor units back to a decimal.
#[must_use]
pub fn from_minor_units(minor: i64, precision: Precision) -> Decimal {
    Decimal::new(minor, precision.fractional_digits)
}

/// Share of the goal reached, floored to a whole percent and clamped to 0..=100.
///
/// A goal of zero or less yields 0.
#[must_use]
pub fn progress_percent(total: Decimal, goal: Decimal) -> u8 {
    if goal <= Decimal::ZERO {
        return 0;
    }
    let percent = total
        .checked_div(goal)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ONE_HUNDRED, |percent| percent.floor());

    percent
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .to_u8()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_max_value() {
        assert_eq!(max_value(18, 2), dec("9999999999999999.99"));
        assert_eq!(max_value(5, 0), dec("99999"));
        assert_eq!(max_value(2, 2), Decimal::ZERO);
        assert_eq!(max_value(1, 3), Decimal::ZERO);
        assert_eq!(Precision::DONATION_AMOUNT.max_value(), max_value(18, 2));
    }

    #[test]
    fn test_quantize_rounds_half_up() {
        assert_eq!(quantize(dec("50.004"), 2), dec("50.00"));
        assert_eq!(quantize(dec("50.005"), 2), dec("50.01"));
        assert_eq!(quantize(dec("-1.005"), 2), dec("-1.01"));
        assert_eq!(quantize(dec("7"), 2).to_string(), "7.00");
    }

    #[test]
    fn test_parse_amount_accepts_and_rounds() {
        let amount = parse_amount(" 50.004 ", Precision::DONATION_AMOUNT, "Donation amount").unwrap();
        assert_eq!(amount.to_string(), "50.00");

        let amount = parse_amount("1e2", Precision::DONATION_AMOUNT, "Donation amount").unwrap();
        assert_eq!(amount, dec("100.00"));
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        for raw in ["-5", "0", "0.004", "", "abc"] {
            let err = parse_amount(raw, Precision::DONATION_AMOUNT, "Donation amount").unwrap_err();
            assert!(matches!(err, Error::InvalidAmount { .. }), "{raw}");
            assert_eq!(err.to_string(), "Donation amount must be greater than 0.");
        }
    }

    #[test]
    fn test_parse_amount_rejects_too_large() {
        let err = parse_amount("10000000000000000", Precision::CAMPAIGN_GOAL, "Goal amount")
            .unwrap_err();
        assert!(matches!(err, Error::AmountTooLarge { .. }));

        // Rounds up past the maximum
        let err = parse_amount("9999999999999999.995", Precision::CAMPAIGN_GOAL, "Goal amount")
            .unwrap_err();
        assert!(matches!(err, Error::AmountTooLarge { .. }));

        assert!(parse_amount("9999999999999999.99", Precision::CAMPAIGN_GOAL, "Goal amount").is_ok());

        // Beyond what Decimal can hold
        for raw in ["1e40", "100000000000000000000000000000", "+1E40"] {
            let err = parse_amount(raw, Precision::DONATION_AMOUNT, "Donation amount").unwrap_err();
            assert!(matches!(err, Error::AmountTooLarge { .. }), "{raw}");
        }
    }

    #[test]
    fn test_parse_amount_overflow_sign_and_exponent() {
        // Huge negatives and vanishing exponents are still non-positive
        for raw in ["-1e40", "-100000000000000000000000000000", "1e-40"] {
            let err = parse_amount(raw, Precision::DONATION_AMOUNT, "Donation amount").unwrap_err();
            assert!(matches!(err, Error::InvalidAmount { .. }), "{raw}");
        }
        assert!(!is_positive_numeral("abc"));
        assert!(!is_positive_numeral("1e"));
        assert!(is_positive_numeral("12.5e3"));
    }

    #[test]
    fn test_minor_units() {
        let p = Precision::DONATION_AMOUNT;
        assert_eq!(to_minor_units(dec("50.00"), p).unwrap(), 5000);
        assert_eq!(to_minor_units(dec("0.015"), p).unwrap(), 2);
        assert_eq!(from_minor_units(5000, p), dec("50.00"));
        assert_eq!(from_minor_units(5000, p).to_string(), "50.00");
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(dec("50"), dec("200")), 25);
        assert_eq!(progress_percent(dec("199.99"), dec("200")), 99);
        assert_eq!(progress_percent(dec("500"), dec("200")), 100);
        assert_eq!(progress_percent(Decimal::ZERO, dec("200")), 0);
        assert_eq!(progress_percent(dec("10"), Decimal::ZERO), 0);
        assert_eq!(progress_percent(dec("10"), dec("-5")), 0);
    }
}
