//! Fixed-precision helpers for monetary values.
//!
//! Persisted monetary columns are `NUMERIC(36,18)`: 18 integer digits and 18
//! fractional digits. Every value that leaves the simulator or goes to the
//! database passes through [`to_storage_precision`] first.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use std::str::FromStr;

/// Fractional digits kept for monetary values
pub const MONETARY_SCALE: i64 = 18;

/// Integer digits available for monetary values
pub const MONETARY_INTEGER_DIGITS: u32 = 18;

/// Round to 18 fractional digits, half up
#[must_use]
pub fn round_monetary(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(MONETARY_SCALE, RoundingMode::HalfUp)
}

/// Round to 18 fractional digits (half up) and check the result fits the
/// storage precision.
///
/// # Returns
/// * `Some(value)` - The rounded value
/// * `None` - If the integer part needs more than 18 digits
#[must_use]
pub fn to_storage_precision(value: &BigDecimal) -> Option<BigDecimal> {
    let rounded = round_monetary(value);
    let limit = BigDecimal::from(10_u64.pow(MONETARY_INTEGER_DIGITS));
    if rounded.abs() < limit {
        Some(rounded)
    } else {
        None
    }
}

/// `10^decimals` as a decimal, the base unit of a token with that precision
#[must_use]
pub fn decimal_base(decimals: u8) -> BigDecimal {
    BigDecimal::new(1.into(), -i64::from(decimals))
}

/// Parse an integer-valued on-chain quantity (any `Display` of a `U256`-like
/// value) into a decimal.
#[must_use]
pub fn from_raw(raw: impl std::fmt::Display) -> Option<BigDecimal> {
    BigDecimal::from_str(&raw.to_string()).ok()
}

/// `raw / 10^decimals`
#[must_use]
pub fn normalize(raw: &BigDecimal, decimals: u8) -> BigDecimal {
    if decimals == 0 {
        return raw.clone();
    }
    raw / decimal_base(decimals)
}

/// Whether the value is strictly positive
#[must_use]
pub fn is_positive(value: &BigDecimal) -> bool {
    value > &BigDecimal::zero()
}

/// Drop trailing fractional zeros for display, never switching to exponent form
#[must_use]
pub fn trimmed(value: &BigDecimal) -> BigDecimal {
    let normalized = value.normalized();
    if normalized.as_bigint_and_exponent().1 < 0 {
        normalized.with_scale(0)
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_half_up_to_eighteen_places() {
        let v = BigDecimal::from_str("1.0000000000000000005").unwrap();
        let r = to_storage_precision(&v).unwrap();
        assert_eq!(r, BigDecimal::from_str("1.000000000000000001").unwrap());
        assert_eq!(r.as_bigint_and_exponent().1, 18);
    }

    #[test]
    fn test_rejects_values_beyond_eighteen_integer_digits() {
        let ok = BigDecimal::from_str("999999999999999999.9").unwrap();
        let too_big = BigDecimal::from_str("1000000000000000000").unwrap();
        assert!(to_storage_precision(&ok).is_some());
        assert!(to_storage_precision(&too_big).is_none());
        assert!(to_storage_precision(&-too_big).is_none());
    }

    #[test]
    fn test_decimal_base_and_normalize() {
        assert_eq!(decimal_base(6), BigDecimal::from(1_000_000));
        let raw = from_raw(2_500_000_u64).unwrap();
        assert_eq!(normalize(&raw, 6), BigDecimal::from_str("2.5").unwrap());
        assert_eq!(normalize(&raw, 0), raw);
    }

    #[test]
    fn test_trimmed() {
        let v = BigDecimal::from_str("3000.000000000000000000").unwrap();
        assert_eq!(trimmed(&v).to_string(), "3000");
        let v = BigDecimal::from_str("11.650000000000000000").unwrap();
        assert_eq!(trimmed(&v).to_string(), "11.65");
    }
}
