//! Capacity arithmetic helpers using rust_decimal for precision
//!
//! All capacity and monetary calculations run on `Decimal` internally
//! and convert to `f64` only at presentation boundaries, rounded to
//! 2 decimal places half-up.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounding at presentation boundaries (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert a boundary f64 into Decimal for internal arithmetic
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in capacity calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for payloads, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// `part / whole × 100`, with the zero-capacity guard
///
/// A zero or negative whole yields 0, never a division error.
#[inline]
pub fn ratio_percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        part / whole * Decimal::from(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_avoids_float_drift() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3
        let sum_f64 = 0.1_f64 + 0.2_f64;
        assert_ne!(sum_f64, 0.3);

        let sum_dec = to_decimal(0.1) + to_decimal(0.2);
        assert_eq!(to_f64(sum_dec), 0.3);
    }

    #[test]
    fn accumulation_is_exact() {
        // Sum 0.01 one thousand times
        let mut total = Decimal::ZERO;
        for _ in 0..1000 {
            total += to_decimal(0.01);
        }
        assert_eq!(to_f64(total), 10.0);
    }

    #[test]
    fn ratio_percent_zero_guard() {
        assert_eq!(ratio_percent(to_decimal(5.0), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(
            to_f64(ratio_percent(to_decimal(6.0), to_decimal(10.0))),
            60.0
        );
    }

    #[test]
    fn boundary_rounding_is_half_up() {
        assert_eq!(to_f64(Decimal::new(1005, 3)), 1.01); // 1.005 -> 1.01
        assert_eq!(to_f64(Decimal::new(2344, 3)), 2.34); // 2.344 -> 2.34
    }
}
