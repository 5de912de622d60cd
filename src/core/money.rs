//! Integer minor-unit arithmetic.
//!
//! Every monetary amount in the engine is an `i64` count of minor units at a
//! single fixed scale, [`MINOR_UNIT_SCALE`] decimal places, regardless of the
//! currency. A currency's own `decimal_places` only affects display. Keeping one
//! scale everywhere means a conversion multiplies like-scaled integers and can
//! never mix a 2-decimal amount with a 4-decimal one.

use crate::error::{Result, SettlementError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places represented by one minor unit.
pub const MINOR_UNIT_SCALE: u32 = 4;

/// Minor units per major unit (`10^MINOR_UNIT_SCALE`).
pub const MINOR_UNITS_PER_MAJOR: i64 = 10_000;

/// Rounding rule applied whenever a fractional minor unit must become an integer.
///
/// The same policy is used by schedule apportionment and by currency
/// conversion so that both sides of a reconciliation round identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingPolicy {
    /// Round half away from zero (0.5 -> 1, -0.5 -> -1).
    #[default]
    HalfUp,
    /// Banker's rounding: round half to the nearest even integer.
    HalfEven,
}

impl RoundingPolicy {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingPolicy::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingPolicy::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }

    /// Round a decimal to a whole number of minor units.
    pub fn round(self, value: Decimal) -> Result<i64> {
        value
            .round_dp_with_strategy(0, self.strategy())
            .to_i64()
            .ok_or_else(|| SettlementError::InvalidAmount {
                reason: format!("{value} does not fit in minor units"),
            })
    }
}

/// `round(total * percentage / 100)` under the given policy.
pub fn percent_of(total: i64, percentage: u8, rounding: RoundingPolicy) -> Result<i64> {
    let raw = Decimal::from(total) * Decimal::from(percentage) / Decimal::ONE_HUNDRED;
    rounding.round(raw)
}

/// Convert minor units with an exchange rate: `round(amount * rate)`.
pub fn convert(amount: i64, rate: Decimal, rounding: RoundingPolicy) -> Result<i64> {
    let product = Decimal::from(amount)
        .checked_mul(rate)
        .ok_or_else(|| SettlementError::InvalidAmount {
            reason: format!("{amount} x {rate} overflows"),
        })?;
    rounding.round(product)
}

/// Render minor units as a major-unit decimal, e.g. `12345` -> `1.2345`.
pub fn to_major(amount: i64) -> Decimal {
    Decimal::new(amount, MINOR_UNIT_SCALE)
}

/// Parse a major-unit decimal into minor units, rejecting sub-minor precision.
pub fn from_major(value: Decimal) -> Result<i64> {
    let scaled = value
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or_else(|| SettlementError::InvalidAmount {
            reason: format!("{value} does not fit in minor units"),
        })?;
    if scaled.fract() != Decimal::ZERO {
        return Err(SettlementError::InvalidAmount {
            reason: format!("{value} has more than {MINOR_UNIT_SCALE} decimal places"),
        });
    }
    scaled.to_i64().ok_or_else(|| SettlementError::InvalidAmount {
        reason: format!("{value} does not fit in minor units"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_half_up_vs_half_even() {
        assert_eq!(RoundingPolicy::HalfUp.round(dec!(2.5)).unwrap(), 3);
        assert_eq!(RoundingPolicy::HalfEven.round(dec!(2.5)).unwrap(), 2);
        assert_eq!(RoundingPolicy::HalfUp.round(dec!(-2.5)).unwrap(), -3);
        assert_eq!(RoundingPolicy::HalfEven.round(dec!(3.5)).unwrap(), 4);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(100, 33, RoundingPolicy::HalfUp).unwrap(), 33);
        assert_eq!(percent_of(1_000_000, 30, RoundingPolicy::HalfUp).unwrap(), 300_000);
        // 5 * 50% = 2.5
        assert_eq!(percent_of(5, 50, RoundingPolicy::HalfUp).unwrap(), 3);
        assert_eq!(percent_of(5, 50, RoundingPolicy::HalfEven).unwrap(), 2);
    }

    #[test]
    fn test_convert() {
        assert_eq!(convert(10_000, dec!(7.25), RoundingPolicy::HalfUp).unwrap(), 72_500);
        assert_eq!(convert(3, dec!(0.5), RoundingPolicy::HalfUp).unwrap(), 2);
    }

    #[test]
    fn test_convert_overflow() {
        let err = convert(i64::MAX, dec!(1000), RoundingPolicy::HalfUp).unwrap_err();
        assert!(matches!(err, SettlementError::InvalidAmount { .. }));
    }

    #[test]
    fn test_major_minor() {
        assert_eq!(to_major(12_345), dec!(1.2345));
        assert_eq!(from_major(dec!(1.2345)).unwrap(), 12_345);
        assert!(from_major(dec!(0.00001)).is_err());
        assert!(from_major(Decimal::MAX).is_err());
    }
}
