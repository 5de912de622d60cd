use crate::core::currency::CurrencyCode;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors arising from exchange-rate records and lookups.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("no approved exchange rate for {from} -> {to} as of {as_of}")]
    Unavailable {
        from: CurrencyCode,
        to: CurrencyCode,
        as_of: NaiveDate,
    },
    #[error("exchange rate must be positive, got {rate} for {from} -> {to}")]
    InvalidRate {
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    },
    #[error("exchange rate {0} not found")]
    UnknownRate(Uuid),
    #[error("exchange rate {0} is already approved")]
    AlreadyApproved(Uuid),
    #[error("exchange rate {0} has been removed")]
    Removed(Uuid),
    #[error("exchange rate pair {0} -> {0} is meaningless")]
    SameCurrency(CurrencyCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateStatus {
    Pending,
    Approved,
}

/// A dated exchange rate: 1 unit of `base` = `rate` units of `target`.
///
/// Rate records are append-only. Once approved the rate value never changes;
/// a wrong rate is soft-removed and a new one recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: Uuid,
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub rate: Decimal,
    pub date: NaiveDate,
    pub status: RateStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub removed_at: Option<DateTime<Utc>>,
}

impl ExchangeRate {
    /// A new pending rate. The rate must be positive.
    pub fn new(
        base: CurrencyCode,
        target: CurrencyCode,
        rate: Decimal,
        date: NaiveDate,
    ) -> Result<Self, RateError> {
        if base == target {
            return Err(RateError::SameCurrency(base));
        }
        if rate <= Decimal::ZERO {
            return Err(RateError::InvalidRate {
                from: base,
                to: target,
                rate,
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            base,
            target,
            rate,
            date,
            status: RateStatus::Pending,
            approved_by: None,
            approved_at: None,
            removed_at: None,
        })
    }

    /// Only approved, non-removed rates may be used for conversion.
    pub fn is_usable(&self) -> bool {
        self.status == RateStatus::Approved && self.removed_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    #[test]
    fn test_new_rate_is_pending() {
        let rate = ExchangeRate::new("USD".into(), "CNY".into(), dec!(7.1), day()).unwrap();
        assert_eq!(rate.status, RateStatus::Pending);
        assert!(!rate.is_usable());
    }

    #[test]
    fn test_invalid_rate() {
        let result = ExchangeRate::new("USD".into(), "CNY".into(), dec!(-0.5), day());
        assert!(matches!(result, Err(RateError::InvalidRate { .. })));
        let result = ExchangeRate::new("USD".into(), "USD".into(), dec!(1), day());
        assert!(matches!(result, Err(RateError::SameCurrency(_))));
    }
}
