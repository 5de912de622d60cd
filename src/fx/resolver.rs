use crate::core::currency::CurrencyCode;
use crate::fx::rate::{ExchangeRate, RateError, RateStatus};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolves the rate to convert one currency into another as of a date.
pub trait RateResolver {
    /// Rate such that `amount_in_to = amount_in_from * rate`.
    fn resolve(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Decimal, RateError>;
}

/// Append-only store of dated exchange rates with an approval step.
///
/// # Resolution policy
///
/// 1. `from == to` resolves to 1 without a lookup.
/// 2. Among approved, non-removed rates dated on or before `as_of`, for the
///    pair `from -> to` or its inverse `to -> from`, the latest date wins.
///    Same-date ties go to the most recently approved record, then to the
///    direct pair over the inverse.
/// 3. An inverse record is used as `1 / rate`.
/// 4. Nothing found is an error. There is no fallback to a default or to a
///    pending rate.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::currency::CurrencyCode;
/// use settlement_engine::fx::resolver::{RateBook, RateResolver};
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let mut book = RateBook::new();
/// let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
/// let id = book.record(CurrencyCode::new("EUR"), CurrencyCode::new("USD"), dec!(1.10), day).unwrap();
/// book.approve(id, "treasury").unwrap();
///
/// let rate = book.resolve(&CurrencyCode::new("EUR"), &CurrencyCode::new("USD"), day).unwrap();
/// assert_eq!(rate, dec!(1.10));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateBook {
    rates: Vec<ExchangeRate>,
}

impl RateBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending rate and return its id.
    pub fn record(
        &mut self,
        base: CurrencyCode,
        target: CurrencyCode,
        rate: Decimal,
        date: NaiveDate,
    ) -> Result<Uuid, RateError> {
        let record = ExchangeRate::new(base, target, rate, date)?;
        let id = record.id;
        debug!(
            "recorded pending rate {} {}->{} = {} on {}",
            id, record.base, record.target, record.rate, record.date
        );
        self.rates.push(record);
        Ok(id)
    }

    /// Approve a pending rate, making it usable for conversion.
    pub fn approve(&mut self, id: Uuid, actor: impl Into<String>) -> Result<(), RateError> {
        self.approve_at(id, actor, Utc::now())
    }

    pub fn approve_at(
        &mut self,
        id: Uuid,
        actor: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), RateError> {
        let record = self.get_mut(id)?;
        if record.removed_at.is_some() {
            return Err(RateError::Removed(id));
        }
        if record.status == RateStatus::Approved {
            return Err(RateError::AlreadyApproved(id));
        }
        record.status = RateStatus::Approved;
        record.approved_by = Some(actor.into());
        record.approved_at = Some(at);
        info!(
            "approved rate {} {}->{} = {} on {}",
            id, record.base, record.target, record.rate, record.date
        );
        Ok(())
    }

    /// Soft-remove a rate. The record stays for audit but is never used again.
    pub fn remove(&mut self, id: Uuid) -> Result<(), RateError> {
        let record = self.get_mut(id)?;
        if record.removed_at.is_some() {
            return Err(RateError::Removed(id));
        }
        record.removed_at = Some(Utc::now());
        info!("removed rate {}", id);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&ExchangeRate> {
        self.rates.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut ExchangeRate, RateError> {
        self.rates
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RateError::UnknownRate(id))
    }

    pub fn rates(&self) -> &[ExchangeRate] {
        &self.rates
    }
}

impl RateResolver for RateBook {
    fn resolve(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        // (date, approved_at, is_direct) orders candidates; the max wins.
        let best = self
            .rates
            .iter()
            .filter(|r| r.is_usable() && r.date <= as_of)
            .filter_map(|r| {
                if &r.base == from && &r.target == to {
                    Some((r, true))
                } else if &r.base == to && &r.target == from {
                    Some((r, false))
                } else {
                    None
                }
            })
            .max_by_key(|(r, direct)| (r.date, r.approved_at, *direct));

        match best {
            Some((record, true)) => Ok(record.rate),
            Some((record, false)) => Ok(Decimal::ONE / record.rate),
            None => Err(RateError::Unavailable {
                from: from.clone(),
                to: to.clone(),
                as_of,
            }),
        }
    }
}
