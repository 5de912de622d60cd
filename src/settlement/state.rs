//! Settlement-state derivation.
//!
//! An obligation's status is a pure function of the obligation, the
//! allocations that touch it, the approval status of their payments and the
//! evaluation date. The status stored on an [`Obligation`] is only a cache of
//! this function's last result.

use crate::core::allocation::Allocation;
use crate::core::obligation::{Obligation, ObligationStatus};
use crate::core::payment::PaymentStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived settlement figures for one obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementState {
    pub obligation_id: Uuid,
    /// Approved allocations, in the obligation's currency. For a credit this
    /// is the amount consumed by netting.
    pub settled: i64,
    pub outstanding: i64,
    pub status: ObligationStatus,
}

/// Sum of approved allocations touching the obligation, in its currency.
///
/// Allocations from pending or rejected payments never count.
pub fn settled_amount<'a, I>(obligation: &Obligation, allocations: I) -> i64
where
    I: IntoIterator<Item = (&'a Allocation, PaymentStatus)>,
{
    allocations
        .into_iter()
        .filter(|(a, status)| *status == PaymentStatus::Approved && a.touches(obligation.id()))
        .map(|(a, _)| a.amount_in_document_currency)
        .sum()
}

/// Status rules, first match wins:
///
/// 1. `Waived` if an operator waived it.
/// 2. `Paid` if `settled >= amount`.
/// 3. `PartiallyPaid` if `0 < settled < amount`.
/// 4. `Overdue` if it has a due date strictly before `as_of`.
/// 5. `Pending` otherwise. A due date equal to `as_of` is not overdue.
pub fn derive_status(obligation: &Obligation, settled: i64, as_of: NaiveDate) -> ObligationStatus {
    if obligation.is_waived() {
        return ObligationStatus::Waived;
    }
    if settled >= obligation.amount() {
        return ObligationStatus::Paid;
    }
    if settled > 0 {
        return ObligationStatus::PartiallyPaid;
    }
    match obligation.due_date() {
        Some(due) if due < as_of => ObligationStatus::Overdue,
        _ => ObligationStatus::Pending,
    }
}

/// What is still owed: zero for waived obligations, never negative.
pub fn outstanding_balance(obligation: &Obligation, settled: i64) -> i64 {
    if obligation.is_waived() {
        return 0;
    }
    (obligation.amount() - settled).max(0)
}

/// Evaluate an obligation against its allocation history.
pub fn evaluate<'a, I>(obligation: &Obligation, allocations: I, as_of: NaiveDate) -> SettlementState
where
    I: IntoIterator<Item = (&'a Allocation, PaymentStatus)>,
{
    let settled = settled_amount(obligation, allocations);
    SettlementState {
        obligation_id: obligation.id(),
        settled,
        outstanding: outstanding_balance(obligation, settled),
        status: derive_status(obligation, settled, as_of),
    }
}
