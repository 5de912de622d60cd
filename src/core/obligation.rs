use crate::core::currency::CurrencyCode;
use crate::core::document::DocumentRef;
use crate::core::term::DueCondition;
use crate::error::{Result, SettlementError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Settlement status of an obligation.
///
/// Apart from `Waived`, which is set by an operator, this is always derived
/// from allocations; see [`crate::settlement::state::derive_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
    Waived,
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObligationStatus::Pending => "PENDING",
            ObligationStatus::PartiallyPaid => "PARTIALLY_PAID",
            ObligationStatus::Paid => "PAID",
            ObligationStatus::Overdue => "OVERDUE",
            ObligationStatus::Waived => "WAIVED",
        };
        f.write_str(s)
    }
}

/// A scheduled portion of money owed on a document (a payment schedule item).
///
/// Amounts are minor units in the document's currency. Apart from the waiver
/// and the status cache, an obligation never changes after creation; its due
/// date is only recomputed when the document's anchor dates change.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::obligation::{Obligation, ObligationStatus};
/// use settlement_engine::core::document::DocumentRef;
/// use settlement_engine::core::currency::CurrencyCode;
///
/// let ob = Obligation::new(
///     DocumentRef::receivable("SO-1001"),
///     "Balance",
///     100,
///     1_000_000,
///     CurrencyCode::new("USD"),
/// );
/// assert_eq!(ob.amount(), 1_000_000);
/// assert_eq!(ob.cached_status(), ObligationStatus::Pending);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    id: Uuid,
    document: DocumentRef,
    /// Index of the originating term stage, if generated from a term.
    stage_index: Option<usize>,
    label: String,
    percentage: u8,
    amount: i64,
    currency: CurrencyCode,
    due_date: Option<NaiveDate>,
    due_condition: Option<DueCondition>,
    /// Denormalised status; never authoritative.
    status: ObligationStatus,
    is_blocking: bool,
    is_credit: bool,
    sort_order: u32,
    waived_by: Option<String>,
    waived_at: Option<DateTime<Utc>>,
}

impl Obligation {
    /// Create a normal (non-credit) obligation.
    pub fn new(
        document: DocumentRef,
        label: impl Into<String>,
        percentage: u8,
        amount: i64,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            stage_index: None,
            label: label.into(),
            percentage,
            amount,
            currency,
            due_date: None,
            due_condition: None,
            status: ObligationStatus::Pending,
            is_blocking: false,
            is_credit: false,
            sort_order: 0,
            waived_by: None,
            waived_at: None,
        }
    }

    /// Create a credit: a negative-sense adjustment that can be netted
    /// against normal obligations.
    pub fn credit(
        document: DocumentRef,
        label: impl Into<String>,
        amount: i64,
        currency: CurrencyCode,
    ) -> Self {
        let mut ob = Self::new(document, label, 0, amount, currency);
        ob.is_credit = true;
        ob
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_stage(mut self, stage_index: usize, condition: DueCondition) -> Self {
        self.stage_index = Some(stage_index);
        self.due_condition = Some(condition);
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_sort_order(mut self, sort_order: u32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_blocking(mut self, is_blocking: bool) -> Self {
        self.is_blocking = is_blocking;
        self
    }

    /// Mark as waived. Waiving is terminal.
    pub fn waive(&mut self, actor: impl Into<String>, at: DateTime<Utc>) -> Result<()> {
        if self.is_waived() {
            return Err(SettlementError::AlreadyWaived { obligation: self.id });
        }
        let actor = actor.into();
        if actor.trim().is_empty() {
            return Err(SettlementError::MissingActor);
        }
        self.waived_by = Some(actor);
        self.waived_at = Some(at);
        self.status = ObligationStatus::Waived;
        Ok(())
    }

    pub(crate) fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
    }

    pub(crate) fn set_cached_status(&mut self, status: ObligationStatus) {
        self.status = status;
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn stage_index(&self) -> Option<usize> {
        self.stage_index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn due_condition(&self) -> Option<DueCondition> {
        self.due_condition
    }

    /// The last status written by a refresh. Use the derived status for decisions.
    pub fn cached_status(&self) -> ObligationStatus {
        self.status
    }

    pub fn is_blocking(&self) -> bool {
        self.is_blocking
    }

    pub fn is_credit(&self) -> bool {
        self.is_credit
    }

    pub fn is_waived(&self) -> bool {
        self.waived_at.is_some()
    }

    pub fn sort_order(&self) -> u32 {
        self.sort_order
    }

    pub fn waived_by(&self) -> Option<&str> {
        self.waived_by.as_deref()
    }

    pub fn waived_at(&self) -> Option<DateTime<Utc>> {
        self.waived_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Obligation {
        Obligation::new(
            DocumentRef::receivable("SO-1"),
            "Deposit",
            30,
            300_000,
            CurrencyCode::new("USD"),
        )
    }

    #[test]
    fn test_obligation_creation() {
        let ob = sample();
        assert_eq!(ob.label(), "Deposit");
        assert_eq!(ob.amount(), 300_000);
        assert!(!ob.is_credit());
        assert!(!ob.is_waived());
    }

    #[test]
    fn test_credit_creation() {
        let credit = Obligation::credit(
            DocumentRef::payable("PO-1"),
            "Quality deduction",
            5_000,
            CurrencyCode::new("CNY"),
        );
        assert!(credit.is_credit());
        assert_eq!(credit.percentage(), 0);
    }

    #[test]
    fn test_waive_is_terminal() {
        let mut ob = sample();
        ob.waive("ops@example.com", Utc::now()).unwrap();
        assert_eq!(ob.cached_status(), ObligationStatus::Waived);
        assert_eq!(ob.waived_by(), Some("ops@example.com"));

        let err = ob.waive("ops@example.com", Utc::now()).unwrap_err();
        assert!(matches!(err, SettlementError::AlreadyWaived { .. }));
    }

    #[test]
    fn test_waive_requires_actor() {
        let mut ob = sample();
        assert!(matches!(
            ob.waive("  ", Utc::now()),
            Err(SettlementError::MissingActor)
        ));
        assert!(!ob.is_waived());
    }
}
