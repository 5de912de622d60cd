use crate::core::currency::CurrencyCode;
use crate::core::party::CounterpartyId;
use crate::error::{Result, SettlementError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentDirection {
    /// Money received from a customer.
    Inbound,
    /// Money paid to a supplier.
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::PendingApproval => "PENDING_APPROVAL",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// A recorded money movement.
///
/// The amount is in the payment's own currency, which may differ from the
/// currency of the obligations it is allocated against. A payment leaves
/// `PendingApproval` exactly once, to `Approved` or `Rejected`, and never
/// changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: Uuid,
    direction: PaymentDirection,
    counterparty: CounterpartyId,
    amount: i64,
    currency: CurrencyCode,
    payment_date: NaiveDate,
    status: PaymentStatus,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    reference: Option<String>,
}

impl Payment {
    /// Create a payment awaiting approval.
    pub fn new(
        direction: PaymentDirection,
        counterparty: CounterpartyId,
        amount: i64,
        currency: CurrencyCode,
        payment_date: NaiveDate,
    ) -> Result<Self> {
        if amount <= 0 {
            return Err(SettlementError::InvalidAmount {
                reason: format!("payment amount must be positive, got {amount}"),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            direction,
            counterparty,
            amount,
            currency,
            payment_date,
            status: PaymentStatus::PendingApproval,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            reference: None,
        })
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// `PendingApproval -> Approved`.
    pub fn approve(&mut self, actor: impl Into<String>, at: DateTime<Utc>) -> Result<()> {
        self.ensure_pending(PaymentStatus::Approved)?;
        let actor = actor.into();
        if actor.trim().is_empty() {
            return Err(SettlementError::MissingActor);
        }
        self.status = PaymentStatus::Approved;
        self.approved_by = Some(actor);
        self.approved_at = Some(at);
        Ok(())
    }

    /// `PendingApproval -> Rejected`. A reason is mandatory.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<()> {
        self.ensure_pending(PaymentStatus::Rejected)?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(SettlementError::MissingReason);
        }
        self.status = PaymentStatus::Rejected;
        self.rejection_reason = Some(reason);
        Ok(())
    }

    fn ensure_pending(&self, to: PaymentStatus) -> Result<()> {
        if self.status != PaymentStatus::PendingApproval {
            return Err(SettlementError::InvalidTransition {
                entity: format!("payment {}", self.id),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn direction(&self) -> PaymentDirection {
        self.direction
    }

    pub fn counterparty(&self) -> &CounterpartyId {
        &self.counterparty
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn payment_date(&self) -> NaiveDate {
        self.payment_date
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn is_approved(&self) -> bool {
        self.status == PaymentStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == PaymentStatus::Rejected
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Payment {
        Payment::new(
            PaymentDirection::Inbound,
            CounterpartyId::new("CUST-1"),
            10_000,
            CurrencyCode::new("USD"),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let result = Payment::new(
            PaymentDirection::Outbound,
            CounterpartyId::new("SUP-1"),
            0,
            CurrencyCode::new("USD"),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        );
        assert!(matches!(result, Err(SettlementError::InvalidAmount { .. })));
    }

    #[test]
    fn test_approve() {
        let mut p = pending();
        p.approve("finance-lead", Utc::now()).unwrap();
        assert!(p.is_approved());
        assert_eq!(p.approved_by(), Some("finance-lead"));
        assert!(p.approved_at().is_some());
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut p = pending();
        assert!(matches!(p.reject(""), Err(SettlementError::MissingReason)));
        assert_eq!(p.status(), PaymentStatus::PendingApproval);
        p.reject("duplicate bank entry").unwrap();
        assert_eq!(p.rejection_reason(), Some("duplicate bank entry"));
    }

    #[test]
    fn test_terminal_states() {
        let mut p = pending();
        p.approve("finance-lead", Utc::now()).unwrap();
        assert!(matches!(
            p.reject("too late"),
            Err(SettlementError::InvalidTransition { .. })
        ));
        assert!(matches!(
            p.approve("finance-lead", Utc::now()),
            Err(SettlementError::InvalidTransition { .. })
        ));

        let mut p = pending();
        p.reject("bounced").unwrap();
        assert!(matches!(
            p.approve("finance-lead", Utc::now()),
            Err(SettlementError::InvalidTransition { .. })
        ));
    }
}
