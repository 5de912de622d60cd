use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The application of part of a payment to one obligation, optionally
/// netting a credit obligation in the same record.
///
/// `allocated_amount` is in the payment's currency and
/// `amount_in_document_currency` in the target obligation's currency; when
/// the two currencies differ, `exchange_rate` holds the rate used. Allocations
/// are immutable: corrections add a new allocation or remove one whose payment
/// is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub obligation_id: Uuid,
    pub credit_id: Option<Uuid>,
    pub allocated_amount: i64,
    pub exchange_rate: Option<Decimal>,
    pub amount_in_document_currency: i64,
}

impl Allocation {
    /// The `(payment, obligation, credit)` triple that must be unique.
    pub fn key(&self) -> (Uuid, Uuid, Option<Uuid>) {
        (self.payment_id, self.obligation_id, self.credit_id)
    }

    /// Whether this allocation touches the given obligation, as target or credit.
    pub fn touches(&self, obligation_id: Uuid) -> bool {
        self.obligation_id == obligation_id || self.credit_id == Some(obligation_id)
    }
}
