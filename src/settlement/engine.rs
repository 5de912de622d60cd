use crate::config::EngineConfig;
use crate::core::allocation::Allocation;
use crate::core::currency::CurrencyCode;
use crate::core::document::{AnchorDates, DocumentRef, PayableDocument};
use crate::core::payment::Payment;
use crate::core::term::PaymentTerm;
use crate::error::Result;
use crate::report::aggregation::{PortfolioSummary, SettlementSummary};
use crate::settlement::book::{ObligationView, SettlementBook};
use crate::settlement::ledger::AllocationRequest;
use chrono::NaiveDate;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Thread-safe front of a [`SettlementBook`].
///
/// Commands take the write lock, so two allocations against the same
/// obligation are checked one after the other and can never jointly exceed
/// its balance. Queries take the read lock and return owned snapshots.
///
/// # Examples
///
/// ```
/// use settlement_engine::prelude::*;
/// use std::sync::Arc;
/// use std::thread;
///
/// let engine = Arc::new(SettlementEngine::new(&EngineConfig::default()).unwrap());
/// let doc = DocumentRef::payable("PO-7");
/// engine.register_document(PayableDocument::new(doc.clone(), 500, "USD".into())).unwrap();
///
/// let handle = {
///     let engine = Arc::clone(&engine);
///     let doc = doc.clone();
///     thread::spawn(move || engine.document_exists(&doc))
/// };
/// assert!(handle.join().unwrap());
/// ```
#[derive(Debug)]
pub struct SettlementEngine {
    book: RwLock<SettlementBook>,
}

impl SettlementEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::from_book(SettlementBook::new(config)?))
    }

    pub fn from_book(book: SettlementBook) -> Self {
        Self {
            book: RwLock::new(book),
        }
    }

    /// Run a closure against a consistent read snapshot of the book.
    pub fn read<R>(&self, f: impl FnOnce(&SettlementBook) -> R) -> R {
        f(&*self.book.read())
    }

    /// Run several commands as one unit under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut SettlementBook) -> R) -> R {
        f(&mut *self.book.write())
    }

    pub fn into_book(self) -> SettlementBook {
        self.book.into_inner()
    }

    // --- Commands ---

    pub fn record_rate(&self, base: CurrencyCode, target: CurrencyCode, rate: Decimal, date: NaiveDate) -> Result<Uuid> {
        self.book.write().record_rate(base, target, rate, date)
    }

    pub fn approve_rate(&self, id: Uuid, actor: &str) -> Result<()> {
        self.book.write().approve_rate(id, actor)
    }

    pub fn remove_rate(&self, id: Uuid) -> Result<()> {
        self.book.write().remove_rate(id)
    }

    pub fn register_document(&self, document: PayableDocument) -> Result<()> {
        self.book.write().register_document(document)
    }

    pub fn generate_schedule(&self, reference: &DocumentRef, term: &PaymentTerm) -> Result<Vec<Uuid>> {
        self.book.write().generate_schedule(reference, term)
    }

    pub fn update_anchors(&self, reference: &DocumentRef, anchors: AnchorDates) -> Result<usize> {
        self.book.write().update_anchors(reference, anchors)
    }

    pub fn add_credit(&self, reference: &DocumentRef, amount: i64, label: &str) -> Result<Uuid> {
        self.book.write().add_credit(reference, amount, label)
    }

    pub fn record_payment(&self, payment: Payment) -> Result<Uuid> {
        self.book.write().record_payment(payment)
    }

    pub fn approve_payment(&self, id: Uuid, actor: &str) -> Result<()> {
        self.book.write().approve_payment(id, actor)
    }

    pub fn reject_payment(&self, id: Uuid, reason: &str) -> Result<()> {
        self.book.write().reject_payment(id, reason)
    }

    pub fn delete_payment(&self, id: Uuid) -> Result<Payment> {
        self.book.write().delete_payment(id)
    }

    pub fn allocate(&self, request: AllocationRequest) -> Result<Allocation> {
        self.book.write().allocate(request)
    }

    pub fn allocate_many(&self, requests: &[AllocationRequest]) -> Result<Vec<Allocation>> {
        self.book.write().allocate_many(requests)
    }

    pub fn remove_allocation(&self, id: Uuid) -> Result<Allocation> {
        self.book.write().remove_allocation(id)
    }

    pub fn waive(&self, obligation_id: Uuid, actor: &str) -> Result<()> {
        self.book.write().waive(obligation_id, actor)
    }

    pub fn refresh_statuses(&self, as_of: NaiveDate) -> usize {
        self.book.write().refresh_statuses(as_of)
    }

    // --- Queries ---

    pub fn document_exists(&self, reference: &DocumentRef) -> bool {
        self.book.read().document(reference).is_ok()
    }

    pub fn obligations(&self, reference: &DocumentRef, as_of: NaiveDate) -> Result<Vec<ObligationView>> {
        self.book.read().obligations(reference, as_of)
    }

    pub fn obligation(&self, id: Uuid, as_of: NaiveDate) -> Result<ObligationView> {
        self.book.read().obligation(id, as_of)
    }

    pub fn outstanding_balance(&self, id: Uuid) -> Result<i64> {
        self.book.read().outstanding_balance(id)
    }

    pub fn allocatable(&self, id: Uuid) -> Result<i64> {
        self.book.read().allocatable(id)
    }

    pub fn credit_available(&self, credit_id: Uuid) -> Result<i64> {
        self.book.read().credit_available(credit_id)
    }

    pub fn document_summary(&self, reference: &DocumentRef, as_of: NaiveDate) -> Result<SettlementSummary> {
        self.book.read().document_summary(reference, as_of)
    }

    pub fn portfolio_summary(&self, as_of: NaiveDate) -> PortfolioSummary {
        self.book.read().portfolio_summary(as_of)
    }
}
