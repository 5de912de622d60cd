//! The settlement book: one consistent aggregate over currencies, rates,
//! documents, obligations, payments and allocations.

use crate::config::EngineConfig;
use crate::core::allocation::Allocation;
use crate::core::currency::{Currency, CurrencyCode, CurrencyRegistry};
use crate::core::document::{AnchorDates, DocumentRef, PayableDocument};
use crate::core::money::RoundingPolicy;
use crate::core::obligation::{Obligation, ObligationStatus};
use crate::core::payment::Payment;
use crate::core::term::{PaymentTerm, PaymentTermStage};
use crate::error::{Result, SettlementError};
use crate::fx::resolver::RateBook;
use crate::report::aggregation::{aggregate, portfolio, PortfolioSummary, SettlementSummary};
use crate::schedule::apportion::Apportioner;
use crate::schedule::store::ObligationStore;
use crate::settlement::ledger::{AllocationRequest, PaymentLedger};
use crate::settlement::state::{self, SettlementState};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// An obligation together with its derived settlement state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationView {
    pub obligation: Obligation,
    pub state: SettlementState,
}

impl ObligationView {
    pub fn status(&self) -> ObligationStatus {
        self.state.status
    }

    pub fn outstanding(&self) -> i64 {
        self.state.outstanding
    }
}

/// Single-threaded settlement aggregate.
///
/// Every command validates completely before mutating anything, so a failed
/// command leaves the book untouched. After a successful command the cached
/// status of every touched obligation is refreshed as of today; queries always
/// derive status afresh for the `as_of` they are given.
///
/// # Examples
///
/// ```
/// use settlement_engine::prelude::*;
/// use chrono::NaiveDate;
///
/// let mut book = SettlementBook::new(&EngineConfig::default()).unwrap();
/// let doc = DocumentRef::receivable("SO-1001");
/// book.register_document(PayableDocument::new(doc.clone(), 1_000_000, "USD".into())).unwrap();
///
/// let term = PaymentTerm::new("30/70", vec![
///     PaymentTermStage::new(30, CalculationBase::OrderDate, 0),
///     PaymentTermStage::new(70, CalculationBase::BeforeShipment, 0),
/// ]).unwrap();
/// let ids = book.generate_schedule(&doc, &term).unwrap();
/// assert_eq!(ids.len(), 2);
///
/// let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
/// let amounts: Vec<i64> = book
///     .obligations(&doc, as_of)
///     .unwrap()
///     .iter()
///     .map(|v| v.obligation.amount())
///     .collect();
/// assert_eq!(amounts, vec![300_000, 700_000]);
/// ```
#[derive(Debug, Clone)]
pub struct SettlementBook {
    rounding: RoundingPolicy,
    currencies: CurrencyRegistry,
    base_currency: CurrencyCode,
    rates: RateBook,
    obligations: ObligationStore,
    ledger: PaymentLedger,
}

impl SettlementBook {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_registry(config.validate()?, config.rounding)
    }

    pub fn with_registry(currencies: CurrencyRegistry, rounding: RoundingPolicy) -> Result<Self> {
        let base_currency = currencies
            .base()
            .map(|c| c.code.clone())
            .ok_or_else(|| SettlementError::InvalidCurrency {
                reason: "no base currency configured".into(),
            })?;
        Ok(Self {
            rounding,
            currencies,
            base_currency,
            rates: RateBook::new(),
            obligations: ObligationStore::new(),
            ledger: PaymentLedger::new(),
        })
    }

    // --- Configuration ---

    pub fn rounding(&self) -> RoundingPolicy {
        self.rounding
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    pub fn currencies(&self) -> &CurrencyRegistry {
        &self.currencies
    }

    /// Register an additional (non-base) currency.
    pub fn register_currency(&mut self, currency: Currency) -> Result<()> {
        let code = currency.code.clone();
        self.currencies.register(currency)?;
        info!("registered currency {}", code);
        Ok(())
    }

    // --- Exchange rates ---

    pub fn rates(&self) -> &RateBook {
        &self.rates
    }

    /// Record a pending rate: 1 `base` = `rate` `target`, effective `date`.
    pub fn record_rate(
        &mut self,
        base: CurrencyCode,
        target: CurrencyCode,
        rate: Decimal,
        date: NaiveDate,
    ) -> Result<Uuid> {
        self.currencies.require(&base)?;
        self.currencies.require(&target)?;
        Ok(self.rates.record(base, target, rate, date)?)
    }

    pub fn approve_rate(&mut self, id: Uuid, actor: &str) -> Result<()> {
        if actor.trim().is_empty() {
            return Err(SettlementError::MissingActor);
        }
        Ok(self.rates.approve(id, actor)?)
    }

    pub fn remove_rate(&mut self, id: Uuid) -> Result<()> {
        Ok(self.rates.remove(id)?)
    }

    // --- Documents and schedules ---

    pub fn register_document(&mut self, document: PayableDocument) -> Result<()> {
        self.currencies.require(&document.currency)?;
        if document.total_amount < 0 {
            return Err(SettlementError::InvalidAmount {
                reason: format!(
                    "document total must not be negative, got {}",
                    document.total_amount
                ),
            });
        }
        info!(
            "registered {} for {} {}",
            document.reference, document.total_amount, document.currency
        );
        self.obligations.register_document(document)
    }

    pub fn document(&self, reference: &DocumentRef) -> Result<&PayableDocument> {
        self.obligations.document(reference)
    }

    pub fn documents(&self) -> impl Iterator<Item = &PayableDocument> {
        self.obligations.documents()
    }

    /// Apportion a registered document against a payment term.
    pub fn generate_schedule(&mut self, reference: &DocumentRef, term: &PaymentTerm) -> Result<Vec<Uuid>> {
        self.generate_schedule_from_stages(reference, term.stages())
    }

    /// Apportion a registered document against raw stages, which are
    /// validated here as well.
    pub fn generate_schedule_from_stages(
        &mut self,
        reference: &DocumentRef,
        stages: &[PaymentTermStage],
    ) -> Result<Vec<Uuid>> {
        if self.obligations.has_schedule(reference) {
            return Err(SettlementError::ScheduleExists(reference.clone()));
        }
        let document = self.obligations.document(reference)?;
        let schedule = Apportioner::apportion(document, stages, self.rounding)?;
        let ids = self.obligations.insert_schedule(reference, schedule)?;
        info!("generated {} obligations for {}", ids.len(), reference);
        self.refresh(ids.iter().copied(), today());
        Ok(ids)
    }

    /// Add a credit in the document's currency.
    pub fn add_credit(&mut self, reference: &DocumentRef, amount: i64, label: &str) -> Result<Uuid> {
        if amount <= 0 {
            return Err(SettlementError::InvalidAmount {
                reason: format!("credit amount must be positive, got {amount}"),
            });
        }
        let currency = self.obligations.document(reference)?.currency.clone();
        let credit = Obligation::credit(reference.clone(), label, amount, currency);
        let id = self.obligations.insert_credit(credit)?;
        info!("added credit {} of {} to {}", id, amount, reference);
        Ok(id)
    }

    /// Replace a document's anchors and recompute its due dates.
    pub fn update_anchors(&mut self, reference: &DocumentRef, anchors: AnchorDates) -> Result<usize> {
        let changed = self.obligations.update_anchors(reference, anchors)?;
        debug!("anchors of {} updated, {} due dates changed", reference, changed);
        let ids: Vec<Uuid> = self
            .obligations
            .for_document(reference)
            .iter()
            .map(|o| o.id())
            .collect();
        self.refresh(ids, today());
        Ok(changed)
    }

    /// Waive an obligation. Terminal: nothing may be allocated to it afterwards.
    pub fn waive(&mut self, obligation_id: Uuid, actor: &str) -> Result<()> {
        let ob = self.obligations.get_mut(obligation_id)?;
        ob.waive(actor, Utc::now())?;
        info!("waived obligation {} by {}", obligation_id, actor);
        self.refresh([obligation_id], today());
        Ok(())
    }

    // --- Payments ---

    pub fn record_payment(&mut self, payment: Payment) -> Result<Uuid> {
        self.currencies.require(payment.currency())?;
        Ok(self.ledger.record(payment))
    }

    pub fn approve_payment(&mut self, id: Uuid, actor: &str) -> Result<()> {
        self.ledger.approve(id, actor, Utc::now())?;
        let touched = self.touched_by_payment(id);
        self.refresh(touched, today());
        Ok(())
    }

    pub fn reject_payment(&mut self, id: Uuid, reason: &str) -> Result<()> {
        self.ledger.reject(id, reason)?;
        let touched = self.touched_by_payment(id);
        self.refresh(touched, today());
        Ok(())
    }

    /// Delete a pending payment and its allocations.
    pub fn delete_payment(&mut self, id: Uuid) -> Result<Payment> {
        let touched = self.touched_by_payment(id);
        let payment = self.ledger.delete_payment(id)?;
        self.refresh(touched, today());
        Ok(payment)
    }

    pub fn payment(&self, id: Uuid) -> Result<&Payment> {
        self.ledger.payment(id)
    }

    pub fn payments(&self) -> impl Iterator<Item = &Payment> {
        self.ledger.payments()
    }

    /// Payment amount not yet allocated, in the payment's currency.
    pub fn unallocated(&self, payment_id: Uuid) -> Result<i64> {
        self.ledger.unallocated(payment_id)
    }

    // --- Allocations ---

    /// Allocate part of a payment to one obligation, optionally netting a credit.
    pub fn allocate(&mut self, request: AllocationRequest) -> Result<Allocation> {
        let target = self.obligations.get(request.obligation_id)?;
        let credit = match request.credit_id {
            Some(id) => Some(self.obligations.get(id)?),
            None => None,
        };
        let allocation = self
            .ledger
            .allocate(&request, target, credit, &self.rates, self.rounding)?;
        self.refresh(touched_by_allocation(&allocation), today());
        Ok(allocation)
    }

    /// Allocate a payment across several obligations as one unit: either every
    /// request succeeds or none is recorded.
    pub fn allocate_many(&mut self, requests: &[AllocationRequest]) -> Result<Vec<Allocation>> {
        let mut staged = self.ledger.clone();
        let mut created = Vec::with_capacity(requests.len());
        for request in requests {
            let target = self.obligations.get(request.obligation_id)?;
            let credit = match request.credit_id {
                Some(id) => Some(self.obligations.get(id)?),
                None => None,
            };
            match staged.allocate(request, target, credit, &self.rates, self.rounding) {
                Ok(allocation) => created.push(allocation),
                Err(e) => {
                    warn!(
                        "batch of {} allocations discarded at obligation {}: {}",
                        requests.len(),
                        request.obligation_id,
                        e
                    );
                    return Err(e);
                }
            }
        }
        self.ledger = staged;
        let touched: Vec<Uuid> = created.iter().flat_map(touched_by_allocation).collect();
        self.refresh(touched, today());
        Ok(created)
    }

    /// Remove an allocation whose payment is still pending approval.
    pub fn remove_allocation(&mut self, id: Uuid) -> Result<Allocation> {
        let allocation = self.ledger.remove_allocation(id)?;
        self.refresh(touched_by_allocation(&allocation), today());
        Ok(allocation)
    }

    pub fn allocations(&self) -> &[Allocation] {
        self.ledger.allocations()
    }

    pub fn allocations_for_payment(&self, payment_id: Uuid) -> Vec<&Allocation> {
        self.ledger.allocations_for_payment(payment_id).collect()
    }

    // --- Derived state ---

    fn derive(&self, obligation: &Obligation, as_of: NaiveDate) -> SettlementState {
        state::evaluate(obligation, self.ledger.history_for(obligation.id()), as_of)
    }

    fn view(&self, obligation: &Obligation, as_of: NaiveDate) -> ObligationView {
        ObligationView {
            obligation: obligation.clone(),
            state: self.derive(obligation, as_of),
        }
    }

    /// Obligations of a document in schedule order, with derived state.
    pub fn obligations(&self, reference: &DocumentRef, as_of: NaiveDate) -> Result<Vec<ObligationView>> {
        self.obligations.document(reference)?;
        Ok(self
            .obligations
            .for_document(reference)
            .into_iter()
            .map(|ob| self.view(ob, as_of))
            .collect())
    }

    pub fn obligation(&self, id: Uuid, as_of: NaiveDate) -> Result<ObligationView> {
        let ob = self.obligations.get(id)?;
        Ok(self.view(ob, as_of))
    }

    /// Amount still owed, from approved allocations only. Independent of date.
    pub fn outstanding_balance(&self, id: Uuid) -> Result<i64> {
        let ob = self.obligations.get(id)?;
        let settled = state::settled_amount(ob, self.ledger.history_for(id));
        Ok(state::outstanding_balance(ob, settled))
    }

    /// Room left for new allocations against a normal obligation.
    ///
    /// Pending allocations already reserve it, so this can be lower than
    /// [`outstanding_balance`](Self::outstanding_balance) and is the largest
    /// amount (in the obligation's currency) that `allocate` accepts.
    pub fn allocatable(&self, id: Uuid) -> Result<i64> {
        let ob = self.obligations.get(id)?;
        if ob.is_credit() {
            return Err(SettlementError::InvalidAllocation {
                reason: format!("obligation {id} is a credit, see credit_available"),
            });
        }
        if ob.is_waived() {
            return Ok(0);
        }
        Ok((ob.amount() - self.ledger.committed(id)).max(0))
    }

    /// Unconsumed part of a credit. Pending allocations already consume it.
    pub fn credit_available(&self, credit_id: Uuid) -> Result<i64> {
        let credit = self.obligations.get(credit_id)?;
        if !credit.is_credit() {
            return Err(SettlementError::InvalidAllocation {
                reason: format!("obligation {credit_id} is not a credit"),
            });
        }
        if credit.is_waived() {
            return Ok(0);
        }
        Ok(credit.amount() - self.ledger.committed(credit_id))
    }

    /// Whether a document's schedule sums exactly to its total.
    pub fn is_balanced(&self, reference: &DocumentRef) -> Result<bool> {
        self.obligations.is_balanced(reference)
    }

    /// Rewrite every cached status from the derivation as of `as_of`.
    ///
    /// Returns how many cached statuses changed.
    pub fn refresh_statuses(&mut self, as_of: NaiveDate) -> usize {
        let ids: Vec<Uuid> = self.obligations.all().map(|o| o.id()).collect();
        let changed = self.refresh(ids, as_of);
        debug!("refreshed status cache as of {}: {} changed", as_of, changed);
        changed
    }

    fn refresh(&mut self, ids: impl IntoIterator<Item = Uuid>, as_of: NaiveDate) -> usize {
        let ledger = &self.ledger;
        let mut changed = 0;
        for id in ids {
            if let Ok(ob) = self.obligations.get_mut(id) {
                let derived = state::evaluate(ob, ledger.history_for(id), as_of);
                if ob.cached_status() != derived.status {
                    ob.set_cached_status(derived.status);
                    changed += 1;
                }
            }
        }
        changed
    }

    fn touched_by_payment(&self, payment_id: Uuid) -> BTreeSet<Uuid> {
        self.ledger
            .allocations_for_payment(payment_id)
            .flat_map(touched_by_allocation)
            .collect()
    }

    // --- Reporting ---

    /// Aggregate one document's obligations.
    pub fn document_summary(&self, reference: &DocumentRef, as_of: NaiveDate) -> Result<SettlementSummary> {
        let views = self.obligations(reference, as_of)?;
        Ok(aggregate(
            views.iter().map(|v| (&v.obligation, &v.state)),
            &self.rates,
            &self.base_currency,
            as_of,
            self.rounding,
        ))
    }

    /// Aggregate everything, split into receivables and payables.
    pub fn portfolio_summary(&self, as_of: NaiveDate) -> PortfolioSummary {
        let derived: Vec<(&Obligation, SettlementState)> = self
            .obligations
            .all()
            .map(|ob| (ob, self.derive(ob, as_of)))
            .collect();
        portfolio(
            derived.iter().map(|(ob, s)| (*ob, s)),
            &self.rates,
            &self.base_currency,
            as_of,
            self.rounding,
        )
    }
}

fn touched_by_allocation(allocation: &Allocation) -> impl Iterator<Item = Uuid> {
    std::iter::once(allocation.obligation_id).chain(allocation.credit_id)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payment::PaymentDirection;
    use crate::core::term::CalculationBase;
    use crate::error::ErrorKind;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn book() -> SettlementBook {
        SettlementBook::new(&EngineConfig::default()).unwrap()
    }

    fn single_stage_document(book: &mut SettlementBook, id: &str, total: i64, currency: &str) -> (DocumentRef, Uuid) {
        let doc = DocumentRef::payable(id);
        book.register_document(PayableDocument::new(doc.clone(), total, currency.into()))
            .unwrap();
        let ids = book
            .generate_schedule_from_stages(&doc, &[PaymentTermStage::new(100, CalculationBase::IssueDate, 30)])
            .unwrap();
        (doc, ids[0])
    }

    fn payment(book: &mut SettlementBook, amount: i64, currency: &str) -> Uuid {
        let p = Payment::new(
            PaymentDirection::Outbound,
            "SUPPLIER-1".into(),
            amount,
            currency.into(),
            today(),
        )
        .unwrap();
        book.record_payment(p).unwrap()
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let mut book = book();
        let doc = PayableDocument::new(DocumentRef::payable("PO-1"), 100, "GBP".into());
        let err = book.register_document(doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_schedule_generated_once() {
        let mut book = book();
        let (doc, _) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        let err = book
            .generate_schedule_from_stages(&doc, &[PaymentTermStage::new(100, CalculationBase::OrderDate, 0)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(book.is_balanced(&doc).unwrap());
    }

    #[test]
    fn test_invalid_stages_leave_book_untouched() {
        let mut book = book();
        let doc = DocumentRef::payable("PO-1");
        book.register_document(PayableDocument::new(doc.clone(), 10_000, "USD".into()))
            .unwrap();
        let err = book
            .generate_schedule_from_stages(&doc, &[PaymentTermStage::new(60, CalculationBase::OrderDate, 0)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTerm);
        assert!(book.obligations(&doc, today()).unwrap().is_empty());
    }

    #[test]
    fn test_approval_updates_cache() {
        let mut book = book();
        let (_, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        let pid = payment(&mut book, 10_000, "USD");
        book.allocate(AllocationRequest::new(pid, ob, 10_000)).unwrap();
        assert_eq!(book.obligation(ob, today()).unwrap().status(), ObligationStatus::Pending);

        book.approve_payment(pid, "controller").unwrap();
        let view = book.obligation(ob, today()).unwrap();
        assert_eq!(view.status(), ObligationStatus::Paid);
        assert_eq!(view.obligation.cached_status(), ObligationStatus::Paid);
        assert_eq!(book.outstanding_balance(ob).unwrap(), 0);
    }

    #[test]
    fn test_rejection_voids_allocations() {
        let mut book = book();
        let (_, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        let pid = payment(&mut book, 10_000, "USD");
        book.allocate(AllocationRequest::new(pid, ob, 6_000)).unwrap();
        book.reject_payment(pid, "duplicate wire").unwrap();

        assert_eq!(book.allocations().len(), 1);
        assert_eq!(book.outstanding_balance(ob).unwrap(), 10_000);

        // The whole balance is free again for another payment.
        let second = payment(&mut book, 10_000, "USD");
        book.allocate(AllocationRequest::new(second, ob, 10_000)).unwrap();
    }

    #[test]
    fn test_allocate_many_is_atomic() {
        let mut book = book();
        let (_, a) = single_stage_document(&mut book, "PO-1", 5_000, "USD");
        let (_, b) = single_stage_document(&mut book, "PO-2", 5_000, "USD");
        let pid = payment(&mut book, 9_000, "USD");

        let err = book
            .allocate_many(&[
                AllocationRequest::new(pid, a, 5_000),
                AllocationRequest::new(pid, b, 5_000),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverAllocation);
        assert!(book.allocations().is_empty());

        let created = book
            .allocate_many(&[
                AllocationRequest::new(pid, a, 5_000),
                AllocationRequest::new(pid, b, 4_000),
            ])
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(book.unallocated(pid).unwrap(), 0);
    }

    #[test]
    fn test_credit_netting() {
        let mut book = book();
        let (doc, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        let credit = book.add_credit(&doc, 2_000, "Quality deduction").unwrap();
        let pid = payment(&mut book, 10_000, "USD");

        book.allocate(AllocationRequest::new(pid, ob, 2_000).with_credit(credit))
            .unwrap();
        assert_eq!(book.credit_available(credit).unwrap(), 0);
        assert!(book.credit_available(ob).is_err());

        let views = book.obligations(&doc, today()).unwrap();
        assert!(views.last().unwrap().obligation.is_credit());
        assert!(book.is_balanced(&doc).unwrap());
    }

    #[test]
    fn test_waived_obligation_refuses_allocations() {
        let mut book = book();
        let (_, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        book.waive(ob, "ops").unwrap();
        assert_eq!(book.waive(ob, "ops").unwrap_err().kind(), ErrorKind::AlreadyWaived);

        let pid = payment(&mut book, 10_000, "USD");
        assert!(book.allocate(AllocationRequest::new(pid, ob, 1)).is_err());
        assert_eq!(book.outstanding_balance(ob).unwrap(), 0);
    }

    #[test]
    fn test_update_anchors_moves_due_date() {
        let mut book = book();
        let (doc, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        assert_eq!(book.obligation(ob, today()).unwrap().obligation.due_date(), None);

        let issued = today() - Duration::days(60);
        let anchors = AnchorDates {
            issue_date: Some(issued),
            ..Default::default()
        };
        assert_eq!(book.update_anchors(&doc, anchors).unwrap(), 1);

        let view = book.obligation(ob, today()).unwrap();
        assert_eq!(view.obligation.due_date(), Some(issued + Duration::days(30)));
        assert_eq!(view.status(), ObligationStatus::Overdue);
        assert_eq!(view.obligation.cached_status(), ObligationStatus::Overdue);
    }

    #[test]
    fn test_refresh_statuses_matches_derivation() {
        let mut book = book();
        let (doc, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        book.update_anchors(
            &doc,
            AnchorDates {
                issue_date: NaiveDate::from_ymd_opt(2026, 1, 1),
                ..Default::default()
            },
        )
        .unwrap();

        let before_due = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        book.refresh_statuses(before_due);
        let view = book.obligation(ob, before_due).unwrap();
        assert_eq!(view.obligation.cached_status(), view.status());
        assert_eq!(view.status(), ObligationStatus::Pending);
    }

    #[test]
    fn test_rate_administration() {
        let mut book = book();
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(book.record_rate("USD".into(), "GBP".into(), dec!(0.8), day).is_err());

        let id = book.record_rate("USD".into(), "EUR".into(), dec!(0.9), day).unwrap();
        assert_eq!(book.approve_rate(id, " ").unwrap_err().kind(), ErrorKind::InvalidInput);
        book.approve_rate(id, "treasury").unwrap();
        assert_eq!(book.approve_rate(id, "treasury").unwrap_err().kind(), ErrorKind::InvalidTransition);
        book.remove_rate(id).unwrap();
    }

    #[test]
    fn test_document_summary_flags_missing_rate() {
        let mut book = book();
        let (doc, _) = single_stage_document(&mut book, "PO-1", 10_000, "EUR");
        let summary = book.document_summary(&doc, today()).unwrap();
        assert!(summary.missing_exchange_rate);
        assert_eq!(summary.unconverted_currencies, vec![CurrencyCode::new("EUR")]);
        assert_eq!(summary.converted.total, 0);
    }

    #[test]
    fn test_delete_payment_frees_capacity() {
        let mut book = book();
        let (_, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        let pid = payment(&mut book, 10_000, "USD");
        book.allocate(AllocationRequest::new(pid, ob, 10_000)).unwrap();
        book.delete_payment(pid).unwrap();
        assert!(book.allocations().is_empty());
        assert!(book.payment(pid).is_err());
    }

    #[test]
    fn test_allocatable_counts_pending_reservations() {
        let mut book = book();
        let (_, ob) = single_stage_document(&mut book, "PO-1", 10_000, "USD");
        let pending = payment(&mut book, 3_000, "USD");
        book.allocate(AllocationRequest::new(pending, ob, 3_000)).unwrap();

        assert_eq!(book.outstanding_balance(ob).unwrap(), 10_000);
        assert_eq!(book.allocatable(ob).unwrap(), 7_000);

        let next = payment(&mut book, 10_000, "USD");
        let err = book
            .allocate(AllocationRequest::new(next, ob, 10_000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverAllocation);
        book.allocate(AllocationRequest::new(next, ob, 7_000)).unwrap();
        assert_eq!(book.allocatable(ob).unwrap(), 0);

        book.reject_payment(pending, "bounced").unwrap();
        assert_eq!(book.allocatable(ob).unwrap(), 3_000);
    }
}
