use crate::core::document::{AnchorDates, DocumentRef, PayableDocument};
use crate::core::obligation::Obligation;
use crate::error::{Result, SettlementError};
use crate::schedule::due_date::resolve_due_date;
use std::collections::HashMap;
use uuid::Uuid;

/// Documents and the obligations scheduled against them.
#[derive(Debug, Clone, Default)]
pub struct ObligationStore {
    documents: HashMap<DocumentRef, PayableDocument>,
    obligations: HashMap<Uuid, Obligation>,
    /// Obligation ids per document, in insertion order.
    by_document: HashMap<DocumentRef, Vec<Uuid>>,
}

impl ObligationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_document(&mut self, document: PayableDocument) -> Result<()> {
        if self.documents.contains_key(&document.reference) {
            return Err(SettlementError::DocumentExists(document.reference));
        }
        self.by_document
            .insert(document.reference.clone(), Vec::new());
        self.documents.insert(document.reference.clone(), document);
        Ok(())
    }

    pub fn document(&self, reference: &DocumentRef) -> Result<&PayableDocument> {
        self.documents
            .get(reference)
            .ok_or_else(|| SettlementError::UnknownDocument(reference.clone()))
    }

    pub fn documents(&self) -> impl Iterator<Item = &PayableDocument> {
        self.documents.values()
    }

    /// Whether the document already has stage (non-credit) obligations.
    pub fn has_schedule(&self, reference: &DocumentRef) -> bool {
        self.for_document(reference).iter().any(|o| !o.is_credit())
    }

    /// Persist a freshly apportioned schedule for a registered document.
    ///
    /// A document carries at most one schedule.
    pub fn insert_schedule(
        &mut self,
        reference: &DocumentRef,
        schedule: Vec<Obligation>,
    ) -> Result<Vec<Uuid>> {
        self.document(reference)?;
        if self.has_schedule(reference) {
            return Err(SettlementError::ScheduleExists(reference.clone()));
        }
        let ids: Vec<Uuid> = schedule.iter().map(|o| o.id()).collect();
        for ob in schedule {
            self.insert(ob);
        }
        Ok(ids)
    }

    /// Append a credit obligation after everything already scheduled.
    pub fn insert_credit(&mut self, credit: Obligation) -> Result<Uuid> {
        self.document(credit.document())?;
        let next = self
            .for_document(credit.document())
            .iter()
            .map(|o| o.sort_order() + 1)
            .max()
            .unwrap_or(0);
        let credit = credit.with_sort_order(next);
        let id = credit.id();
        self.insert(credit);
        Ok(id)
    }

    fn insert(&mut self, ob: Obligation) {
        self.by_document
            .entry(ob.document().clone())
            .or_default()
            .push(ob.id());
        self.obligations.insert(ob.id(), ob);
    }

    /// Replace a document's anchors and recompute stage-derived due dates.
    ///
    /// Returns the number of obligations whose due date changed.
    pub fn update_anchors(&mut self, reference: &DocumentRef, anchors: AnchorDates) -> Result<usize> {
        let document = self
            .documents
            .get_mut(reference)
            .ok_or_else(|| SettlementError::UnknownDocument(reference.clone()))?;
        document.anchors = anchors;

        let mut changed = 0;
        for id in self.by_document.get(reference).into_iter().flatten() {
            if let Some(ob) = self.obligations.get_mut(id) {
                if let Some(condition) = ob.due_condition() {
                    let due = resolve_due_date(&document.anchors, condition);
                    if due != ob.due_date() {
                        ob.set_due_date(due);
                        changed += 1;
                    }
                }
            }
        }
        Ok(changed)
    }

    pub fn get(&self, id: Uuid) -> Result<&Obligation> {
        self.obligations
            .get(&id)
            .ok_or(SettlementError::UnknownObligation(id))
    }

    pub fn get_mut(&mut self, id: Uuid) -> Result<&mut Obligation> {
        self.obligations
            .get_mut(&id)
            .ok_or(SettlementError::UnknownObligation(id))
    }

    /// Obligations of one document ordered by `sort_order`.
    pub fn for_document(&self, reference: &DocumentRef) -> Vec<&Obligation> {
        let mut obs: Vec<&Obligation> = self
            .by_document
            .get(reference)
            .into_iter()
            .flatten()
            .filter_map(|id| self.obligations.get(id))
            .collect();
        obs.sort_by_key(|o| o.sort_order());
        obs
    }

    pub fn all(&self) -> impl Iterator<Item = &Obligation> {
        self.obligations.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Obligation> {
        self.obligations.values_mut()
    }

    /// Sum of non-credit obligation amounts for a document.
    pub fn schedule_total(&self, reference: &DocumentRef) -> i64 {
        self.for_document(reference)
            .iter()
            .filter(|o| !o.is_credit())
            .map(|o| o.amount())
            .sum()
    }

    /// Whether the non-credit obligations sum exactly to the document total.
    pub fn is_balanced(&self, reference: &DocumentRef) -> Result<bool> {
        let document = self.document(reference)?;
        Ok(self.schedule_total(reference) == document.total_amount)
    }

    pub fn len(&self) -> usize {
        self.obligations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::money::RoundingPolicy;
    use crate::core::term::{CalculationBase, PaymentTermStage};
    use crate::schedule::apportion::Apportioner;
    use chrono::NaiveDate;

    fn setup() -> (ObligationStore, DocumentRef) {
        let mut store = ObligationStore::new();
        let reference = DocumentRef::payable("PO-7");
        let document = PayableDocument::new(reference.clone(), 1_000, CurrencyCode::new("CNY"));
        store.register_document(document.clone()).unwrap();
        let stages = vec![
            PaymentTermStage::new(30, CalculationBase::OrderDate, 0),
            PaymentTermStage::new(70, CalculationBase::AfterShipment, 10),
        ];
        let schedule = Apportioner::apportion(&document, &stages, RoundingPolicy::HalfUp).unwrap();
        store.insert_schedule(&reference, schedule).unwrap();
        (store, reference)
    }

    #[test]
    fn test_schedule_is_balanced() {
        let (store, reference) = setup();
        assert_eq!(store.for_document(&reference).len(), 2);
        assert!(store.is_balanced(&reference).unwrap());
    }

    #[test]
    fn test_second_schedule_rejected() {
        let (mut store, reference) = setup();
        let document = store.document(&reference).unwrap().clone();
        let schedule = Apportioner::apportion(
            &document,
            &[PaymentTermStage::new(100, CalculationBase::OrderDate, 0)],
            RoundingPolicy::HalfUp,
        )
        .unwrap();
        let err = store.insert_schedule(&reference, schedule).unwrap_err();
        assert!(matches!(err, SettlementError::ScheduleExists(_)));
    }

    #[test]
    fn test_credit_excluded_from_total_and_sorted_last() {
        let (mut store, reference) = setup();
        let id = store
            .insert_credit(Obligation::credit(
                reference.clone(),
                "Short shipment",
                50,
                CurrencyCode::new("CNY"),
            ))
            .unwrap();
        assert!(store.is_balanced(&reference).unwrap());
        let obs = store.for_document(&reference);
        assert_eq!(obs.last().unwrap().id(), id);
        assert_eq!(obs.last().unwrap().sort_order(), 2);
    }

    #[test]
    fn test_update_anchors_recomputes_due_dates() {
        let (mut store, reference) = setup();
        let etd = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let changed = store
            .update_anchors(
                &reference,
                AnchorDates {
                    shipment_etd: Some(etd),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(changed, 1);
        let obs = store.for_document(&reference);
        assert_eq!(obs[1].due_date(), NaiveDate::from_ymd_opt(2026, 4, 11));
        assert_eq!(obs[0].due_date(), None);
    }

    #[test]
    fn test_unknown_document() {
        let mut store = ObligationStore::new();
        let err = store
            .insert_schedule(&DocumentRef::payable("nope"), vec![])
            .unwrap_err();
        assert!(matches!(err, SettlementError::UnknownDocument(_)));
        assert!(matches!(
            store.register_document(PayableDocument::new(
                DocumentRef::payable("dup"),
                1,
                CurrencyCode::new("USD")
            )),
            Ok(())
        ));
        assert!(matches!(
            store.register_document(PayableDocument::new(
                DocumentRef::payable("dup"),
                1,
                CurrencyCode::new("USD")
            )),
            Err(SettlementError::DocumentExists(_))
        ));
    }
}
