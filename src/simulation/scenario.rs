//! Replayable settlement scenarios.
//!
//! A [`Scenario`] is a JSON-friendly script of rates, documents, payments and
//! allocations. Obligations are addressed by document and stage index because
//! their ids only exist once the schedule is generated. Random scenarios feed
//! the benchmarks, the property tests and the `generate` CLI command.

use crate::config::{ConfigError, EngineConfig};
use crate::core::currency::{Currency, CurrencyCode};
use crate::core::document::{AnchorDates, DocumentKind, DocumentRef, PayableDocument};
use crate::core::money::RoundingPolicy;
use crate::core::party::CounterpartyId;
use crate::core::payment::{Payment, PaymentDirection};
use crate::core::term::{CalculationBase, PaymentTermStage};
use crate::error::{Result, SettlementError};
use crate::schedule::apportion::Apportioner;
use crate::settlement::book::SettlementBook;
use crate::settlement::ledger::AllocationRequest;
use chrono::{Days, NaiveDate};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateInput {
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub rate: Decimal,
    pub date: NaiveDate,
    /// Approver; the rate stays pending when absent.
    #[serde(default)]
    pub approved_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditInput {
    pub label: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    #[serde(flatten)]
    pub document: PayableDocument,
    pub stages: Vec<PaymentTermStage>,
    #[serde(default)]
    pub credits: Vec<CreditInput>,
}

/// An allocation addressed by document and stage position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInput {
    pub document: DocumentRef,
    pub stage: usize,
    pub amount: i64,
    /// Index into the document's credits.
    #[serde(default)]
    pub credit: Option<usize>,
}

/// What happens to a payment after its allocations are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    #[default]
    Pending,
    Approved { by: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub direction: PaymentDirection,
    pub counterparty: CounterpartyId,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub allocations: Vec<AllocationInput>,
    #[serde(default)]
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub rates: Vec<RateInput>,
    #[serde(default)]
    pub documents: Vec<DocumentInput>,
    #[serde(default)]
    pub payments: Vec<PaymentInput>,
}

type Schedules = HashMap<DocumentRef, (Vec<Uuid>, Vec<Uuid>)>;

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a fresh book and apply every step in order.
    ///
    /// Stops at the first failing command and returns its error.
    pub fn replay(&self) -> Result<SettlementBook> {
        let mut book = SettlementBook::new(&self.config)?;

        for rate in &self.rates {
            let id = book.record_rate(rate.base.clone(), rate.target.clone(), rate.rate, rate.date)?;
            if let Some(actor) = &rate.approved_by {
                book.approve_rate(id, actor)?;
            }
        }

        let mut schedules = Schedules::new();
        for input in &self.documents {
            let reference = input.document.reference.clone();
            book.register_document(input.document.clone())?;
            let stages = book.generate_schedule_from_stages(&reference, &input.stages)?;
            let credits = input
                .credits
                .iter()
                .map(|c| book.add_credit(&reference, c.amount, &c.label))
                .collect::<Result<Vec<_>>>()?;
            schedules.insert(reference, (stages, credits));
        }

        for input in &self.payments {
            let payment = Payment::new(
                input.direction,
                input.counterparty.clone(),
                input.amount,
                input.currency.clone(),
                input.payment_date,
            )?;
            let payment_id = book.record_payment(payment)?;
            let requests = input
                .allocations
                .iter()
                .map(|a| resolve_allocation(a, payment_id, &schedules))
                .collect::<Result<Vec<_>>>()?;
            if !requests.is_empty() {
                book.allocate_many(&requests)?;
            }
            match &input.outcome {
                PaymentOutcome::Pending => {}
                PaymentOutcome::Approved { by } => book.approve_payment(payment_id, by)?,
                PaymentOutcome::Rejected { reason } => book.reject_payment(payment_id, reason)?,
            }
        }

        info!(
            "replayed scenario: {} rates, {} documents, {} payments",
            self.rates.len(),
            self.documents.len(),
            self.payments.len()
        );
        Ok(book)
    }
}

fn resolve_allocation(input: &AllocationInput, payment_id: Uuid, schedules: &Schedules) -> Result<AllocationRequest> {
    let (stages, credits) = schedules
        .get(&input.document)
        .ok_or_else(|| SettlementError::UnknownDocument(input.document.clone()))?;
    let obligation_id = *stages
        .get(input.stage)
        .ok_or_else(|| SettlementError::InvalidAllocation {
            reason: format!("{} has no stage {}", input.document, input.stage),
        })?;
    let mut request = AllocationRequest::new(payment_id, obligation_id, input.amount);
    if let Some(index) = input.credit {
        let credit_id = *credits
            .get(index)
            .ok_or_else(|| SettlementError::InvalidAllocation {
                reason: format!("{} has no credit {}", input.document, index),
            })?;
        request = request.with_credit(credit_id);
    }
    Ok(request)
}

/// Parameters for [`generate_random_scenario`].
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub document_count: usize,
    /// The first currency is the base currency.
    pub currencies: Vec<CurrencyCode>,
    /// Document totals, in minor units.
    pub min_amount: i64,
    pub max_amount: i64,
    /// Share of documents that receive a payment.
    pub payment_ratio: f64,
    pub approval_ratio: f64,
    pub rejection_ratio: f64,
    pub credit_ratio: f64,
    /// Record an approved rate from the base currency to every other one.
    pub with_rates: bool,
    pub start: NaiveDate,
    pub rounding: RoundingPolicy,
    /// Fixed seed for reproducible scenarios.
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            document_count: 10,
            currencies: vec![
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                CurrencyCode::new("CNY"),
            ],
            min_amount: 100_000,
            max_amount: 100_000_000,
            payment_ratio: 0.7,
            approval_ratio: 0.7,
            rejection_ratio: 0.1,
            credit_ratio: 0.1,
            with_rates: true,
            start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
            rounding: RoundingPolicy::HalfUp,
            seed: None,
        }
    }
}

fn stage_template(index: usize) -> Vec<PaymentTermStage> {
    match index {
        0 => vec![PaymentTermStage::new(100, CalculationBase::IssueDate, 30).with_label("Net 30")],
        1 => vec![
            PaymentTermStage::new(30, CalculationBase::OrderDate, 0).with_label("Deposit"),
            PaymentTermStage::new(70, CalculationBase::BeforeShipment, -5)
                .with_label("Balance")
                .blocking(),
        ],
        _ => vec![
            PaymentTermStage::new(30, CalculationBase::OrderDate, 0).with_label("Deposit"),
            PaymentTermStage::new(40, CalculationBase::AfterShipment, 15),
            PaymentTermStage::new(30, CalculationBase::AfterDelivery, 30).with_label("Retention"),
        ],
    }
}

fn days_after(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

/// Generate a random scenario that replays without errors.
///
/// Every payment is in its document's currency and allocates at most the
/// first stage's amount, so allocations never need a rate or exceed a balance.
pub fn generate_random_scenario(config: &ScenarioConfig) -> Scenario {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let currencies: Vec<CurrencyCode> = if config.currencies.is_empty() {
        vec![CurrencyCode::new("USD")]
    } else {
        config.currencies.clone()
    };
    let base = currencies[0].clone();

    let engine_config = EngineConfig {
        rounding: config.rounding,
        currencies: currencies
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let currency = Currency::new(code.as_str(), 2);
                if i == 0 {
                    currency.base()
                } else {
                    currency
                }
            })
            .collect(),
    };

    let rates = if config.with_rates {
        currencies
            .iter()
            .skip(1)
            .map(|target| RateInput {
                base: base.clone(),
                target: target.clone(),
                rate: Decimal::new(rng.gen_range(5_000..80_000), 4),
                date: config.start,
                approved_by: Some("simulation".into()),
            })
            .collect()
    } else {
        Vec::new()
    };

    let min = config.min_amount.max(1);
    let max = config.max_amount.max(min);
    let mut documents = Vec::with_capacity(config.document_count);
    let mut payments = Vec::new();

    for i in 0..config.document_count {
        let kind = if rng.gen_bool(0.5) {
            DocumentKind::Receivable
        } else {
            DocumentKind::Payable
        };
        let reference = match kind {
            DocumentKind::Receivable => DocumentRef::receivable(format!("SO-{:05}", i)),
            DocumentKind::Payable => DocumentRef::payable(format!("PO-{:05}", i)),
        };
        let currency = currencies[rng.gen_range(0..currencies.len())].clone();
        let total = rng.gen_range(min..=max);

        let order_date = days_after(config.start, rng.gen_range(0..90));
        let etd = days_after(order_date, rng.gen_range(15..60));
        let eta = days_after(etd, rng.gen_range(20..40));
        let shipped = rng.gen_bool(0.8);
        let anchors = AnchorDates {
            order_date: Some(order_date),
            issue_date: Some(days_after(order_date, rng.gen_range(0..10))),
            shipment_etd: shipped.then_some(etd),
            shipment_eta: shipped.then_some(eta),
            delivery_date: shipped.then(|| days_after(eta, 3)),
        };

        let document = PayableDocument::new(reference.clone(), total, currency.clone()).with_anchors(anchors);
        let stages = stage_template(rng.gen_range(0..3));

        let credits = if rng.gen_bool(config.credit_ratio.clamp(0.0, 1.0)) && total >= 20 {
            vec![CreditInput {
                label: "Supplier deduction".into(),
                amount: total / 20,
            }]
        } else {
            Vec::new()
        };

        if rng.gen_bool(config.payment_ratio.clamp(0.0, 1.0)) {
            let first_stage = Apportioner::apportion(&document, &stages, config.rounding)
                .ok()
                .and_then(|schedule| schedule.first().map(|ob| ob.amount()))
                .unwrap_or(0);
            if first_stage > 0 {
                let allocated = rng.gen_range(1..=first_stage);
                let amount = allocated + rng.gen_range(0..=allocated / 10);
                let roll: f64 = rng.gen();
                let outcome = if roll < config.approval_ratio {
                    PaymentOutcome::Approved {
                        by: "controller".into(),
                    }
                } else if roll < config.approval_ratio + config.rejection_ratio {
                    PaymentOutcome::Rejected {
                        reason: "returned by bank".into(),
                    }
                } else {
                    PaymentOutcome::Pending
                };
                let (direction, counterparty) = match kind {
                    DocumentKind::Receivable => (
                        PaymentDirection::Inbound,
                        CounterpartyId::new(format!("CUST-{:03}", rng.gen_range(0..50))),
                    ),
                    DocumentKind::Payable => (
                        PaymentDirection::Outbound,
                        CounterpartyId::new(format!("SUP-{:03}", rng.gen_range(0..50))),
                    ),
                };
                payments.push(PaymentInput {
                    direction,
                    counterparty,
                    amount,
                    currency: currency.clone(),
                    payment_date: days_after(order_date, rng.gen_range(0..120)),
                    allocations: vec![AllocationInput {
                        document: reference.clone(),
                        stage: 0,
                        amount: allocated,
                        credit: None,
                    }],
                    outcome,
                });
            }
        }

        documents.push(DocumentInput {
            document,
            stages,
            credits,
        });
    }

    Scenario {
        config: engine_config,
        rates,
        documents,
        payments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::obligation::ObligationStatus;

    #[test]
    fn test_random_scenario_replays() {
        let config = ScenarioConfig {
            document_count: 40,
            seed: Some(7),
            ..Default::default()
        };
        let scenario = generate_random_scenario(&config);
        assert_eq!(scenario.documents.len(), 40);

        let book = scenario.replay().unwrap();
        for input in &scenario.documents {
            assert!(book.is_balanced(&input.document.reference).unwrap());
        }
        let summary = book.portfolio_summary(config.start);
        assert!(!summary.missing_exchange_rate());
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let config = ScenarioConfig {
            seed: Some(42),
            ..Default::default()
        };
        assert_eq!(generate_random_scenario(&config), generate_random_scenario(&config));
    }

    #[test]
    fn test_without_rates_flags_foreign_currencies() {
        let config = ScenarioConfig {
            document_count: 30,
            currencies: vec![CurrencyCode::new("USD"), CurrencyCode::new("EUR")],
            with_rates: false,
            seed: Some(3),
            ..Default::default()
        };
        let scenario = generate_random_scenario(&config);
        let has_eur = scenario
            .documents
            .iter()
            .any(|d| d.document.currency.as_str() == "EUR");
        let summary = scenario.replay().unwrap().portfolio_summary(config.start);
        assert_eq!(summary.missing_exchange_rate(), has_eur);
    }

    #[test]
    fn test_scenario_json_replay() {
        let json = r#"{
            "rates": [],
            "documents": [{
                "reference": { "kind": "RECEIVABLE", "id": "SO-1" },
                "total_amount": 10000,
                "currency": "USD",
                "anchors": { "issue_date": "2026-01-01" },
                "stages": [{ "percentage": 100, "calculation_base": "ISSUE_DATE", "days_offset": 10 }]
            }],
            "payments": [{
                "direction": "INBOUND",
                "counterparty": "CUST-1",
                "amount": 10000,
                "currency": "USD",
                "payment_date": "2026-01-05",
                "allocations": [{ "document": { "kind": "RECEIVABLE", "id": "SO-1" }, "stage": 0, "amount": 10000 }],
                "outcome": { "status": "APPROVED", "by": "controller" }
            }]
        }"#;
        let scenario = Scenario::from_json_str(json).unwrap();
        let book = scenario.replay().unwrap();
        let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let views = book.obligations(&DocumentRef::receivable("SO-1"), as_of).unwrap();
        assert_eq!(views[0].status(), ObligationStatus::Paid);
    }

    #[test]
    fn test_unknown_stage_fails_replay() {
        let mut scenario = generate_random_scenario(&ScenarioConfig {
            document_count: 1,
            payment_ratio: 0.0,
            seed: Some(1),
            ..Default::default()
        });
        let doc = scenario.documents[0].document.clone();
        scenario.payments.push(PaymentInput {
            direction: PaymentDirection::Inbound,
            counterparty: CounterpartyId::new("CUST-1"),
            amount: 1,
            currency: doc.currency.clone(),
            payment_date: doc.anchors.order_date.unwrap_or_default(),
            allocations: vec![AllocationInput {
                document: doc.reference.clone(),
                stage: 9,
                amount: 1,
                credit: None,
            }],
            outcome: PaymentOutcome::Pending,
        });
        assert!(scenario.replay().is_err());
    }
}
