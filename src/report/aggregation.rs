use crate::core::currency::CurrencyCode;
use crate::core::document::DocumentKind;
use crate::core::money::{convert, RoundingPolicy};
use crate::core::obligation::{Obligation, ObligationStatus};
use crate::fx::resolver::RateResolver;
use crate::settlement::state::SettlementState;
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rolled-up figures for one currency, in that currency's minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyBreakdown {
    pub currency: CurrencyCode,
    pub obligation_count: usize,
    /// Sum of non-credit, non-waived obligation amounts.
    pub total: i64,
    /// Approved allocations against non-credit obligations, waived included.
    pub settled: i64,
    pub outstanding: i64,
    /// Outstanding amount of obligations past their due date, whatever their
    /// status says.
    pub overdue: i64,
    /// Credits not yet consumed by netting.
    pub credit_available: i64,
}

impl CurrencyBreakdown {
    pub fn new(currency: CurrencyCode) -> Self {
        Self {
            currency,
            obligation_count: 0,
            total: 0,
            settled: 0,
            outstanding: 0,
            overdue: 0,
            credit_available: 0,
        }
    }
}

/// The same figures converted into the base currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedTotals {
    pub total: i64,
    pub settled: i64,
    pub outstanding: i64,
    pub overdue: i64,
    pub credit_available: i64,
}

impl ConvertedTotals {
    fn add(&mut self, other: &ConvertedTotals) {
        self.total = self.total.saturating_add(other.total);
        self.settled = self.settled.saturating_add(other.settled);
        self.outstanding = self.outstanding.saturating_add(other.outstanding);
        self.overdue = self.overdue.saturating_add(other.overdue);
        self.credit_available = self.credit_available.saturating_add(other.credit_available);
    }
}

/// Aggregate settlement figures over a set of obligations.
///
/// Currencies that cannot be converted into the base currency are still
/// reported in `by_currency`, but are left out of `converted` and listed in
/// `unconverted_currencies`, with `missing_exchange_rate` raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub as_of: NaiveDate,
    pub base_currency: CurrencyCode,
    pub by_currency: BTreeMap<CurrencyCode, CurrencyBreakdown>,
    pub converted: ConvertedTotals,
    pub missing_exchange_rate: bool,
    pub unconverted_currencies: Vec<CurrencyCode>,
}

impl SettlementSummary {
    pub fn currency(&self, code: &CurrencyCode) -> Option<&CurrencyBreakdown> {
        self.by_currency.get(code)
    }
}

/// Receivables and payables summarised separately: settled money is
/// "received" on the first and "paid" on the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub receivables: SettlementSummary,
    pub payables: SettlementSummary,
}

impl PortfolioSummary {
    /// Money received against receivables, in the base currency.
    pub fn received(&self) -> i64 {
        self.receivables.converted.settled
    }

    /// Money paid against payables, in the base currency.
    pub fn paid(&self) -> i64 {
        self.payables.converted.settled
    }

    pub fn missing_exchange_rate(&self) -> bool {
        self.receivables.missing_exchange_rate || self.payables.missing_exchange_rate
    }
}

/// Aggregate `(obligation, state)` pairs.
///
/// A pure function of its inputs: the obligations and their derived states,
/// the rates, the base currency and the evaluation date. Waived obligations
/// only contribute what was settled before the waiver; credits only
/// contribute to `credit_available`. Sums saturate at the `i64` bounds.
pub fn aggregate<'a, I>(
    items: I,
    rates: &dyn RateResolver,
    base_currency: &CurrencyCode,
    as_of: NaiveDate,
    rounding: RoundingPolicy,
) -> SettlementSummary
where
    I: IntoIterator<Item = (&'a Obligation, &'a SettlementState)>,
{
    let mut by_currency: BTreeMap<CurrencyCode, CurrencyBreakdown> = BTreeMap::new();

    for (ob, state) in items {
        let entry = by_currency
            .entry(ob.currency().clone())
            .or_insert_with(|| CurrencyBreakdown::new(ob.currency().clone()));

        if ob.is_credit() {
            if !ob.is_waived() {
                let available = (ob.amount() - state.settled).max(0);
                entry.credit_available = entry.credit_available.saturating_add(available);
            }
            continue;
        }
        entry.settled = entry.settled.saturating_add(state.settled);
        if state.status == ObligationStatus::Waived {
            continue;
        }
        entry.obligation_count += 1;
        entry.total = entry.total.saturating_add(ob.amount());
        entry.outstanding = entry.outstanding.saturating_add(state.outstanding);
        if is_past_due(ob, as_of) {
            entry.overdue = entry.overdue.saturating_add(state.outstanding);
        }
    }

    let mut converted = ConvertedTotals::default();
    let mut unconverted = Vec::new();

    for (code, breakdown) in &by_currency {
        match convert_breakdown(breakdown, rates, base_currency, as_of, rounding) {
            Some(totals) => converted.add(&totals),
            None => {
                warn!(
                    "missing exchange rate {} -> {} as of {}; excluded from converted totals",
                    code, base_currency, as_of
                );
                unconverted.push(code.clone());
            }
        }
    }

    debug!(
        "aggregated {} currencies into {} ({} unconverted)",
        by_currency.len(),
        base_currency,
        unconverted.len()
    );

    SettlementSummary {
        as_of,
        base_currency: base_currency.clone(),
        by_currency,
        converted,
        missing_exchange_rate: !unconverted.is_empty(),
        unconverted_currencies: unconverted,
    }
}

// Partially paid obligations stay past due, unlike their status.
fn is_past_due(ob: &Obligation, as_of: NaiveDate) -> bool {
    matches!(ob.due_date(), Some(due) if due < as_of)
}

fn convert_breakdown(
    breakdown: &CurrencyBreakdown,
    rates: &dyn RateResolver,
    base_currency: &CurrencyCode,
    as_of: NaiveDate,
    rounding: RoundingPolicy,
) -> Option<ConvertedTotals> {
    let rate = rates.resolve(&breakdown.currency, base_currency, as_of).ok()?;
    let conv = |amount: i64| convert(amount, rate, rounding).ok();
    Some(ConvertedTotals {
        total: conv(breakdown.total)?,
        settled: conv(breakdown.settled)?,
        outstanding: conv(breakdown.outstanding)?,
        overdue: conv(breakdown.overdue)?,
        credit_available: conv(breakdown.credit_available)?,
    })
}

/// Split `(obligation, state)` pairs by document kind and aggregate each side.
pub fn portfolio<'a, I>(
    items: I,
    rates: &dyn RateResolver,
    base_currency: &CurrencyCode,
    as_of: NaiveDate,
    rounding: RoundingPolicy,
) -> PortfolioSummary
where
    I: IntoIterator<Item = (&'a Obligation, &'a SettlementState)>,
{
    let (receivables, payables): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|(ob, _)| ob.document().kind == DocumentKind::Receivable);
    PortfolioSummary {
        receivables: aggregate(receivables, rates, base_currency, as_of, rounding),
        payables: aggregate(payables, rates, base_currency, as_of, rounding),
    }
}

impl std::fmt::Display for SettlementSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Settlement Summary (as of {}) ===", self.as_of)?;
        writeln!(f, "Base currency:  {}", self.base_currency)?;
        writeln!(f, "Total:          {}", self.converted.total)?;
        writeln!(f, "Settled:        {}", self.converted.settled)?;
        writeln!(f, "Outstanding:    {}", self.converted.outstanding)?;
        writeln!(f, "Overdue:        {}", self.converted.overdue)?;
        if self.missing_exchange_rate {
            let codes: Vec<String> = self
                .unconverted_currencies
                .iter()
                .map(|c| c.to_string())
                .collect();
            writeln!(f, "Missing exchange rate for: {}", codes.join(", "))?;
        }

        for (currency, b) in &self.by_currency {
            writeln!(f, "\n--- {} ---", currency)?;
            writeln!(f, "  Obligations: {}", b.obligation_count)?;
            writeln!(f, "  Total:       {}", b.total)?;
            writeln!(f, "  Settled:     {}", b.settled)?;
            writeln!(f, "  Outstanding: {}", b.outstanding)?;
            writeln!(f, "  Overdue:     {}", b.overdue)?;
            if b.credit_available != 0 {
                writeln!(f, "  Credits:     {}", b.credit_available)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::DocumentRef;
    use crate::fx::resolver::RateBook;
    use crate::settlement::state::{derive_status, outstanding_balance};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(doc: DocumentRef, amount: i64, currency: &str, due: Option<NaiveDate>, settled: i64) -> (Obligation, SettlementState) {
        let ob = Obligation::new(doc, "x", 100, amount, currency.into()).with_due_date(due);
        let state = SettlementState {
            obligation_id: ob.id(),
            settled,
            outstanding: (amount - settled).max(0),
            status: derive_status(&ob, settled, d(2026, 6, 1)),
        };
        (ob, state)
    }

    #[test]
    fn test_single_currency_rollup() {
        let doc = DocumentRef::receivable("SO-1");
        let items = vec![
            item(doc.clone(), 300_000, "USD", Some(d(2026, 1, 1)), 0),
            item(doc.clone(), 700_000, "USD", Some(d(2026, 12, 1)), 200_000),
        ];
        let summary = aggregate(
            items.iter().map(|(o, s)| (o, s)),
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        let usd = summary.currency(&"USD".into()).unwrap();
        assert_eq!(usd.total, 1_000_000);
        assert_eq!(usd.settled, 200_000);
        assert_eq!(usd.outstanding, 800_000);
        assert_eq!(usd.overdue, 300_000);
        assert_eq!(summary.converted.outstanding, 800_000);
        assert!(!summary.missing_exchange_rate);
    }

    #[test]
    fn test_missing_rate_excluded_and_flagged() {
        let doc = DocumentRef::payable("PO-1");
        let items = vec![
            item(doc.clone(), 10_000, "USD", None, 0),
            item(doc.clone(), 50_000, "EUR", None, 0),
        ];
        let summary = aggregate(
            items.iter().map(|(o, s)| (o, s)),
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        assert!(summary.missing_exchange_rate);
        assert_eq!(summary.unconverted_currencies, vec![CurrencyCode::new("EUR")]);
        assert_eq!(summary.converted.total, 10_000);
        assert_eq!(summary.currency(&"EUR".into()).unwrap().total, 50_000);
    }

    #[test]
    fn test_converted_with_rate() {
        let doc = DocumentRef::payable("PO-1");
        let items = vec![item(doc, 72_000, "CNY", None, 0)];
        let mut rates = RateBook::new();
        let id = rates.record("USD".into(), "CNY".into(), dec!(7.2), d(2026, 1, 1)).unwrap();
        rates.approve(id, "treasury").unwrap();
        let summary = aggregate(
            items.iter().map(|(o, s)| (o, s)),
            &rates,
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        assert_eq!(summary.converted.total, 10_000);
    }

    #[test]
    fn test_portfolio_split() {
        let items = vec![
            item(DocumentRef::receivable("SO-1"), 10_000, "USD", None, 10_000),
            item(DocumentRef::payable("PO-1"), 4_000, "USD", None, 1_000),
        ];
        let summary = portfolio(
            items.iter().map(|(o, s)| (o, s)),
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        assert_eq!(summary.received(), 10_000);
        assert_eq!(summary.paid(), 1_000);
        assert_eq!(summary.payables.converted.outstanding, 3_000);
        assert!(!summary.missing_exchange_rate());
    }

    #[test]
    fn test_credit_only_counts_as_available() {
        let doc = DocumentRef::payable("PO-1");
        let credit = Obligation::credit(doc, "Deduction", 2_000, "USD".into());
        let state = SettlementState {
            obligation_id: credit.id(),
            settled: 500,
            outstanding: 1_500,
            status: ObligationStatus::PartiallyPaid,
        };
        let summary = aggregate(
            vec![(&credit, &state)],
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        let usd = summary.currency(&"USD".into()).unwrap();
        assert_eq!(usd.total, 0);
        assert_eq!(usd.credit_available, 1_500);
    }

    #[test]
    fn test_waived_keeps_money_already_received() {
        let doc = DocumentRef::receivable("SO-1");
        let mut ob = Obligation::new(doc, "x", 100, 10_000, "USD".into()).with_due_date(Some(d(2026, 1, 1)));
        ob.waive("ops", chrono::Utc::now()).unwrap();
        let state = SettlementState {
            obligation_id: ob.id(),
            settled: 4_000,
            outstanding: outstanding_balance(&ob, 4_000),
            status: derive_status(&ob, 4_000, d(2026, 6, 1)),
        };
        let summary = portfolio(
            vec![(&ob, &state)],
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        assert_eq!(summary.received(), 4_000);
        let usd = summary.receivables.currency(&"USD".into()).unwrap();
        assert_eq!(usd.settled, 4_000);
        assert_eq!(usd.total, 0);
        assert_eq!(usd.outstanding, 0);
        assert_eq!(usd.overdue, 0);
        assert_eq!(usd.obligation_count, 0);
    }

    #[test]
    fn test_partly_paid_past_due_still_overdue() {
        let doc = DocumentRef::receivable("SO-1");
        let (ob, state) = item(doc, 10_000, "USD", Some(d(2026, 5, 1)), 1);
        assert_eq!(state.status, ObligationStatus::PartiallyPaid);
        let summary = aggregate(
            vec![(&ob, &state)],
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        let usd = summary.currency(&"USD".into()).unwrap();
        assert_eq!(usd.overdue, 9_999);
        assert_eq!(summary.converted.overdue, 9_999);
    }

    #[test]
    fn test_due_today_not_overdue() {
        let doc = DocumentRef::receivable("SO-1");
        let (ob, state) = item(doc, 10_000, "USD", Some(d(2026, 6, 1)), 0);
        let summary = aggregate(
            vec![(&ob, &state)],
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        assert_eq!(summary.currency(&"USD".into()).unwrap().overdue, 0);
    }

    #[test]
    fn test_huge_totals_saturate() {
        let doc = DocumentRef::payable("PO-1");
        let items = vec![
            item(doc.clone(), i64::MAX, "USD", None, 0),
            item(doc.clone(), i64::MAX, "USD", None, 0),
        ];
        let summary = aggregate(
            items.iter().map(|(o, s)| (o, s)),
            &RateBook::new(),
            &"USD".into(),
            d(2026, 6, 1),
            RoundingPolicy::HalfUp,
        );
        let usd = summary.currency(&"USD".into()).unwrap();
        assert_eq!(usd.total, i64::MAX);
        assert_eq!(usd.outstanding, i64::MAX);
        assert_eq!(summary.converted.total, i64::MAX);
    }
}
