//! Cross-currency settlement example.
//!
//! A CNY purchase order paid in USD: the allocation needs an approved rate,
//! and the portfolio summary flags currencies it cannot convert.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use settlement_engine::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn main() {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  settlement-engine: Cross-Currency Example    ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let engine = SettlementEngine::new(&EngineConfig::default()).expect("default config is valid");

    let po = DocumentRef::payable("PO-2001");
    engine
        .register_document(PayableDocument::new(po.clone(), 720_000, "CNY".into()))
        .expect("document registers");
    let term = PaymentTerm::new(
        "Net 30",
        vec![PaymentTermStage::new(100, CalculationBase::IssueDate, 30)],
    )
    .expect("percentages sum to 100");
    let ob = engine.generate_schedule(&po, &term).expect("schedule generates")[0];

    let payment = Payment::new(PaymentDirection::Outbound, "SUP-0007".into(), 100_000, "USD".into(), date(2026, 4, 2))
        .expect("positive amount");
    let pid = engine.record_payment(payment).expect("known currency");

    // --- Without a rate ---
    println!("━━━ No USD→CNY rate yet ━━━\n");
    match engine.allocate(AllocationRequest::new(pid, ob, 100_000)) {
        Ok(_) => println!("  unexpected: allocation accepted"),
        Err(e) => println!("  refused ({:?}): {}", e.kind(), e),
    }
    let summary = engine.portfolio_summary(date(2026, 4, 2));
    println!("  missing exchange rate: {:?}\n", summary.payables.unconverted_currencies);

    // --- With an approved rate ---
    println!("━━━ Treasury approves 1 USD = 7.2 CNY ━━━\n");
    let rate = engine
        .record_rate("USD".into(), "CNY".into(), dec!(7.2), date(2026, 4, 1))
        .expect("known currencies");
    engine.approve_rate(rate, "treasury").expect("pending rate");

    let allocation = engine
        .allocate(AllocationRequest::new(pid, ob, 100_000))
        .expect("rate now available");
    println!(
        "  allocated {} USD → {} CNY at {}",
        allocation.allocated_amount,
        allocation.amount_in_document_currency,
        allocation.exchange_rate.unwrap_or_default()
    );
    engine.approve_payment(pid, "controller").expect("pending payment");

    let summary = engine.portfolio_summary(date(2026, 4, 2));
    println!("\n{}", summary.payables);
    println!("Paid (USD minor units): {}", summary.paid());
}
