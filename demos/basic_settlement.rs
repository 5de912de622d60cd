//! Basic payment-schedule example.
//!
//! Splits a sales order into a deposit and a balance, then settles both with
//! customer payments that go through approval.

use chrono::NaiveDate;
use settlement_engine::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn main() {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  settlement-engine: Basic Settlement Example  ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let mut book = SettlementBook::new(&EngineConfig::default()).expect("default config is valid");

    // --- Step 1: Schedule ---
    println!("━━━ Step 1: 30% deposit, 70% before shipment ━━━\n");

    let order = DocumentRef::receivable("SO-1001");
    let anchors = AnchorDates {
        order_date: Some(date(2026, 1, 10)),
        shipment_etd: Some(date(2026, 3, 1)),
        ..Default::default()
    };
    book.register_document(PayableDocument::new(order.clone(), 1_000_000, "USD".into()).with_anchors(anchors))
        .expect("document registers");

    let term = PaymentTerm::new(
        "30/70",
        vec![
            PaymentTermStage::new(30, CalculationBase::OrderDate, 0).with_label("Deposit"),
            PaymentTermStage::new(70, CalculationBase::BeforeShipment, -5)
                .with_label("Balance")
                .blocking(),
        ],
    )
    .expect("percentages sum to 100");
    let ids = book.generate_schedule(&order, &term).expect("schedule generates");

    let as_of = date(2026, 2, 1);
    for view in book.obligations(&order, as_of).expect("document exists") {
        let ob = &view.obligation;
        println!(
            "  {:<8} {:>8}  due {}  {}",
            ob.label(),
            ob.amount(),
            ob.due_date().map(|d| d.to_string()).unwrap_or_default(),
            view.status()
        );
    }
    println!();

    // --- Step 2: Deposit arrives and is approved ---
    println!("━━━ Step 2: Deposit payment ━━━\n");

    let deposit = Payment::new(PaymentDirection::Inbound, "CUST-0042".into(), 300_000, "USD".into(), date(2026, 1, 12))
        .expect("positive amount");
    let deposit = book.record_payment(deposit).expect("known currency");
    book.allocate(AllocationRequest::new(deposit, ids[0], 300_000))
        .expect("fits the deposit");
    println!("  before approval: {}", book.obligation(ids[0], as_of).expect("exists").status());
    book.approve_payment(deposit, "controller").expect("pending payment");
    println!("  after approval:  {}\n", book.obligation(ids[0], as_of).expect("exists").status());

    // --- Step 3: Over-allocation is refused ---
    println!("━━━ Step 3: Balance payment ━━━\n");

    let balance = Payment::new(PaymentDirection::Inbound, "CUST-0042".into(), 800_000, "USD".into(), date(2026, 2, 20))
        .expect("positive amount");
    let balance = book.record_payment(balance).expect("known currency");
    match book.allocate(AllocationRequest::new(balance, ids[1], 800_000)) {
        Ok(_) => println!("  unexpected: over-allocation accepted"),
        Err(e) => println!("  refused: {}", e),
    }
    book.allocate(AllocationRequest::new(balance, ids[1], 700_000))
        .expect("exact balance fits");
    book.approve_payment(balance, "controller").expect("pending payment");
    println!("  unallocated on payment: {}\n", book.unallocated(balance).expect("exists"));

    // --- Step 4: Summary ---
    let summary = book.document_summary(&order, date(2026, 3, 15)).expect("document exists");
    println!("{}", summary);
}
