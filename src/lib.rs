//! # settlement-engine
//!
//! Multi-currency payment-schedule and settlement engine.
//!
//! Splits a receivable or payable document into dated obligations according
//! to a payment term, records payments through an approval workflow, allocates
//! them (across currencies, optionally netting credits) and derives each
//! obligation's settlement status from approved allocations only.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: money, currencies, documents, terms, obligations, payments
//! - **fx**: Exchange-rate records and the as-of-date rate resolver
//! - **schedule**: Apportioning totals across term stages, due dates, obligation store
//! - **settlement**: Payment ledger, status derivation, the settlement book and engine
//! - **report**: Per-currency and portfolio aggregation with missing-rate flags
//! - **simulation**: Replayable and randomly generated scenarios
//!
//! All amounts are `i64` minor units at one fixed scale, see
//! [`core::money::MINOR_UNIT_SCALE`].

pub mod config;
pub mod core;
pub mod error;
pub mod fx;
pub mod report;
pub mod schedule;
pub mod settlement;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::allocation::Allocation;
    pub use crate::core::currency::{Currency, CurrencyCode};
    pub use crate::core::document::{AnchorDates, DocumentKind, DocumentRef, PayableDocument};
    pub use crate::core::money::RoundingPolicy;
    pub use crate::core::obligation::{Obligation, ObligationStatus};
    pub use crate::core::party::CounterpartyId;
    pub use crate::core::payment::{Payment, PaymentDirection, PaymentStatus};
    pub use crate::core::term::{CalculationBase, PaymentTerm, PaymentTermStage};
    pub use crate::error::{ErrorKind, SettlementError};
    pub use crate::fx::resolver::{RateBook, RateResolver};
    pub use crate::report::aggregation::{PortfolioSummary, SettlementSummary};
    pub use crate::settlement::book::{ObligationView, SettlementBook};
    pub use crate::settlement::engine::SettlementEngine;
    pub use crate::settlement::ledger::AllocationRequest;
}
