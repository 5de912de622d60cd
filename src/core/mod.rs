//! Foundational types: money, currencies, documents, terms, obligations,
//! payments and allocations.

pub mod allocation;
pub mod currency;
pub mod document;
pub mod money;
pub mod obligation;
pub mod party;
pub mod payment;
pub mod term;
