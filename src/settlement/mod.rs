//! Payment ledger, settlement-state derivation and the book that ties them
//! to the obligation store.

pub mod book;
pub mod engine;
pub mod ledger;
pub mod state;
