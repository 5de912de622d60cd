//! Scenario replay and random scenario generation.

pub mod scenario;
