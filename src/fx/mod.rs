//! Exchange-rate records and the rate resolver.

pub mod rate;
pub mod resolver;
