//! Read-only rollups consumed by dashboards and document generators.

pub mod aggregation;
