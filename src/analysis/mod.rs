//! Analysis modules.
//!
//! Aggregation of measurement runs into the summary table.

pub mod aggregator;

pub use aggregator::*;
