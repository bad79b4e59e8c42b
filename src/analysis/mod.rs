//! Analysis modules.
//!
//! Aggregation of experiment outputs into comparison tables.

pub mod aggregator;

pub use aggregator::*;
