//! Analysis modules.
//!
//! This module turns collected bills into the series and tallies shown in
//! the report.

pub mod aggregator;

pub use aggregator::*;
