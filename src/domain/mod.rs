//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - loan records and the immutable `Dataset` they are loaded into
//! - grouping/value keys and the dashboard view catalog (`GroupKey`, `ValueKey`, `ViewKind`)
//! - user filter criteria (`FilterCriteria`, `IntervalSelection`, `AmountRange`)
//! - the run configuration derived from CLI flags (`RunConfig`)

pub mod criteria;
pub mod types;

pub use criteria::*;
pub use types::*;
