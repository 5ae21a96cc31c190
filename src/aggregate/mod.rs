//! Aggregation engine.
//!
//! Every operation takes any ordered sequence of records (the whole dataset
//! or a filtered view), is pure and total, and reports how many records it
//! skipped for an empty group key or a negative value.
//!
//! Organization:
//! - `group`: sum/count by group, 2-D counts, top-N
//! - `gender`: per-borrower gender distribution
//! - `distribution`: box-plot summaries and histograms
//! - `view`: the dashboard view catalog built on the above

pub mod distribution;
pub mod gender;
pub mod group;
pub mod view;

pub use distribution::*;
pub use gender::*;
pub use group::*;
pub use view::*;
