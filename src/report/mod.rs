//! Terminal reports: dataset summaries, filter results, and dashboard views.
//!
//! Everything here returns a `String` so output is easy to test and the
//! engines never print.

pub mod format;

pub use format::*;
