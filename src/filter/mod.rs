//! Filter engine.
//!
//! Organization:
//! - `engine`: `apply(dataset, criteria)` producing a borrowed `FilteredView`
//!   or a `BlockReason` the presentation layer turns into a prompt

pub mod engine;

pub use engine::*;
