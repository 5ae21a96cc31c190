//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - view exports to CSV (`export`)
//! - saved view JSON read/write (`snapshot`)

pub mod export;
pub mod ingest;
pub mod snapshot;

pub use export::*;
pub use ingest::*;
pub use snapshot::*;
