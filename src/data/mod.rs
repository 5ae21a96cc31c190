//! Data acquisition: where partitions come from, plus a synthetic generator.

pub mod sample;
pub mod source;

pub use sample::{SampleSpec, generate_records, write_partitions};
pub use source::{DEFAULT_PARTS, ENV_DATA_DIR, ENV_PARTS, read_source, resolve_sources};
