//! `kiva-board` library crate.
//!
//! The binary (`kiva`) is a thin wrapper around this library so that:
//!
//! - the filter and aggregation engines are testable without spawning processes
//! - a different front-end can reuse the same pipeline
//! - code stays easy to navigate as the project grows

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod filter;
pub mod io;
pub mod report;
