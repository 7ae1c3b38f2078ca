//! repodeck core - domain logic with no I/O of its own
//!
//! This crate holds the repository sync pipeline, the command resolution and
//! execution engine, the event bus and the caches fed by it. Network, disk and
//! process access go through the traits in [`ports`]; adapters live in the
//! `repodeck` application crate.

pub mod domain;
pub mod ports;
pub mod app;
pub mod bus;
pub mod cache;
pub mod cancel;
pub mod commander;
pub mod error;
pub mod repofs;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
