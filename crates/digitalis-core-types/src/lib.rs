//! Core types shared across Digitalis facilities
//!
//! This crate provides foundational types used by the query engine,
//! the schema subsystem and the logging facility:
//!
//! - **Correlation types**: QueryId, RunId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{QueryId, RunId};
