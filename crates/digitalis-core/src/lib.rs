//! Digitalis Core - query-mutation engine and shared facilities
//!
//! This crate provides:
//! - The query-argument merge engine (`QueryVars`) with condition-tree
//!   lookup and upsert
//! - Query profiles and the `QueryManager` that applies them once per query
//! - The canonical error facility (`ExError`, `ExErrorKind`, `DigitalisError`)
//! - The structured logging facility and its macros

pub mod errors;
pub mod logging_facility;
pub mod query;

/// Re-exported so logging macros resolve field names from any crate.
pub use digitalis_core_types as core_types;

pub use errors::{DigitalisError, ExError, ExErrorKind, Result};
pub use query::{Query, QueryManager, QueryProfile, QueryVars};
