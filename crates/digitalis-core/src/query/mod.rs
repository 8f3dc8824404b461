//! Query-mutation engine
//!
//! - [`vars`]: argument map with merge, overwrite and condition-tree upsert
//! - [`compare`]: operators used to locate condition blocks
//! - [`context`]: execution role, environment context and the per-query stamp
//! - [`request`]: the query instance and taxonomy lookup
//! - [`profile`]: the `QueryProfile` trait and its applicability gates
//! - [`manager`]: ordered, idempotent application plus clause-mutator lifecycle

pub mod compare;
pub mod context;
pub mod manager;
pub mod profile;
pub mod request;
pub mod vars;

pub use compare::CompareOp;
pub use context::{
    ExecutionContext, ExecutionRole, ExecutionStamp, RequestEnv, SelectionMode, StampMerge,
};
pub use manager::{AppliedVars, ClauseMutator, QueryBackend, QueryManager, SqlClauses};
pub use profile::{ProfileMode, ProfileRules, QueryProfile};
pub use request::{ProfileSelection, Query, TaxonomyRegistry};
pub use vars::{find_path, BlockCursor, BlockPath, PathSegment, QueryVars, UpsertOutcome};
