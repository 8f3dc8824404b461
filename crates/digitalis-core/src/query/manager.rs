//! Profile registry and per-query application
//!
//! The manager owns every registered profile and applies them, in priority
//! order, exactly once per query instance. Profiles may queue clause
//! mutators; those live in `mods_by_id` only from the moment a query is
//! applied until its results are handed back.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::{Map, Value};

use digitalis_core_types::QueryId;

use crate::errors::ExError;
use crate::{log_op_end, log_op_error, log_op_start};

use super::context::{ExecutionRole, ExecutionStamp, RequestEnv, SelectionMode, StampMerge};
use super::profile::QueryProfile;
use super::request::{Query, TaxonomyRegistry};
use super::vars::QueryVars;

/// Raw SQL fragments assembled for one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlClauses {
    pub where_clause: String,
    pub groupby: String,
    pub join: String,
    pub orderby: String,
    pub distinct: String,
    pub fields: String,
    pub limits: String,
}

/// Rewrites the clause set at SQL-assembly time
pub type ClauseMutator = Box<dyn Fn(&mut SqlClauses)>;

/// What one `apply` produced
pub struct AppliedVars {
    pub vars: QueryVars,
    pub mods: Vec<ClauseMutator>,
}

impl std::fmt::Debug for AppliedVars {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppliedVars")
            .field("vars", &self.vars)
            .field("mods", &self.mods.len())
            .finish()
    }
}

/// Runs the query once arguments and clauses are final
pub trait QueryBackend {
    type Row;

    /// # Errors
    ///
    /// Whatever the backing store reports.
    fn fetch(
        &mut self,
        vars: &Map<String, Value>,
        clauses: &SqlClauses,
    ) -> Result<Vec<Self::Row>, ExError>;
}

#[derive(Default)]
pub struct QueryManager {
    profiles: Vec<Box<dyn QueryProfile>>,
    order: Option<Vec<usize>>,
    taxonomies: TaxonomyRegistry,
    env: RequestEnv,
    mods_by_id: HashMap<QueryId, Vec<ClauseMutator>>,
}

impl std::fmt::Debug for QueryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryManager")
            .field("profiles", &self.profiles)
            .field("env", &self.env)
            .field("pending_mutators", &self.mods_by_id.len())
            .finish()
    }
}

impl QueryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: RequestEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_taxonomies(mut self, taxonomies: TaxonomyRegistry) -> Self {
        self.taxonomies = taxonomies;
        self
    }

    pub fn set_env(&mut self, env: RequestEnv) {
        self.env = env;
    }

    pub fn env(&self) -> &RequestEnv {
        &self.env
    }

    pub fn taxonomies(&self) -> &TaxonomyRegistry {
        &self.taxonomies
    }

    pub fn taxonomies_mut(&mut self) -> &mut TaxonomyRegistry {
        &mut self.taxonomies
    }

    pub fn register(&mut self, profile: impl QueryProfile + 'static) -> &mut Self {
        self.register_boxed(Box::new(profile))
    }

    pub fn register_boxed(&mut self, profile: Box<dyn QueryProfile>) -> &mut Self {
        self.profiles.push(profile);
        self.order = None;
        self
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Indices into the profile list, highest priority first. Ties keep
    /// registration order. Memoized until the next registration.
    pub fn sort(&mut self) -> &[usize] {
        let profiles = &self.profiles;
        self.order.get_or_insert_with(|| {
            let mut order: Vec<usize> = (0..profiles.len()).collect();
            order.sort_by_key(|&i| std::cmp::Reverse(profiles[i].priority()));
            order
        })
        .as_slice()
    }

    /// Profile names in application order.
    pub fn profile_names(&mut self) -> Vec<String> {
        let order = self.sort().to_vec();
        order
            .into_iter()
            .map(|i| self.profiles[i].name().to_string())
            .collect()
    }

    /// Assign an id (reusing one already on the query) and a fresh stamp.
    ///
    /// Selection mode is explicit when the caller curated the profile list;
    /// `multiple` follows [`Query::is_multiple`].
    pub fn stamp(&self, query: &mut Query, role: ExecutionRole) -> QueryId {
        let id = query.id.clone().unwrap_or_default();
        query.id = Some(id.clone());

        let mut stamp = ExecutionStamp::new(id.clone(), role, self.env.context());
        stamp.multiple = query.is_multiple();
        if query.selection.is_curated() {
            stamp.selection_mode = SelectionMode::Explicit;
        }
        query.stamp = Some(stamp);
        id
    }

    /// Apply every matching profile to `query`, once.
    ///
    /// A second call on the same query returns the current arguments and
    /// no mutators.
    pub fn apply(&mut self, query: &mut Query) -> AppliedVars {
        if query.is_applied() {
            return AppliedVars {
                vars: QueryVars::from_map(query.vars.clone()),
                mods: Vec::new(),
            };
        }

        if query.stamp.is_none() {
            self.stamp(query, ExecutionRole::Programmatic);
        }
        let query_id = query
            .stamp
            .as_ref()
            .map(|s| s.id.to_string())
            .unwrap_or_default();
        if let Some(stamp) = query.stamp.as_mut() {
            stamp.applied = true;
        }

        let start = Instant::now();
        log_op_start!("apply_profiles", query_id = %query_id);

        let order = self.sort().to_vec();
        let mut vars = QueryVars::from_map(query.vars.clone());
        let mut mods: Vec<ClauseMutator> = Vec::new();
        let mut applied = 0usize;

        for index in order {
            let profile = &self.profiles[index];
            if profile.should_apply(query, &self.taxonomies) {
                tracing::debug!(query_id = %query_id, profile = profile.name(), "applying profile");
                profile.apply(&mut vars, query, &mut mods);
                applied += 1;
            }
        }

        query.vars = vars.vars().clone();

        log_op_end!(
            "apply_profiles",
            duration_ms = start.elapsed().as_millis() as u64,
            query_id = %query_id,
            profile_count = applied,
            mutator_count = mods.len()
        );

        AppliedVars { vars, mods }
    }

    /// Hook: the query is about to run. Stamps and applies, then parks
    /// mutators until SQL assembly.
    pub fn before_query(&mut self, query: &mut Query) {
        if query.is_applied() {
            return;
        }

        if query.stamp.is_none() {
            let role = match (query.is_main, self.env.admin) {
                (true, true) => ExecutionRole::AdminMain,
                (true, false) => ExecutionRole::FrontMain,
                (false, _) => ExecutionRole::Programmatic,
            };
            self.stamp(query, role);
        }

        let applied = self.apply(query);
        self.park(query, applied.mods);
    }

    /// Hook: fold parked mutators over the clause set.
    pub fn assemble_clauses(&self, mut clauses: SqlClauses, query: &Query) -> SqlClauses {
        let mods = query.id.as_ref().and_then(|id| self.mods_by_id.get(id));
        if let Some(mods) = mods {
            for mutate in mods {
                mutate(&mut clauses);
            }
        }
        clauses
    }

    /// Hook: results are back; drop the query's mutators.
    pub fn after_results<T>(&mut self, results: Vec<T>, query: &Query) -> Vec<T> {
        if let Some(id) = &query.id {
            self.mods_by_id.remove(id);
        }
        results
    }

    /// Number of queries with parked mutators.
    pub fn pending_mutators(&self) -> usize {
        self.mods_by_id.len()
    }

    /// Programmatic path: stamp, apply, assemble clauses, run, clean up.
    ///
    /// Mutators are evicted whether or not the backend succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the backend's error.
    pub fn execute<B: QueryBackend>(
        &mut self,
        query: &mut Query,
        stamp_merge: StampMerge,
        backend: &mut B,
    ) -> Result<Vec<B::Row>, ExError> {
        if !query.is_applied() {
            self.stamp(query, ExecutionRole::Programmatic);
            if let Some(stamp) = query.stamp.as_mut() {
                stamp.merge(&stamp_merge);
            }
        }

        let query_id = query.id.as_ref().map(QueryId::to_string).unwrap_or_default();
        let start = Instant::now();
        log_op_start!("execute_query", query_id = %query_id);

        let applied = self.apply(query);
        self.park(query, applied.mods);

        let clauses = self.assemble_clauses(SqlClauses::default(), query);
        let fetched = backend.fetch(&query.vars, &clauses);

        match fetched {
            Ok(rows) => {
                let rows = self.after_results(rows, query);
                log_op_end!(
                    "execute_query",
                    duration_ms = start.elapsed().as_millis() as u64,
                    query_id = %query_id,
                    row_count = rows.len()
                );
                Ok(rows)
            }
            Err(err) => {
                if let Some(id) = &query.id {
                    self.mods_by_id.remove(id);
                }
                log_op_error!(
                    "execute_query",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    query_id = %query_id
                );
                Err(err)
            }
        }
    }

    fn park(&mut self, query: &Query, mods: Vec<ClauseMutator>) {
        if mods.is_empty() {
            return;
        }
        if let Some(id) = &query.id {
            self.mods_by_id.entry(id.clone()).or_default().extend(mods);
        }
    }
}
