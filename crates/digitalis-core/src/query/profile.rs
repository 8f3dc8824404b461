//! Query profiles: declarative rules that contribute argument mutations
//!
//! A profile passes through four gates before it may mutate a query:
//! structural match, explicit suppression, mode check, and a free-form
//! condition. All four must pass. A profile that fails any gate contributes
//! nothing; a mismatch is never an error.

use serde::{Deserialize, Serialize};

use super::context::{ExecutionContext, ExecutionRole, SelectionMode};
use super::manager::ClauseMutator;
use super::request::{Query, TaxonomyRegistry};
use super::vars::QueryVars;

pub const DEFAULT_PRIORITY: i32 = 10;

/// How a profile behaves relative to the caller's selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    /// Only when explicitly included by name
    Selectable,
    /// On unless the caller curated the profile list
    #[default]
    Ambient,
    /// Always on (still subject to exclusion)
    Baseline,
}

/// Structural applicability rules. An empty list leaves that dimension
/// unconstrained; a configured dimension must contain a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileRules {
    pub post_types: Vec<String>,
    pub statuses: Vec<String>,
    pub roles: Vec<ExecutionRole>,
    pub contexts: Vec<ExecutionContext>,
}

impl ProfileRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = ExecutionRole>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn contexts(mut self, contexts: impl IntoIterator<Item = ExecutionContext>) -> Self {
        self.contexts = contexts.into_iter().collect();
        self
    }
}

/// Contributes argument mutations (and optionally SQL clause mutators) to
/// queries it applies to.
///
/// Implementors supply `name` and `apply`; the gate methods have working
/// defaults and are rarely overridden.
pub trait QueryProfile {
    /// Stable identity used by inclusion and exclusion lists.
    fn name(&self) -> &str;

    /// Higher runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn mode(&self) -> ProfileMode {
        ProfileMode::default()
    }

    fn rules(&self) -> ProfileRules {
        ProfileRules::default()
    }

    /// Final free-form gate.
    fn condition(&self, _query: &Query) -> bool {
        true
    }

    /// Mutate `vars` and/or queue clause mutators for the SQL phase.
    fn apply(&self, vars: &mut QueryVars, query: &Query, mods: &mut Vec<ClauseMutator>);

    fn matches_profile(&self, query: &Query, taxonomies: &TaxonomyRegistry) -> bool {
        let rules = self.rules();

        if !rules.post_types.is_empty() {
            // None: the query targets every type
            if let Some(types) = query.post_types(taxonomies) {
                if !types.iter().any(|t| rules.post_types.contains(t)) {
                    return false;
                }
            }
        }

        if !rules.statuses.is_empty() {
            if let Some(statuses) = query.post_statuses() {
                if !statuses.iter().any(|s| rules.statuses.contains(s)) {
                    return false;
                }
            }
        }

        let stamp = query.stamp.as_ref();

        if !rules.roles.is_empty() && !stamp.is_some_and(|s| rules.roles.contains(&s.role)) {
            return false;
        }

        if !rules.contexts.is_empty() && !stamp.is_some_and(|s| rules.contexts.contains(&s.context))
        {
            return false;
        }

        true
    }

    fn is_suppressed(&self, query: &Query) -> bool {
        query.selection.allow && query.selection.excludes(self.name())
    }

    fn check_mode(&self, query: &Query) -> bool {
        match self.mode() {
            ProfileMode::Baseline => true,
            ProfileMode::Ambient => query
                .stamp
                .as_ref()
                .map_or(true, |s| s.selection_mode == SelectionMode::Implicit),
            ProfileMode::Selectable => {
                query.selection.allow && query.selection.includes(self.name())
            }
        }
    }

    fn should_apply(&self, query: &Query, taxonomies: &TaxonomyRegistry) -> bool {
        self.matches_profile(query, taxonomies)
            && !self.is_suppressed(query)
            && self.check_mode(query)
            && self.condition(query)
    }
}

impl std::fmt::Debug for dyn QueryProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryProfile")
            .field("name", &self.name())
            .field("priority", &self.priority())
            .field("mode", &self.mode())
            .finish()
    }
}
