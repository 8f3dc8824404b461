//! The query instance profiles are evaluated against

use std::collections::HashMap;

use serde_json::{Map, Value};

use digitalis_core_types::QueryId;

use super::context::ExecutionStamp;
use super::vars::{is_empty_value, ANY, POST_STATUS, POST_TYPE};

const DEFAULT_POST_TYPE: &str = "post";
const DEFAULT_POST_STATUS: &str = "publish";

/// Arguments that select exactly one post
const SINGULAR_SELECTORS: [&str; 6] = [
    "p",
    "page_id",
    "name",
    "pagename",
    "attachment_id",
    "attachment",
];

/// Caller-curated profile inclusion and exclusion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSelection {
    /// Selection is only honoured when this is set
    pub allow: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ProfileSelection {
    pub fn allowed() -> Self {
        Self {
            allow: true,
            ..Self::default()
        }
    }

    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.include.push(name.into());
        self
    }

    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }

    pub fn is_curated(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }

    pub fn includes(&self, name: &str) -> bool {
        self.include.iter().any(|n| n == name)
    }

    pub fn excludes(&self, name: &str) -> bool {
        self.exclude.iter().any(|n| n == name)
    }
}

/// One query instance: arguments plus the metadata the manager tracks
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub id: Option<QueryId>,
    pub vars: Map<String, Value>,
    pub stamp: Option<ExecutionStamp>,
    pub selection: ProfileSelection,
    /// Set when the query renders a taxonomy archive
    pub taxonomy_archive: Option<String>,
    /// The request's main query
    pub is_main: bool,
    /// Forces the stamp's `multiple` flag; derived from the arguments when unset
    pub multiple: Option<bool>,
}

impl Query {
    pub fn new(vars: Map<String, Value>) -> Self {
        Self {
            vars,
            ..Self::default()
        }
    }

    pub fn main(vars: Map<String, Value>) -> Self {
        Self {
            vars,
            is_main: true,
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, selection: ProfileSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_taxonomy_archive(mut self, taxonomy: impl Into<String>) -> Self {
        self.taxonomy_archive = Some(taxonomy.into());
        self
    }

    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = Some(multiple);
        self
    }

    /// False when the query selects a single post by id or slug.
    pub fn is_multiple(&self) -> bool {
        self.multiple.unwrap_or_else(|| {
            !SINGULAR_SELECTORS
                .iter()
                .any(|key| self.vars.get(*key).is_some_and(selects_post))
        })
    }

    pub fn is_applied(&self) -> bool {
        self.stamp.as_ref().is_some_and(|s| s.applied)
    }

    /// Post types the query targets; `None` means every type (`any`).
    pub fn post_types(&self, taxonomies: &TaxonomyRegistry) -> Option<Vec<String>> {
        if let Some(taxonomy) = &self.taxonomy_archive {
            return Some(taxonomies.object_types(taxonomy).to_vec());
        }
        string_set(self.vars.get(POST_TYPE), DEFAULT_POST_TYPE)
    }

    /// Statuses the query targets; `None` means every status (`any`).
    pub fn post_statuses(&self) -> Option<Vec<String>> {
        string_set(self.vars.get(POST_STATUS), DEFAULT_POST_STATUS)
    }
}

/// `0` is the unset id.
fn selects_post(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() != Some(0.0),
        other => !is_empty_value(other),
    }
}

fn string_set(value: Option<&Value>, default: &str) -> Option<Vec<String>> {
    match value {
        None | Some(Value::Null) => Some(vec![default.to_string()]),
        Some(Value::String(s)) if s == ANY => None,
        Some(Value::String(s)) => Some(vec![s.clone()]),
        Some(Value::Array(items)) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if names.iter().any(|n| n == ANY) {
                None
            } else {
                Some(names)
            }
        }
        Some(other) => Some(vec![other.to_string()]),
    }
}

/// Taxonomy name to the post types it is registered for
#[derive(Debug, Clone, Default)]
pub struct TaxonomyRegistry {
    object_types: HashMap<String, Vec<String>>,
}

impl TaxonomyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I, S>(&mut self, taxonomy: impl Into<String>, object_types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_types.insert(
            taxonomy.into(),
            object_types.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn object_types(&self, taxonomy: &str) -> &[String] {
        self.object_types
            .get(taxonomy)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
