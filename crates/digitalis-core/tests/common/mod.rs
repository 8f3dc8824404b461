use std::cell::RefCell;
use std::rc::Rc;

use digitalis_core::query::{
    ClauseMutator, ProfileMode, ProfileRules, Query, QueryProfile, QueryVars, SqlClauses,
};
use serde_json::{json, Map, Value};

/// Build a query-args map from a JSON object literal
#[allow(dead_code)]
pub fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Shared log of profile names in the order they ran
#[allow(dead_code)]
pub type CallLog = Rc<RefCell<Vec<String>>>;

#[allow(dead_code)]
pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Configurable test profile that records each application and appends its
/// name to the `applied` argument.
#[allow(dead_code)]
pub struct TestProfile {
    pub name: String,
    pub priority: i32,
    pub mode: ProfileMode,
    pub rules: ProfileRules,
    pub where_fragment: Option<String>,
    pub log: CallLog,
}

#[allow(dead_code)]
impl TestProfile {
    pub fn new(name: &str, priority: i32, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            priority,
            mode: ProfileMode::Ambient,
            rules: ProfileRules::default(),
            where_fragment: None,
            log: log.clone(),
        }
    }

    pub fn mode(mut self, mode: ProfileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn rules(mut self, rules: ProfileRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_where(mut self, fragment: &str) -> Self {
        self.where_fragment = Some(fragment.to_string());
        self
    }
}

impl QueryProfile for TestProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn mode(&self) -> ProfileMode {
        self.mode
    }

    fn rules(&self) -> ProfileRules {
        self.rules.clone()
    }

    fn apply(&self, vars: &mut QueryVars, _query: &Query, mods: &mut Vec<ClauseMutator>) {
        self.log.borrow_mut().push(self.name.clone());
        vars.merge_var("applied", json!([self.name]), false);

        if let Some(fragment) = self.where_fragment.clone() {
            mods.push(Box::new(move |clauses: &mut SqlClauses| {
                clauses.where_clause.push_str(&fragment);
            }));
        }
    }
}
