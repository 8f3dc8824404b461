//! Execution context stamped onto every query before profiles see it

use serde::{Deserialize, Serialize};

use digitalis_core_types::QueryId;

/// Who is running the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionRole {
    /// The main query of an admin screen
    AdminMain,
    /// The main query of a front-end request
    FrontMain,
    /// Any query built in code
    Programmatic,
}

impl ExecutionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionRole::AdminMain => "admin_main",
            ExecutionRole::FrontMain => "front_main",
            ExecutionRole::Programmatic => "programmatic",
        }
    }
}

/// Environment the request runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    Cli,
    Cron,
    Rest,
    Ajax,
    Admin,
    Front,
}

impl ExecutionContext {
    /// First match wins: cli, cron, rest, ajax, then admin or front.
    pub fn detect(env: &RequestEnv) -> Self {
        if env.cli {
            ExecutionContext::Cli
        } else if env.cron {
            ExecutionContext::Cron
        } else if env.rest {
            ExecutionContext::Rest
        } else if env.ajax {
            ExecutionContext::Ajax
        } else if env.admin {
            ExecutionContext::Admin
        } else {
            ExecutionContext::Front
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionContext::Cli => "cli",
            ExecutionContext::Cron => "cron",
            ExecutionContext::Rest => "rest",
            ExecutionContext::Ajax => "ajax",
            ExecutionContext::Admin => "admin",
            ExecutionContext::Front => "front",
        }
    }
}

/// Whether the caller curated the profile list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Implicit,
    Explicit,
}

/// Environment flags available when a query is stamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestEnv {
    pub cli: bool,
    pub cron: bool,
    pub rest: bool,
    pub ajax: bool,
    pub admin: bool,
}

impl RequestEnv {
    pub fn front() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self {
            admin: true,
            ..Self::default()
        }
    }

    /// Read `DIGITALIS_CLI`, `DIGITALIS_CRON`, `DIGITALIS_REST`,
    /// `DIGITALIS_AJAX` and `DIGITALIS_ADMIN` (`1`/`true`/`yes`).
    pub fn from_env() -> Self {
        fn flag(name: &str) -> bool {
            std::env::var(name)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        }
        Self {
            cli: flag("DIGITALIS_CLI"),
            cron: flag("DIGITALIS_CRON"),
            rest: flag("DIGITALIS_REST"),
            ajax: flag("DIGITALIS_AJAX"),
            admin: flag("DIGITALIS_ADMIN"),
        }
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::detect(self)
    }
}

/// Metadata attached to one query instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStamp {
    pub id: QueryId,
    pub role: ExecutionRole,
    pub context: ExecutionContext,
    pub multiple: bool,
    pub selection_mode: SelectionMode,
    /// Set once profiles ran; guards against re-entrant application
    pub applied: bool,
}

impl ExecutionStamp {
    pub fn new(id: QueryId, role: ExecutionRole, context: ExecutionContext) -> Self {
        Self {
            id,
            role,
            context,
            multiple: true,
            selection_mode: SelectionMode::Implicit,
            applied: false,
        }
    }

    /// Apply caller overrides on top of a freshly built stamp.
    pub fn merge(&mut self, overrides: &StampMerge) {
        if let Some(role) = overrides.role {
            self.role = role;
        }
        if let Some(context) = overrides.context {
            self.context = context;
        }
        if let Some(multiple) = overrides.multiple {
            self.multiple = multiple;
        }
        if let Some(mode) = overrides.selection_mode {
            self.selection_mode = mode;
        }
    }
}

/// Optional stamp fields a programmatic caller may force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StampMerge {
    pub role: Option<ExecutionRole>,
    pub context: Option<ExecutionContext>,
    pub multiple: Option<bool>,
    pub selection_mode: Option<SelectionMode>,
}
