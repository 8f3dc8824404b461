use thiserror::Error;

/// Result type alias using DigitalisError
pub type Result<T> = std::result::Result<T, DigitalisError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// raised by the query engine and the schema subsystem. Each kind maps to a
/// stable error code that can be used for programmatic error handling,
/// testing, and log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration (fail fast, before any destructive action)
    InvalidInput,
    InvalidConfig,
    NotRegistered,
    AlreadyExists,
    InvalidMigrationVersion,
    DuplicateMigrationVersion,

    // Execution
    SqlFailed,
    MigrationFailed,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::NotRegistered => "ERR_NOT_REGISTERED",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::InvalidMigrationVersion => "ERR_INVALID_MIGRATION_VERSION",
            ExErrorKind::DuplicateMigrationVersion => "ERR_DUPLICATE_MIGRATION_VERSION",
            ExErrorKind::SqlFailed => "ERR_SQL_FAILED",
            ExErrorKind::MigrationFailed => "ERR_MIGRATION_FAILED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
        }
    }

    /// True for errors raised while validating registrations, before any
    /// statement touched the database.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidInput
                | ExErrorKind::InvalidConfig
                | ExErrorKind::NotRegistered
                | ExErrorKind::AlreadyExists
                | ExErrorKind::InvalidMigrationVersion
                | ExErrorKind::DuplicateMigrationVersion
        )
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for
/// debugging (module slug, offending SQL statement, source chain).
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    module: Option<String>,
    entity_id: Option<String>,
    version: Option<i64>,
    statement: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            module: None,
            entity_id: None,
            version: None,
            statement: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add schema module context
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Add entity ID context (table slug, option key, profile name)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add migration version context
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    /// Add the SQL statement that failed
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the module context, if any
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the migration version context, if any
    pub fn version(&self) -> Option<i64> {
        self.version
    }

    /// Get the failing SQL statement, if any
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Walk this error and its sources, outermost first.
    ///
    /// Each frame is rendered with `Display`; at most `limit` frames are
    /// returned.
    pub fn trace(&self, limit: usize) -> Vec<String> {
        let mut frames = Vec::new();
        let mut current = Some(self);
        while let Some(err) = current {
            if frames.len() >= limit {
                break;
            }
            frames.push(err.to_string());
            current = err.source_error();
        }
        frames
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(module) = &self.module {
            write!(f, " (module: {})", module)?;
        }
        if let Some(version) = self.version {
            write!(f, " (version: {})", version)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(statement) = &self.statement {
            write!(f, " [statement: {}]", statement)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for Digitalis query and schema operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DigitalisError {
    // ===== Configuration Errors =====
    /// A table slug was looked up but never registered
    #[error("Table not registered: {slug}")]
    TableNotRegistered { slug: String },

    /// Two tables were registered under the same slug
    #[error("Table already registered: {slug}")]
    DuplicateTable { slug: String },

    /// A migration was declared with a version below 1
    #[error("Invalid migration version {version} in module {module}")]
    InvalidMigrationVersion { module: String, version: i64 },

    /// Two migrations of one module share a version
    #[error("Duplicate migration version {version} in module {module}")]
    DuplicateMigrationVersion { module: String, version: i64 },

    /// Configuration failed validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A module slug that cannot be turned into distinct option keys
    #[error("Invalid module slug '{slug}': {reason}")]
    InvalidModuleSlug { slug: String, reason: String },

    /// An operator string did not name a known comparison
    #[error("Unknown compare operator: {operator}")]
    UnknownOperator { operator: String },

    // ===== Execution Errors =====
    /// The database driver rejected a statement
    #[error("SQL failed: {message} [{statement}]")]
    SqlFailed { statement: String, message: String },

    /// A migration's `up` step failed
    #[error("Migration {version} of module {module} failed: {message}")]
    MigrationFailed {
        module: String,
        version: i64,
        message: String,
    },

    // ===== Internal Errors =====
    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<DigitalisError> for ExError {
    fn from(err: DigitalisError) -> Self {
        match err {
            DigitalisError::TableNotRegistered { slug } => {
                ExError::new(ExErrorKind::NotRegistered)
                    .with_entity_id(slug)
                    .with_message("Table class is not registered")
            }

            DigitalisError::DuplicateTable { slug } => ExError::new(ExErrorKind::AlreadyExists)
                .with_entity_id(slug)
                .with_message("Table slug is already registered"),

            DigitalisError::InvalidMigrationVersion { module, version } => {
                ExError::new(ExErrorKind::InvalidMigrationVersion)
                    .with_module(module)
                    .with_version(version)
                    .with_message("Migration versions must be positive integers")
            }

            DigitalisError::DuplicateMigrationVersion { module, version } => {
                ExError::new(ExErrorKind::DuplicateMigrationVersion)
                    .with_module(module)
                    .with_version(version)
                    .with_message("Migration version declared twice")
            }

            DigitalisError::InvalidConfig { reason } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(reason)
            }

            DigitalisError::InvalidModuleSlug { slug, reason } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_module(slug)
                    .with_message(reason)
            }

            DigitalisError::UnknownOperator { operator } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_entity_id(operator)
                    .with_message("Unknown compare operator")
            }

            DigitalisError::SqlFailed { statement, message } => {
                ExError::new(ExErrorKind::SqlFailed)
                    .with_statement(statement)
                    .with_message(message)
            }

            DigitalisError::MigrationFailed {
                module,
                version,
                message,
            } => ExError::new(ExErrorKind::MigrationFailed)
                .with_module(module)
                .with_version(version)
                .with_message(message),

            DigitalisError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to DigitalisError
impl From<serde_json::Error> for DigitalisError {
    fn from(err: serde_json::Error) -> Self {
        DigitalisError::Serialization {
            message: err.to_string(),
        }
    }
}
