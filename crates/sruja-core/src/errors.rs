use thiserror::Error;

use crate::model::SourceLocation;

/// Result type alias using KernelError
pub type Result<T> = std::result::Result<T, KernelError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// test assertions and diagnostics rendered to notebook clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    InvalidCommand,

    // Lookup
    NotFound,
    AlreadyExists,

    // Collaborators
    ParseFailed,
    TransformFailed,
    CompileFailed,
    NotConfigured,

    // Persistence format
    InvalidIr,
    Serialization,

    // Simulation
    NoLifecycle,
    UnknownState,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidCommand => "ERR_INVALID_COMMAND",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ParseFailed => "ERR_PARSE_FAILED",
            ExErrorKind::TransformFailed => "ERR_TRANSFORM_FAILED",
            ExErrorKind::CompileFailed => "ERR_COMPILE_FAILED",
            ExErrorKind::NotConfigured => "ERR_NOT_CONFIGURED",
            ExErrorKind::InvalidIr => "ERR_INVALID_IR",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::NoLifecycle => "ERR_NO_LIFECYCLE",
            ExErrorKind::UnknownState => "ERR_UNKNOWN_STATE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling. Correlation
/// ids live on the `execute_cell` span, not on the error.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (snapshot, variant, element or entity name)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
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
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for kernel operations
///
/// Every variant is recoverable: callers receive it as a value and the
/// kernel keeps running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    // ===== Lookup Errors =====
    #[error("snapshot '{name}' not found")]
    SnapshotNotFound { name: String },

    #[error("snapshot '{name}' already exists")]
    SnapshotAlreadyExists { name: String },

    #[error("variant '{name}' not found")]
    VariantNotFound { name: String },

    #[error("variant '{name}' already exists")]
    VariantAlreadyExists { name: String },

    /// Variant creation named a base snapshot that does not exist
    #[error("base snapshot '{snapshot}' for variant '{variant}' not found")]
    BaseSnapshotMissing { variant: String, snapshot: String },

    // ===== Simulation Errors =====
    #[error("entity '{entity}' declares no lifecycle")]
    NoLifecycle { entity: String },

    #[error("no lifecycle FSM registered for entity '{entity}'")]
    FsmNotFound { entity: String },

    #[error("state '{state}' is not declared in the lifecycle of '{entity}'")]
    UnknownState { entity: String, state: String },

    // ===== Collaborator Errors =====
    #[error("parse error: {message}")]
    Parse {
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("transform error: {message}")]
    Transform { message: String },

    #[error("diagram compile error ({format}): {message}")]
    Compile { format: String, message: String },

    #[error("{what} is not configured")]
    NotConfigured { what: String },

    // ===== Store Errors =====
    /// IR document could not be decoded into a Model
    #[error("invalid IR: {message}")]
    InvalidIr { message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    // ===== Input Errors =====
    #[error("invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<KernelError> for ExError {
    fn from(err: KernelError) -> Self {
        let message = err.to_string();
        match err {
            KernelError::SnapshotNotFound { name } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(name)
                .with_message(message),

            KernelError::VariantNotFound { name } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(name)
                .with_message(message),

            KernelError::BaseSnapshotMissing { snapshot, .. } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(snapshot)
                    .with_message(message)
            }

            KernelError::FsmNotFound { entity } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(entity)
                .with_message(message),

            KernelError::SnapshotAlreadyExists { name }
            | KernelError::VariantAlreadyExists { name } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_id(name)
                    .with_message(message)
            }

            KernelError::NoLifecycle { entity } => ExError::new(ExErrorKind::NoLifecycle)
                .with_entity_id(entity)
                .with_message(message),

            KernelError::UnknownState { entity, .. } => ExError::new(ExErrorKind::UnknownState)
                .with_entity_id(entity)
                .with_message(message),

            KernelError::Parse { .. } => ExError::new(ExErrorKind::ParseFailed)
                .with_op("parse")
                .with_message(message),

            KernelError::Transform { .. } => ExError::new(ExErrorKind::TransformFailed)
                .with_op("transform")
                .with_message(message),

            KernelError::Compile { format, .. } => ExError::new(ExErrorKind::CompileFailed)
                .with_entity_id(format)
                .with_message(message),

            KernelError::NotConfigured { what } => ExError::new(ExErrorKind::NotConfigured)
                .with_entity_id(what)
                .with_message(message),

            KernelError::InvalidIr { .. } => {
                ExError::new(ExErrorKind::InvalidIr).with_message(message)
            }

            KernelError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            KernelError::InvalidCommand { .. } => {
                ExError::new(ExErrorKind::InvalidCommand).with_message(message)
            }

            KernelError::Internal { .. } => ExError::new(ExErrorKind::Internal).with_message(message),
        }
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::Serialization {
            message: err.to_string(),
        }
    }
}
