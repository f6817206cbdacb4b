use thiserror::Error;

/// Result type alias used by every repository operation
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Lookups that find nothing are not errors (they return `Ok(None)` or
/// `Ok(false)`), so there is no `NotFound` kind. Each kind maps to a stable
/// code that callers can translate into an externally visible response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Stored or supplied data could not be interpreted
    InvalidInput,
    /// Unique or foreign-key constraint would be (or was) violated
    ConstraintViolation,
    /// The backing store cannot be reached
    Connectivity,
    /// Waiting for a connection or statement timed out
    Timeout,
    /// Any other storage-engine fault, including migration failures
    Persistence,
    /// Missing or malformed configuration, fatal at startup
    Config,
    /// Invariant broken inside the process, such as a poisoned lock
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Connectivity => "ERR_CONNECTIVITY",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the operation and
/// entity that failed, for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    message: String,
}

impl ExError {
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

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

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

    /// True for unique / foreign-key violations
    pub fn is_constraint_violation(&self) -> bool {
        self.kind == ExErrorKind::ConstraintViolation
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

/// Typed failures raised by the in-memory backend and the shared model code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StudyHubError {
    /// Another user already holds this email
    #[error("Email already registered: {email}")]
    DuplicateEmail { email: String },

    /// A foreign key points at a row that does not exist
    #[error("{entity}.{field} references missing row {id}")]
    MissingReference {
        entity: &'static str,
        field: &'static str,
        id: String,
    },

    /// The store's lock was poisoned by a panicking writer
    #[error("Store lock poisoned during {op}")]
    LockPoisoned { op: &'static str },
}

impl From<StudyHubError> for ExError {
    fn from(err: StudyHubError) -> Self {
        match err {
            StudyHubError::DuplicateEmail { email } => {
                ExError::new(ExErrorKind::ConstraintViolation)
                    .with_op("create_user")
                    .with_message(format!("Email already registered: {}", email))
            }

            StudyHubError::MissingReference { entity, field, id } => {
                ExError::new(ExErrorKind::ConstraintViolation)
                    .with_entity_id(id)
                    .with_message(format!("{}.{} references a missing row", entity, field))
            }

            StudyHubError::LockPoisoned { op } => ExError::new(ExErrorKind::Internal)
                .with_op(op)
                .with_message("Store lock poisoned"),
        }
    }
}
