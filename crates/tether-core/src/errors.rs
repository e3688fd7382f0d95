use thiserror::Error;

/// Result type alias using TetherError
pub type Result<T> = std::result::Result<T, TetherError>;

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// log assertions and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // Registry/Definition
    UnknownEntity,
    DuplicateEntity,
    IncompatibleKeyType,
    UnknownRelationship,
    UnknownField,
    DuplicateRelationship,
    InvalidDefinition,
    InvalidPath,

    // Data integrity
    ConstraintViolation,
    MultipleMatches,
    RecordNotFound,
    SchemaMismatch,

    // Input
    InvalidSeed,

    // Backend
    StorageUnavailable,
    Persistence,
    Serialization,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnknownEntity => "ERR_UNKNOWN_ENTITY",
            ErrorKind::DuplicateEntity => "ERR_DUPLICATE_ENTITY",
            ErrorKind::IncompatibleKeyType => "ERR_INCOMPATIBLE_KEY_TYPE",
            ErrorKind::UnknownRelationship => "ERR_UNKNOWN_RELATIONSHIP",
            ErrorKind::UnknownField => "ERR_UNKNOWN_FIELD",
            ErrorKind::DuplicateRelationship => "ERR_DUPLICATE_RELATIONSHIP",
            ErrorKind::InvalidDefinition => "ERR_INVALID_DEFINITION",
            ErrorKind::InvalidPath => "ERR_INVALID_PATH",
            ErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ErrorKind::MultipleMatches => "ERR_MULTIPLE_MATCHES",
            ErrorKind::RecordNotFound => "ERR_RECORD_NOT_FOUND",
            ErrorKind::SchemaMismatch => "ERR_SCHEMA_MISMATCH",
            ErrorKind::InvalidSeed => "ERR_INVALID_SEED",
            ErrorKind::StorageUnavailable => "ERR_STORAGE_UNAVAILABLE",
            ErrorKind::Persistence => "ERR_PERSISTENCE",
            ErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }
}

/// Comprehensive error taxonomy for Tether operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TetherError {
    // ===== Registry Errors =====
    /// Entity name was never registered
    #[error("Unknown entity: {entity}")]
    UnknownEntity { entity: String },

    /// Entity name registered twice
    #[error("Entity already registered: {entity}")]
    DuplicateEntity { entity: String },

    /// Source key and foreign key cannot be compared
    #[error("Incompatible key types for {owner}.{relationship}: {source_key} is {source_type}, {foreign_key} is {foreign_type}")]
    IncompatibleKeyType {
        owner: String,
        relationship: String,
        source_key: String,
        source_type: String,
        foreign_key: String,
        foreign_type: String,
    },

    /// Relationship name not declared on the entity
    #[error("Unknown relationship {relationship} on entity {entity}")]
    UnknownRelationship {
        entity: String,
        relationship: String,
    },

    /// Field name not declared on the entity
    #[error("Unknown field {field} on entity {entity}")]
    UnknownField { entity: String, field: String },

    /// Relationship name collides with an existing relationship or field
    #[error("Relationship {relationship} already declared on entity {entity}")]
    DuplicateRelationship {
        entity: String,
        relationship: String,
    },

    /// Entity definition is structurally invalid
    #[error("Invalid definition for entity {entity}: {reason}")]
    InvalidDefinition { entity: String, reason: String },

    /// Relationship path could not be parsed
    #[error("Invalid relationship path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    // ===== Integrity Errors =====
    /// A write would break a key, nullability or reference constraint
    #[error("Constraint violation on {entity}: {reason}")]
    ConstraintViolation { entity: String, reason: String },

    /// A cardinality-one relationship matched more than one row
    #[error("Relationship {entity}.{relationship} expected at most one match, found {count}")]
    MultipleMatches {
        entity: String,
        relationship: String,
        count: usize,
    },

    /// The durable row behind an instance no longer exists
    #[error("Record not found: {entity} with key {key}")]
    RecordNotFound { entity: String, key: String },

    /// Stored table layout disagrees with the registered definition
    #[error("Schema mismatch for {entity}: recorded checksum {recorded}, current {current}")]
    SchemaMismatch {
        entity: String,
        recorded: String,
        current: String,
    },

    // ===== Input Errors =====
    /// Seed file failed to parse or validate
    #[error("Invalid seed: {reason}")]
    InvalidSeed { reason: String },

    // ===== Backend Errors =====
    /// Backend could not be reached; the caller may retry
    #[error("Storage unavailable during {op}: {message}")]
    StorageUnavailable { op: String, message: String },

    /// Any other backend failure
    #[error("Persistence error during {op}: {message}")]
    Persistence { op: String, message: String },

    /// JSON encoding/decoding error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl TetherError {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            TetherError::UnknownEntity { .. } => ErrorKind::UnknownEntity,
            TetherError::DuplicateEntity { .. } => ErrorKind::DuplicateEntity,
            TetherError::IncompatibleKeyType { .. } => ErrorKind::IncompatibleKeyType,
            TetherError::UnknownRelationship { .. } => ErrorKind::UnknownRelationship,
            TetherError::UnknownField { .. } => ErrorKind::UnknownField,
            TetherError::DuplicateRelationship { .. } => ErrorKind::DuplicateRelationship,
            TetherError::InvalidDefinition { .. } => ErrorKind::InvalidDefinition,
            TetherError::InvalidPath { .. } => ErrorKind::InvalidPath,
            TetherError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            TetherError::MultipleMatches { .. } => ErrorKind::MultipleMatches,
            TetherError::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            TetherError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            TetherError::InvalidSeed { .. } => ErrorKind::InvalidSeed,
            TetherError::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            TetherError::Persistence { .. } => ErrorKind::Persistence,
            TetherError::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Whether the caller may retry the same operation unchanged
    ///
    /// Only backend unavailability qualifies. Nothing in Tether retries on its own.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageUnavailable
    }

    /// Shorthand for a constraint violation on `entity`
    pub fn constraint(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        TetherError::ConstraintViolation {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        TetherError::Serialization {
            message: err.to_string(),
        }
    }
}
