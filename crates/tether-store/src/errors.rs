//! Error helpers for tether-store
//!
//! Maps rusqlite failures and store-level problems onto `TetherError`.

use rusqlite::ErrorCode;
use tether_core::TetherError;

/// Result type alias using TetherError
pub type Result<T> = std::result::Result<T, TetherError>;

/// Map a rusqlite error raised while running `op` against `entity`
///
/// Busy, locked, unopenable, I/O and full-disk failures are
/// `StorageUnavailable`; constraint failures are `ConstraintViolation`;
/// everything else is `Persistence`.
pub fn from_rusqlite(entity: &str, op: &str, err: rusqlite::Error) -> TetherError {
    let code = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
        _ => None,
    };
    match code {
        Some(
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull,
        ) => TetherError::StorageUnavailable {
            op: op.to_string(),
            message: err.to_string(),
        },
        Some(ErrorCode::ConstraintViolation) => TetherError::ConstraintViolation {
            entity: entity.to_string(),
            reason: err.to_string(),
        },
        _ => TetherError::Persistence {
            op: op.to_string(),
            message: err.to_string(),
        },
    }
}

/// Create a seed validation error
pub fn seed_validation(reason: impl Into<String>) -> TetherError {
    TetherError::InvalidSeed {
        reason: reason.into(),
    }
}

/// Create a configuration error
pub fn config_error(reason: impl Into<String>) -> TetherError {
    TetherError::Serialization {
        message: reason.into(),
    }
}

/// Create an error for a stored value that does not decode into its field
pub fn decode_error(entity: &str, field: &str, reason: impl Into<String>) -> TetherError {
    TetherError::Persistence {
        op: "decode".to_string(),
        message: format!("{}.{}: {}", entity, field, reason.into()),
    }
}
