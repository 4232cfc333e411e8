//! Error taxonomy shared across the store, query engine, scheduler, and tools.
//!
//! Every failure a tool caller can observe maps to one of the variants here;
//! the stable machine-readable code comes from [`MosaicError::code`]. Storage
//! constraint violations are translated in the [`From<rusqlite::Error>`] impl
//! so the store modules can use `?` directly.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MosaicError>;

/// The error kinds surfaced to MCP tool callers.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// Shape, value range, or semantic precondition violated.
    #[error("{0}")]
    InvalidArgument(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Unique or semantic constraint violation.
    #[error("{0}")]
    Conflict(String),

    /// Reserved for future multi-user use; currently never constructed.
    #[error("{0}")]
    PermissionDenied(String),

    /// The notification bridge exhausted its retry budget.
    #[error("notification bridge unreachable after {attempts} attempt(s)")]
    DeliveryFailed { attempts: u32 },

    /// Unexpected storage, serialization, or dependency failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl MosaicError {
    /// Stable machine-readable error code, prefixed onto tool error strings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::PermissionDenied(_) => "permission_denied",
            Self::DeliveryFailed { .. } => "delivery_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// Shorthand constructor for invalid-argument errors.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand constructor for not-found errors.
    pub fn not_found(entity: &str, id: i64) -> Self {
        Self::NotFound(format!("{entity} with id {id} not found"))
    }
}

// SQLite extended result codes for constraint violations.
const SQLITE_CONSTRAINT_CHECK: i32 = 275;
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;
const SQLITE_CONSTRAINT_NOTNULL: i32 = 1299;
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

impl From<rusqlite::Error> for MosaicError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ffi_err, msg) = &err {
            let detail = msg.clone().unwrap_or_else(|| ffi_err.to_string());
            match ffi_err.extended_code {
                SQLITE_CONSTRAINT_FOREIGNKEY
                | SQLITE_CONSTRAINT_CHECK
                | SQLITE_CONSTRAINT_NOTNULL => {
                    return Self::InvalidArgument(format!("constraint violated: {detail}"));
                }
                SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::Conflict(format!("uniqueness violated: {detail}"));
                }
                _ => {}
            }
        }
        Self::Internal(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(MosaicError::invalid("x").code(), "invalid_argument");
        assert_eq!(MosaicError::not_found("project", 7).code(), "not_found");
        assert_eq!(MosaicError::Conflict("dup".into()).code(), "conflict");
        assert_eq!(
            MosaicError::DeliveryFailed { attempts: 3 }.code(),
            "delivery_failed"
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = MosaicError::not_found("project", 999);
        assert_eq!(err.to_string(), "project with id 999 not found");
    }
}
