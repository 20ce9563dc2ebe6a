//! Error taxonomy for the memory engine.
//!
//! Every fallible operation in `memoria-core` returns `Result<_, CoreError>`.
//! The variants map directly onto the transport-level error codes that
//! `memoria-mcp` exposes over JSON-RPC and HTTP.

use thiserror::Error;

/// Errors produced by the memory engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input violates a schema or semantic bound (content too long,
    /// importance out of range, malformed filter, ...).
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Referenced entity does not exist (or is already hard-deleted).
    #[error("not found: {0}")]
    NotFound(String),

    /// A precondition was violated (e.g. unpinning a high-importance
    /// memory without `confirm=true`).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store contention exhausted the local retry budget.
    #[error("store busy: {0}")]
    Busy(String),

    /// A dependent subsystem (embedding provider, vector search) is
    /// disabled or unreachable; caller should expect a degraded result,
    /// not treat this as fatal unless propagated explicitly.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Bug or unrecoverable condition. Logged with context at the call
    /// site before conversion.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine code used by transports; kept independent of the
    /// `Display` message so wording can change without breaking clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Busy(_) => "busy",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound(err.to_string()),
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Self::Busy(err.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(feature = "embeddings")]
impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable_and_independent_of_message() {
        let a = CoreError::invalid("missing content");
        let b = CoreError::invalid("importance out of range");
        assert_eq!(a.code(), b.code());
        assert_eq!(a.code(), "invalid");
    }

    #[test]
    fn busy_sqlite_error_maps_to_busy() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::DatabaseBusy,
                extended_code: 5,
            },
            Some("database is locked".to_string()),
        );
        let core_err: CoreError = sqlite_err.into();
        assert_eq!(core_err.code(), "busy");
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let core_err: CoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(core_err.code(), "not_found");
    }
}
