//! Error types for the scheduler.

use thiserror::Error;

/// Errors produced by the store, the validation rules and the access policy.
///
/// The `Display` text of every variant is the message shown to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A field has the wrong shape (e.g. a malformed email address)
    #[error("{message}")]
    Format { message: String },

    /// A unique key is already taken
    #[error("{name} already exists.")]
    Integrity { name: String },

    /// A required argument is missing or of the wrong kind
    #[error("{message}")]
    Type { message: String },

    /// An argument is present but breaks a domain rule
    #[error("{message}")]
    Value { message: String },

    /// The caller's role does not allow the action
    #[error("Access denied.")]
    AccessDenied,

    /// No (or an expired) session
    #[error("You must login to access the site.")]
    Unauthenticated,

    /// Login with an unknown email or wrong password
    #[error("Email or password is invalid.")]
    InvalidCredentials,

    /// A user tried to delete their own account
    #[error("You cannot delete yourself.")]
    SelfDelete,

    /// No record with the requested key
    #[error("{entity} not found.")]
    NotFound { entity: &'static str },

    /// The underlying store failed
    #[error("Database error: {message}")]
    Database { message: String },
}

impl SchedulerError {
    pub fn type_error(message: impl Into<String>) -> Self {
        SchedulerError::Type {
            message: message.into(),
        }
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        SchedulerError::Value {
            message: message.into(),
        }
    }

    pub fn integrity(name: impl Into<String>) -> Self {
        SchedulerError::Integrity { name: name.into() }
    }

    /// Returns true if the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SchedulerError::Database { .. })
    }

    /// Returns true if the error means the caller may not perform the action.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            SchedulerError::AccessDenied
                | SchedulerError::Unauthenticated
                | SchedulerError::InvalidCredentials
                | SchedulerError::SelfDelete
        )
    }
}

impl From<rusqlite::Error> for SchedulerError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulerError::Database {
            message: err.to_string(),
        }
    }
}

/// Returns true if a store error is a UNIQUE / PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
