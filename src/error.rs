//! Error types for the back-office engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the expense workflow, payroll computation, persistence
//! gateway and external connectors can produce.

use thiserror::Error;
use uuid::Uuid;

use crate::models::ExpenseStatus;

/// The main error type for the back-office engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently from the store up to the HTTP boundary.
///
/// # Example
///
/// ```
/// use backoffice_engine::error::BackofficeError;
///
/// let error = BackofficeError::ConfigNotFound {
///     path: "/missing/backoffice.yaml".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Configuration file not found: /missing/backoffice.yaml"
/// );
/// ```
#[derive(Debug, Error)]
pub enum BackofficeError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Caller input failed validation.
    #[error("Invalid field '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record (e.g. "Expense").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The expense is not in a state that allows the requested transition.
    #[error("Expense {expense_id} is in {current} status and cannot move to {requested}")]
    InvalidTransition {
        /// The expense whose transition was refused.
        expense_id: Uuid,
        /// The status the expense is currently in.
        current: ExpenseStatus,
        /// The status the caller asked for.
        requested: ExpenseStatus,
    },

    /// The user has no employee reference in the accounting system.
    #[error("User {user_id} is not linked with the accounting system")]
    NotLinked {
        /// The user missing an external employee reference.
        user_id: Uuid,
    },

    /// The accounting service rejected or failed a request.
    #[error("Accounting service error: {message}")]
    Accounting {
        /// A description of the failure.
        message: String,
    },

    /// The groupware service rejected or failed a request.
    #[error("Groupware service error: {message}")]
    Groupware {
        /// A description of the failure.
        message: String,
    },

    /// The underlying SQLite store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// An unexpected internal failure (e.g. a worker task panicked).
    #[error("Internal error: {message}")]
    Internal {
        /// A description of the failure.
        message: String,
    },
}

impl BackofficeError {
    /// Shorthand for a [`BackofficeError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`BackofficeError::NotFound`] error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A type alias for Results that return BackofficeError.
pub type BackofficeResult<T> = Result<T, BackofficeError>;
