#![forbid(unsafe_code)]

//! Store error type.
//!
//! Every variant is a contract violation reported immediately to the direct
//! caller. None of them is transient and nothing inside datamgr retries.

use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by entries, scopes, handles, and the manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A scope with this name is already registered.
    #[error("scope `{0}` is already registered")]
    DuplicateScope(String),

    /// No scope with this name was registered.
    #[error("there is no scope `{0}`; register it before requesting a handle")]
    UnknownScope(String),

    /// A private entry was touched through a public handle.
    #[error("entry `{key}` is private and was accessed from a public handle of scope `{scope}`")]
    VisibilityViolation {
        /// Scope holding the entry.
        scope: String,
        /// Entry key.
        key: String,
    },

    /// A readonly scope handle tried to overwrite or remove an entry.
    #[error("cannot {operation} `{key}`: scope `{scope}` is readonly")]
    ReadonlyViolation {
        /// Scope the handle is bound to.
        scope: String,
        /// Entry key.
        key: String,
        /// The refused operation (`overwrite` or `remove`).
        operation: &'static str,
    },

    /// The entry's initializer finished without producing a value.
    #[error(
        "value of entry `{key}` is not initialized; its initializer must produce a value"
    )]
    UninitializedValue {
        /// Entry key.
        key: String,
    },

    /// The external record bound to an entry does not exist.
    #[error("record `{class}` with id {id} was not found")]
    RecordNotFound {
        /// Record class name.
        class: String,
        /// Record id, rendered as JSON.
        id: String,
    },

    /// An array operation found a non-array value.
    #[error("entry `{key}` in scope `{scope}` does not hold an array")]
    ArrayExpected {
        /// Scope holding the entry.
        scope: String,
        /// Entry key.
        key: String,
    },
}

impl StoreError {
    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateScope(_) => "duplicate_scope",
            Self::UnknownScope(_) => "unknown_scope",
            Self::VisibilityViolation { .. } => "visibility_violation",
            Self::ReadonlyViolation { .. } => "readonly_violation",
            Self::UninitializedValue { .. } => "uninitialized_value",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::ArrayExpected { .. } => "array_expected",
        }
    }
}
