//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    /// The reference name is not a valid fully-qualified name.
    #[error("invalid ref name: {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The same reference appears twice in one transaction.
    #[error("ref updated twice in one transaction: {name}")]
    DuplicateUpdate { name: String },
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
