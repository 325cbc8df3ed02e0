use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid object id length: expected 40 or 64 hex digits, got {actual}")]
    InvalidLength { actual: usize },

    #[error("unknown object kind: {0}")]
    UnknownKind(String),

    #[error("invalid size cutoff {input:?}: {reason}")]
    InvalidSize { input: String, reason: String },
}
