use std::path::PathBuf;

use sequester_refs::RefError;
use thiserror::Error;

/// Errors from requests against the host object database.
#[derive(Debug, Error)]
pub enum OdbError {
    /// The external command could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external command exited unsuccessfully.
    #[error("`{command}` failed ({status}){}", stderr_suffix(.stderr))]
    Exit {
        command: String,
        status: String,
        stderr: String,
    },

    /// The external command produced output that does not match the
    /// expected record shape.
    #[error("malformed output from `{command}`: {reason}: {line:?}")]
    Malformed {
        command: String,
        line: String,
        reason: String,
    },

    /// Reading from or writing to the command's pipes failed.
    #[error("pipe error talking to `{command}`: {source}")]
    Pipe {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The start directory is not inside a repository.
    #[error("not a repository: {0}")]
    NotARepository(PathBuf),

    /// The backend refused the request.
    #[error("rejected by object database: {0}")]
    Rejected(String),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Result alias for object database operations.
pub type OdbResult<T> = Result<T, OdbError>;
