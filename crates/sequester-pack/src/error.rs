use std::path::PathBuf;

use sequester_odb::OdbError;
use sequester_refs::RefError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    /// Pack creation did not leave the expected artifact behind.
    #[error("pack artifact missing: {}", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pack prefix {0:?}: must be a plain file name")]
    InvalidPrefix(String),

    #[error("object database error: {0}")]
    Odb(#[from] OdbError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),
}

pub type PackResult<T> = Result<T, PackError>;

/// Attach the path to an I/O error.
pub(crate) trait IoContext<T> {
    fn at(self, path: &std::path::Path) -> PackResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: &std::path::Path) -> PackResult<T> {
        self.map_err(|source| PackError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
