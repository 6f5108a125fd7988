//! Error types for workspace operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workspace operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while accessing the working directory.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A file addressed by the engine does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A path could not be normalized.
    #[error(transparent)]
    InvalidPath(#[from] ngh_core::CoreError),

    /// No linked repository was found at or above the given directory.
    #[error("{} is not linked to any remote repository", .0.display())]
    NotLinked(PathBuf),

    /// Another process is operating on the same working copy.
    #[error("working copy locked: another ngh process is running in {}", .0.display())]
    Locked(PathBuf),

    /// The marker index could not be parsed.
    #[error("corrupted modification index at line {line}: {message}")]
    CorruptMarks {
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A write was refused by a test workspace.
    #[error("injected failure: {0}")]
    Injected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::NotLinked(PathBuf::from("/tmp/work"));
        assert_eq!(
            err.to_string(),
            "/tmp/work is not linked to any remote repository"
        );

        let err = StoreError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(err.to_string().contains("disk full"));
    }
}
