//! Error types for ngh core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while decoding or validating core data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A ledger file could not be parsed.
    #[error("invalid {ledger} ledger at line {line}: {message}")]
    InvalidLedger {
        /// Which ledger failed (`tree` or `state`).
        ledger: &'static str,
        /// One-based line number of the offending line.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A path is not a valid root-relative slash-separated path.
    #[error("invalid path: {path:?}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },
}

impl CoreError {
    /// Creates an invalid-ledger error.
    pub fn invalid_ledger(ledger: &'static str, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidLedger {
            ledger,
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::invalid_ledger("tree", 3, "missing size");
        assert_eq!(err.to_string(), "invalid tree ledger at line 3: missing size");

        let err = CoreError::InvalidPath {
            path: "../etc".into(),
        };
        assert!(err.to_string().contains("../etc"));
    }
}
