//! Error types for the sync engine.

use ngh_core::CoreError;
use ngh_storage::StoreError;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// One entry of the field-level error list returned by the provider.
///
/// Entries are free-form key/value pairs (`resource`, `field`, `code`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldError {
    /// Key/value pairs of the entry.
    pub entries: BTreeMap<String, String>,
}

impl FieldError {
    /// Creates an entry from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.entries {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{key} = {value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing identity. Fatal.
    Configuration,
    /// The provider refused a request or could not be reached.
    RemoteApi,
    /// A local check failed before anything was changed remotely.
    Precondition,
    /// The working directory could not be read or written.
    LocalIo,
}

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Bad or missing identity.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-success response from the provider.
    #[error("{status} {message}")]
    RemoteApi {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
        /// Field-level error list.
        errors: Vec<FieldError>,
    },

    /// The provider could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with something we could not understand.
    #[error("unexpected response from provider: {0}")]
    Protocol(String),

    /// Commit found no added, modified or deleted file.
    #[error("no local changes, nothing to commit")]
    NothingToCommit,

    /// The linked repository does not exist remotely.
    #[error("the remote repository {repository} doesn't exist")]
    RemoteRepositoryMissing {
        /// Repository id.
        repository: String,
    },

    /// The branch does not exist remotely.
    #[error("branch '{branch}' doesn't exist remotely")]
    BranchMissingRemotely {
        /// Branch name.
        branch: String,
    },

    /// The remote branch moved since the last sync.
    #[error("the local repository isn't up to date with the remote repository, pull before committing")]
    OutOfDate,

    /// The remote branch did not move since the last sync.
    #[error("the local repository is up to date with remote, nothing to pull")]
    AlreadyUpToDate,

    /// The directory is linked to another repository.
    #[error("{path} is already linked to repository {repository}")]
    AlreadyLinked {
        /// Working directory.
        path: String,
        /// Repository it is linked to.
        repository: String,
    },

    /// Clone target holds files but no link.
    #[error("the target directory {path} is not empty")]
    DirectoryNotEmpty {
        /// Working directory.
        path: String,
    },

    /// Clone of a repository without commits.
    #[error("the repository {repository} is empty, use link instead of clone")]
    RemoteEmpty {
        /// Repository id.
        repository: String,
    },

    /// The directory is not linked to any repository.
    #[error("{path} is not linked to any remote repository")]
    NotLinked {
        /// Working directory.
        path: String,
    },

    /// Branch creation with a name already in use.
    #[error("branch '{branch}' already exists remotely")]
    BranchAlreadyExists {
        /// Branch name.
        branch: String,
    },

    /// Branch creation without a base while other branches exist.
    #[error("the local repository doesn't point to any commit, specify a base branch")]
    NoBaseCommit,

    /// A commit hash unknown to the provider.
    #[error("no commit {commit} exists in the remote repository")]
    UnknownCommit {
        /// Commit hash.
        commit: String,
    },

    /// Switch to the branch already tracked.
    #[error("branch '{branch}' is already the current local branch, use pull to get its latest version")]
    AlreadyOnBranch {
        /// Branch name.
        branch: String,
    },

    /// A persisted ledger could not be parsed.
    #[error("ledger error: {0}")]
    Ledger(#[from] CoreError),

    /// Working directory failure.
    #[error("local I/O error: {0}")]
    Local(StoreError),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotLinked(path) => SyncError::NotLinked {
                path: path.display().to_string(),
            },
            other => SyncError::Local(other),
        }
    }
}

impl SyncError {
    /// Creates a remote API error without field errors.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Configuration(_) => ErrorKind::Configuration,
            SyncError::RemoteApi { .. } | SyncError::Transport(_) | SyncError::Protocol(_) => {
                ErrorKind::RemoteApi
            }
            SyncError::Ledger(_) | SyncError::Local(_) => ErrorKind::LocalIo,
            _ => ErrorKind::Precondition,
        }
    }

    /// Returns true for failures raised before any remote mutation.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        self.kind() == ErrorKind::Precondition
    }

    /// Returns true if this error can be retried.
    ///
    /// Remote failures never are: repeating an object creation could
    /// leave duplicates behind.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Field-level errors of a remote API failure.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SyncError::RemoteApi { errors, .. } => errors,
            _ => &[],
        }
    }

    /// HTTP status of a remote API failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::RemoteApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classification() {
        assert_eq!(
            SyncError::Configuration("no token".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(SyncError::remote(422, "bad").kind(), ErrorKind::RemoteApi);
        assert_eq!(SyncError::Transport("reset".into()).kind(), ErrorKind::RemoteApi);
        assert!(SyncError::NothingToCommit.is_precondition());
        assert!(SyncError::OutOfDate.is_precondition());
        assert!(SyncError::BranchMissingRemotely {
            branch: "dev".into()
        }
        .is_precondition());

        let local = SyncError::from(StoreError::NotFound("a".into()));
        assert_eq!(local.kind(), ErrorKind::LocalIo);
    }

    #[test]
    fn remote_errors_are_not_retried() {
        assert!(!SyncError::remote(500, "oops").is_retryable());
        assert!(!SyncError::Transport("timeout".into()).is_retryable());
    }

    #[test]
    fn unlinked_store_error_maps_to_precondition() {
        let err = SyncError::from(StoreError::NotLinked(PathBuf::from("/work")));
        assert!(matches!(err, SyncError::NotLinked { ref path } if path == "/work"));
        assert!(err.is_precondition());
    }

    #[test]
    fn field_error_display() {
        let err = SyncError::RemoteApi {
            status: 422,
            message: "Validation Failed".into(),
            errors: vec![FieldError::from_pairs([("field", "sha"), ("code", "invalid")])],
        };
        assert_eq!(err.to_string(), "422 Validation Failed");
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.field_errors()[0].to_string(), "code = invalid, field = sha");
    }
}
