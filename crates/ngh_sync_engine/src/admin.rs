//! Creating and destroying remote repositories.
//!
//! These work on the provider alone and never touch a working directory.

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteRepository;
use crate::repository::same_repository;
use tracing::info;

/// Creates `remote` in the authenticated account and returns the full
/// name the provider assigned.
///
/// # Errors
///
/// Returns [`SyncError::RemoteApi`] if a repository of that name exists.
pub fn create_repository<R: RemoteRepository>(
    remote: &R,
    description: &str,
    private: bool,
) -> SyncResult<String> {
    info!(repository = %remote.name(), private, "creating repository");
    let full_name = remote.create_repository(description, private)?;
    info!(repository = %full_name, "repository created");
    Ok(full_name)
}

/// Deletes `remote` if `confirmation` names it, ignoring case.
///
/// Returns false, without any request, when the confirmation does not
/// match.
///
/// # Errors
///
/// Returns [`SyncError::RemoteRepositoryMissing`] if there is nothing to
/// delete.
pub fn destroy_repository<R: RemoteRepository>(remote: &R, confirmation: &str) -> SyncResult<bool> {
    if !same_repository(confirmation.trim(), remote.name()) {
        info!(repository = %remote.name(), "destroy cancelled");
        return Ok(false);
    }
    if !remote.repository_exists()? {
        return Err(SyncError::RemoteRepositoryMissing {
            repository: remote.name().to_string(),
        });
    }
    remote.delete_repository()?;
    info!(repository = %remote.name(), "repository deleted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryRemote;

    #[test]
    fn create_then_refuse_duplicate() {
        let remote = MemoryRemote::missing("octo/notes");
        assert_eq!(create_repository(&remote, "my notes", false).unwrap(), "octo/notes");
        assert!(remote.repository_exists().unwrap());

        let err = create_repository(&remote, "", false).unwrap_err();
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn destroy_needs_matching_confirmation() {
        let remote = MemoryRemote::new("octo/notes");
        remote.seed_commit("main", &[("a", b"1")]);

        assert!(!destroy_repository(&remote, "").unwrap());
        assert!(!destroy_repository(&remote, "octo/other").unwrap());
        assert!(remote.repository_exists().unwrap());

        assert!(destroy_repository(&remote, " OCTO/Notes\n").unwrap());
        assert!(!remote.repository_exists().unwrap());

        assert!(matches!(
            destroy_repository(&remote, "octo/notes"),
            Err(SyncError::RemoteRepositoryMissing { .. })
        ));
    }
}
