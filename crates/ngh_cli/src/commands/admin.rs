//! Repository creation and destruction commands.

use super::connect;
use crate::config::Identity;
use crate::prompt::ConsolePrompt;
use ngh_sync_engine::{create_repository, destroy_repository, SyncError};

/// Creates `name` in the account of the configured user.
pub fn new(name: &str, description: &str, private: bool) -> Result<(), Box<dyn std::error::Error>> {
    let identity = Identity::from_env()?;
    let repository = own_repository_name(&identity, name)?;
    let remote = connect(&identity, &repository)?;

    let full_name = create_repository(&remote, description, private)?;
    println!("Repository {full_name} created successfully");
    Ok(())
}

/// Deletes `name` after the user types its full name again.
pub fn destroy(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let identity = Identity::from_env()?;
    let repository = identity.full_repository_name(name);
    let remote = connect(&identity, &repository)?;

    let question = format!(
        "WARNING! This action cannot be undone.\n\
         This will permanently delete the {repository} repository, wiki, issues, and comments, \
         and remove all collaborator associations.\n\n\
         Please type in the full name of the repository to confirm (or press Enter to cancel):"
    );
    let typed = ConsolePrompt::stdio().ask_line(&question).unwrap_or_default();

    if destroy_repository(&remote, &typed)? {
        println!("Repository {repository} successfully deleted");
    } else {
        println!("Operation cancelled");
    }
    Ok(())
}

/// Completes `name` for creation, which is only possible in our own account.
fn own_repository_name(identity: &Identity, name: &str) -> Result<String, SyncError> {
    let repository = identity.full_repository_name(name);
    match repository.split_once('/') {
        Some((owner, _)) if owner.eq_ignore_ascii_case(&identity.user) => Ok(repository),
        _ => Err(SyncError::Configuration(format!(
            "{name}: repositories can be created in your own account only, \
             give the name without the owner"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::from_lookup(|var| match var {
            crate::config::USER_VAR => Some("konamiman".to_string()),
            crate::config::TOKEN_VAR => Some("t".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn repositories_are_created_in_own_account() {
        let identity = identity();
        assert_eq!(
            own_repository_name(&identity, "notes").unwrap(),
            "konamiman/notes"
        );
        assert_eq!(
            own_repository_name(&identity, "Konamiman/notes").unwrap(),
            "Konamiman/notes"
        );
        assert!(matches!(
            own_repository_name(&identity, "octo/notes"),
            Err(SyncError::Configuration(_))
        ));
    }
}
