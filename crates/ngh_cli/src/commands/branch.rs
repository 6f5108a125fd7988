//! Branch listing, switching, creation, deletion and merging.

use super::open_linked;
use super::sync::print_pull;
use crate::prompt::ConsolePrompt;
use ngh_core::PullStrategy;
use ngh_sync_engine::{looks_like_commit_hash, RemoteRepository};
use std::path::Path;

/// Lists remote branches.
pub fn list(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_linked(dir)?;
    let branches = repo.list_branches()?;
    let name = repo.remote().name();

    if branches.is_empty() {
        println!("No branches exist in repository {name}");
        return Ok(());
    }
    println!("The following branches exist in repository {name}:");
    println!();
    for branch in branches {
        println!("{branch}");
    }
    Ok(())
}

/// Switches the working directory to another branch or commit.
pub fn switch(dir: &Path, target: &str, strategy: PullStrategy) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = open_linked(dir)?;
    let mut prompt = ConsolePrompt::stdio();
    let outcome = repo.switch_branch(target, strategy, &mut prompt)?;

    if let Some(pull) = &outcome.pull {
        print_pull(pull);
    }
    if looks_like_commit_hash(target) {
        println!(
            "Local repository is now at commit {} of branch '{}'",
            outcome.commit, outcome.branch
        );
    } else {
        println!("Current local branch is now '{}'", outcome.branch);
    }
    Ok(())
}

/// Creates a remote branch.
pub fn create(dir: &Path, name: &str, base: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_linked(dir)?;
    let commit = repo.create_remote_branch(name, base)?;
    println!(
        "Branch '{name}' has been created at {commit}, you can switch to it locally with 'ngh branch switch {name}'"
    );
    Ok(())
}

/// Deletes a remote branch, asking first if it is the tracked one.
pub fn delete(dir: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_linked(dir)?;
    let mut prompt = ConsolePrompt::stdio();
    if repo.delete_remote_branch(name, &mut prompt)? {
        println!("Branch '{name}' has been deleted from the remote repository.");
    } else {
        println!("Operation cancelled");
    }
    Ok(())
}

/// Merges `source` into `base` on the remote.
pub fn merge(
    dir: &Path,
    source: &str,
    base: &str,
    message: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_linked(dir)?;
    let default_message = format!("Merge branch '{source}' into {base}");
    repo.merge(source, base, message.unwrap_or(&default_message))?;

    println!("'{source}' has been merged into '{base}' remotely.");
    if repo.link_state()?.branch == base {
        println!("'{base}' is your current local branch, please do 'ngh pull' to update your local repository.");
    }
    Ok(())
}
