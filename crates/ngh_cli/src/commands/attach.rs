//! Clone, link and unlink commands.

use super::{connect, CliRepository};
use crate::config::Identity;
use ngh_storage::{DiskWorkspace, Workspace};
use ngh_sync_engine::{load_link_state, RemoteRepository, Repository, SyncError};
use std::path::Path;
use tracing::info;

fn attach(dir: &Path, repository: &str) -> Result<CliRepository, Box<dyn std::error::Error>> {
    let identity = Identity::from_env()?;
    let repository = identity.full_repository_name(repository);
    let workspace = DiskWorkspace::open_unlinked(dir).map_err(SyncError::from)?;
    let remote = connect(&identity, &repository)?;
    Ok(Repository::new(remote, workspace, identity.engine_config()))
}

/// Downloads `repository` into `dir` and links it.
pub fn clone(dir: &Path, repository: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = attach(dir, repository)?;
    let outcome = repo.clone_remote()?;

    for path in &outcome.skipped {
        println!("  {path} - already exists, skipping");
    }
    for path in &outcome.downloaded {
        println!("  {path}");
    }
    println!();
    println!(
        "Repository {} has been cloned at {} (branch {})",
        repo.remote().name(),
        dir.display(),
        outcome.branch
    );
    Ok(())
}

/// Links `dir` to `repository` without downloading.
pub fn link(dir: &Path, repository: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = attach(dir, repository)?;
    let outcome = repo.link()?;

    println!(
        "{} has been linked to {} on branch {}",
        dir.display(),
        repo.remote().name(),
        outcome.branch
    );
    if outcome.marked_modified > 0 {
        println!(
            "{} existing files are flagged as modified and will be pushed on the next commit.",
            outcome.marked_modified
        );
    }
    Ok(())
}

/// Removes the link of the working directory containing `dir`.
///
/// Needs no credentials: nothing is sent to the provider.
pub fn unlink(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut workspace = DiskWorkspace::discover(dir).map_err(SyncError::from)?;
    let state = load_link_state(&workspace)?.ok_or_else(|| SyncError::NotLinked {
        path: dir.display().to_string(),
    })?;
    workspace.remove_metadata()?;

    info!(repository = %state.repository, "unlinked");
    println!(
        "{} is no longer linked to {}",
        workspace.root().display(),
        state.repository
    );
    Ok(())
}
