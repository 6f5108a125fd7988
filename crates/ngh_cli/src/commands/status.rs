//! Status command implementation.

use super::open_linked;
use ngh_sync_engine::RemoteStatus;
use std::collections::BTreeSet;
use std::path::Path;

fn print_section(title: &str, paths: &BTreeSet<String>) {
    if paths.is_empty() {
        return;
    }
    println!("{title}:");
    for path in paths {
        println!("  {path}");
    }
    println!();
}

/// Runs the status command.
pub fn run(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_linked(dir)?;
    let report = repo.status()?;

    println!("Repository: {}", report.repository);
    println!("Branch: {}", report.branch);
    if let Some(commit) = &report.last_synced_commit {
        println!("Commit: {commit}");
    }
    println!();

    match &report.remote {
        RemoteStatus::RepositoryMissing => println!("*** The remote repository doesn't exist!"),
        RemoteStatus::BranchMissing => {
            println!("Branch doesn't exist remotely, it will be created on commit.")
        }
        RemoteStatus::UpToDate => {
            println!("Your local repository is up to date with the remote repository.")
        }
        RemoteStatus::Behind { remote_head } => println!(
            "*** Your local repository is not up to date with the remote repository (remote head is {remote_head}). You need to pull before you can commit."
        ),
        RemoteStatus::Unavailable(reason) => {
            println!("*** When checking remote repository status: {reason}")
        }
    }
    println!();

    if !report.local.has_changes() {
        println!("No changes in the local repository.");
        return Ok(());
    }
    print_section("Added files", &report.local.added);
    print_section("Modified files", &report.local.modified);
    print_section("Deleted files", &report.local.deleted);
    Ok(())
}
