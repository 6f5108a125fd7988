//! Pull, commit and reset commands.

use super::open_linked;
use crate::prompt::ConsolePrompt;
use ngh_core::{Decision, PullStrategy};
use ngh_sync_engine::{PullOutcome, RemoteRepository, SyncError};
use std::path::Path;

pub(crate) fn print_pull(outcome: &PullOutcome) {
    for path in &outcome.downloaded {
        println!("  downloaded {path}");
    }
    for path in &outcome.deleted {
        println!("  deleted {path}");
    }
    for conflict in &outcome.conflicts {
        let kept = match conflict.decision {
            Decision::KeepLocal => "local side kept",
            Decision::TakeRemote => "remote side taken",
        };
        println!("  conflict on {}: {kept}", conflict.path);
    }
}

/// Pulls the tracked branch.
pub fn pull(dir: &Path, strategy: PullStrategy) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = open_linked(dir)?;
    let mut prompt = ConsolePrompt::stdio();

    match repo.pull(strategy, &mut prompt) {
        Ok(outcome) => {
            print_pull(&outcome);
            println!(
                "Your local repository is now up to date with {}",
                repo.remote().name()
            );
            Ok(())
        }
        Err(SyncError::AlreadyUpToDate) => {
            println!("{}", SyncError::AlreadyUpToDate);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Commits and pushes every local change.
pub fn commit(dir: &Path, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = open_linked(dir)?;
    let outcome = repo.commit(message)?;

    if outcome.bootstrapped {
        println!("Created the initial commit of the repository.");
    }
    for path in &outcome.uploaded {
        println!("  pushed {path}");
    }
    for path in &outcome.deleted {
        println!("  removed {path}");
    }
    println!("Commit {} completed successfully.", outcome.commit);
    Ok(())
}

/// Discards local changes matching `pathspec` (all of them when `None`).
pub fn reset(dir: &Path, pathspec: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = open_linked(dir)?;
    let outcome = repo.reset(pathspec)?;

    if outcome.is_empty() {
        println!("No changes match the supplied pathspec, nothing to do.");
        return Ok(());
    }
    for path in &outcome.deleted {
        println!("  deleted {path}");
    }
    for path in &outcome.restored {
        println!("  restored {path}");
    }
    Ok(())
}
