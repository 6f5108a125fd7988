//! Pull state machine and operation outcomes.

use ngh_core::{ChangeSet, ConflictRecord};
use std::fmt;

/// Phase of a pull.
///
/// ```text
/// Idle → ComputingRemoteDiff → ComputingLocalDiff → ResolvingConflicts
///      → ApplyingDownloads → ApplyingDeletions → PersistingState → Idle
/// ```
///
/// A failure in any phase returns to `Idle` without touching the ledgers,
/// which are only rewritten in `PersistingState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullState {
    /// No pull in progress.
    #[default]
    Idle,
    /// Fetching the new remote tree and diffing it against the ledger.
    ComputingRemoteDiff,
    /// Classifying local files against the ledger.
    ComputingLocalDiff,
    /// Applying the conflict strategy.
    ResolvingConflicts,
    /// Writing downloaded files.
    ApplyingDownloads,
    /// Removing files deleted remotely.
    ApplyingDeletions,
    /// Rewriting ledgers and markers.
    PersistingState,
}

impl PullState {
    /// The phase that follows this one.
    #[must_use]
    pub fn next(&self) -> PullState {
        match self {
            PullState::Idle => PullState::ComputingRemoteDiff,
            PullState::ComputingRemoteDiff => PullState::ComputingLocalDiff,
            PullState::ComputingLocalDiff => PullState::ResolvingConflicts,
            PullState::ResolvingConflicts => PullState::ApplyingDownloads,
            PullState::ApplyingDownloads => PullState::ApplyingDeletions,
            PullState::ApplyingDeletions => PullState::PersistingState,
            PullState::PersistingState => PullState::Idle,
        }
    }

    /// Returns true while a pull is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, PullState::Idle)
    }
}

impl fmt::Display for PullState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PullState::Idle => "idle",
            PullState::ComputingRemoteDiff => "computing remote diff",
            PullState::ComputingLocalDiff => "computing local diff",
            PullState::ResolvingConflicts => "resolving conflicts",
            PullState::ApplyingDownloads => "applying downloads",
            PullState::ApplyingDeletions => "applying deletions",
            PullState::PersistingState => "persisting state",
        };
        f.write_str(name)
    }
}

/// State of the tracked branch on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// The repository does not exist.
    RepositoryMissing,
    /// The tracked branch does not exist; commit will create it.
    BranchMissing,
    /// The branch head is the last synced commit.
    UpToDate,
    /// The branch moved since the last sync.
    Behind {
        /// Current head of the branch.
        remote_head: String,
    },
    /// The provider could not be queried.
    Unavailable(String),
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Linked repository.
    pub repository: String,
    /// Tracked branch.
    pub branch: String,
    /// Last synced commit, if any.
    pub last_synced_commit: Option<String>,
    /// Remote side.
    pub remote: RemoteStatus,
    /// Local changes since the last sync.
    pub local: ChangeSet,
}

/// Result of a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    /// Branch checked out.
    pub branch: String,
    /// Commit checked out.
    pub commit: Option<String>,
    /// Files fetched from the provider.
    pub downloaded: Vec<String>,
    /// Files already present with the expected size.
    pub skipped: Vec<String>,
    /// True when an interrupted clone was continued.
    pub resumed: bool,
}

/// Result of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Branch recorded.
    pub branch: String,
    /// Commit recorded, `None` for a repository without commits.
    pub commit: Option<String>,
    /// Local files flagged for the next commit.
    pub marked_modified: usize,
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    /// Commit now synced.
    pub commit: String,
    /// Files written from the provider.
    pub downloaded: Vec<String>,
    /// Files removed locally.
    pub deleted: Vec<String>,
    /// Conflicts met and how they were decided.
    pub conflicts: Vec<ConflictRecord>,
}

/// Result of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// New head of the tracked branch.
    pub commit: String,
    /// Files uploaded as new blobs.
    pub uploaded: Vec<String>,
    /// Files removed from the tree.
    pub deleted: Vec<String>,
    /// True when the branch had to be created with an empty commit first.
    pub bootstrapped: bool,
}

/// Result of a branch switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    /// Branch tracked after the switch.
    pub branch: String,
    /// Commit synced after the switch.
    pub commit: String,
    /// The pull that ran, or `None` if the commit was already synced.
    pub pull: Option<PullOutcome>,
}

/// Result of a reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    /// Added files that were removed.
    pub deleted: Vec<String>,
    /// Modified or deleted files restored from the last synced tree.
    pub restored: Vec<String>,
}

impl ResetOutcome {
    /// Returns true if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.restored.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_phases_cycle() {
        let mut state = PullState::Idle;
        let mut seen = vec![state];
        loop {
            state = state.next();
            if state == PullState::Idle {
                break;
            }
            assert!(state.is_active());
            seen.push(state);
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(seen.last(), Some(&PullState::PersistingState));
    }

    #[test]
    fn display() {
        assert_eq!(PullState::ResolvingConflicts.to_string(), "resolving conflicts");
    }
}
