//! Pull and branch switching.

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteRepository;
use crate::repository::Repository;
use crate::state::{PullOutcome, PullState, SwitchOutcome};
use ngh_core::ledger::encode_state;
use ngh_core::{
    detect_remote_changes, resolve_pull_conflicts, DecisionProvider, PullStrategy,
    RepositoryLinkState,
};
use ngh_storage::{LedgerKind, Workspace};
use tracing::{debug, info};

/// Returns true if `text` has the shape of a Git commit id.
#[must_use]
pub fn looks_like_commit_hash(text: &str) -> bool {
    text.len() == 40 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

impl<R: RemoteRepository, W: Workspace> Repository<R, W> {
    /// Brings remote changes of the tracked branch into the working directory.
    ///
    /// Conflicting paths are settled by `strategy`; with
    /// [`PullStrategy::Ask`] each one is put to `decisions`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::RemoteRepositoryMissing`] / [`SyncError::BranchMissingRemotely`]
    /// - [`SyncError::AlreadyUpToDate`] if the branch did not move
    ///
    /// On any error the ledgers are left as they were.
    pub fn pull(
        &mut self,
        strategy: PullStrategy,
        decisions: &mut dyn DecisionProvider,
    ) -> SyncResult<PullOutcome> {
        let state = self.link_state()?;
        self.run_pull(state, None, None, strategy, decisions)
    }

    /// Switches to another branch, or to a commit given by its 40-hex id.
    ///
    /// A commit id keeps the tracked branch. If the target is the commit
    /// already synced only the state ledger changes; otherwise a pull
    /// against the target runs.
    pub fn switch_branch(
        &mut self,
        target: &str,
        strategy: PullStrategy,
        decisions: &mut dyn DecisionProvider,
    ) -> SyncResult<SwitchOutcome> {
        let state = self.link_state()?;

        let (commit, branch) = if looks_like_commit_hash(target) {
            if self.remote.commit_tree(target)?.is_none() {
                return Err(SyncError::UnknownCommit {
                    commit: target.to_string(),
                });
            }
            (target.to_string(), state.branch.clone())
        } else {
            let head = self
                .remote
                .branch_head(target)?
                .ok_or_else(|| SyncError::BranchMissingRemotely {
                    branch: target.to_string(),
                })?;
            if target.eq_ignore_ascii_case(&state.branch) {
                return Err(SyncError::AlreadyOnBranch {
                    branch: target.to_string(),
                });
            }
            (head, target.to_string())
        };

        if state.last_synced_commit.as_deref() == Some(commit.as_str()) {
            info!(from = %state.branch, to = %branch, "already at target commit, nothing to pull");
            let switched =
                RepositoryLinkState::new(state.repository, branch.clone(), Some(commit.clone()));
            self.workspace
                .replace_ledger(LedgerKind::State, &encode_state(&switched))?;
            return Ok(SwitchOutcome {
                branch,
                commit,
                pull: None,
            });
        }

        let outcome = self.run_pull(
            state,
            Some(commit.clone()),
            Some(branch.clone()),
            strategy,
            decisions,
        )?;
        Ok(SwitchOutcome {
            branch,
            commit,
            pull: Some(outcome),
        })
    }

    fn run_pull(
        &mut self,
        state: RepositoryLinkState,
        target: Option<String>,
        new_branch: Option<String>,
        strategy: PullStrategy,
        decisions: &mut dyn DecisionProvider,
    ) -> SyncResult<PullOutcome> {
        let result = self.pull_phases(state, target, new_branch, strategy, decisions);
        self.pull_state = PullState::Idle;
        result
    }

    fn advance(&mut self, next: PullState) {
        debug_assert_eq!(self.pull_state.next(), next);
        debug!(from = %self.pull_state, to = %next, "pull phase");
        self.pull_state = next;
    }

    fn pull_phases(
        &mut self,
        state: RepositoryLinkState,
        target: Option<String>,
        new_branch: Option<String>,
        strategy: PullStrategy,
        decisions: &mut dyn DecisionProvider,
    ) -> SyncResult<PullOutcome> {
        self.pull_state = PullState::Idle;
        self.advance(PullState::ComputingRemoteDiff);
        info!("checking remote status");

        self.ensure_remote_exists()?;
        let remote_commit = match target {
            Some(commit) => commit,
            None => self.remote.branch_head(&state.branch)?.ok_or_else(|| {
                SyncError::BranchMissingRemotely {
                    branch: state.branch.clone(),
                }
            })?,
        };
        if state.last_synced_commit.as_deref() == Some(remote_commit.as_str()) {
            return Err(SyncError::AlreadyUpToDate);
        }

        info!(commit = %remote_commit, "calculating changes");
        let new_snapshot = self.remote_snapshot(&remote_commit)?;
        let old_snapshot = self.tracked_snapshot()?;
        let remote_changes = detect_remote_changes(&old_snapshot, &new_snapshot);

        self.advance(PullState::ComputingLocalDiff);
        let local_changes = self.local_changes_against(&old_snapshot)?;

        self.advance(PullState::ResolvingConflicts);
        let resolution = resolve_pull_conflicts(&remote_changes, &local_changes, strategy, decisions);

        self.advance(PullState::ApplyingDownloads);
        let mut downloaded = Vec::with_capacity(resolution.download.len());
        for path in &resolution.download {
            let reference = new_snapshot.get(path).ok_or_else(|| {
                SyncError::Protocol(format!("{path} missing from tree of {remote_commit}"))
            })?;
            info!(path = %path, "downloading");
            let data = self.remote.get_blob(&reference.blob_hash)?;
            self.workspace.write(path, &data)?;
            self.workspace.mark_unmodified(path)?;
            downloaded.push(path.clone());
        }

        self.advance(PullState::ApplyingDeletions);
        let mut deleted = Vec::with_capacity(resolution.delete_locally.len());
        for path in &resolution.delete_locally {
            info!(path = %path, "deleting");
            self.workspace.delete(path)?;
            deleted.push(path.clone());
        }

        self.advance(PullState::PersistingState);
        let synced = RepositoryLinkState::new(
            state.repository,
            new_branch.unwrap_or(state.branch),
            Some(remote_commit.clone()),
        );
        self.persist(&synced, &new_snapshot)?;
        self.advance(PullState::Idle);

        Ok(PullOutcome {
            commit: remote_commit,
            downloaded,
            deleted,
            conflicts: resolution.conflicts,
        })
    }
}
