//! Remote branch management and merges.

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteRepository;
use crate::repository::Repository;
use ngh_core::DecisionProvider;
use ngh_storage::Workspace;
use tracing::info;

impl<R: RemoteRepository, W: Workspace> Repository<R, W> {
    /// Names of the remote branches, sorted.
    pub fn list_branches(&self) -> SyncResult<Vec<String>> {
        let mut branches = self.remote.list_branches()?;
        branches.sort();
        Ok(branches)
    }

    /// Creates a remote branch and returns the commit it points to.
    ///
    /// Without `base` the branch starts at the last synced commit. A
    /// repository without any branch gets an empty initial commit instead.
    ///
    /// # Errors
    ///
    /// - [`SyncError::BranchAlreadyExists`]
    /// - [`SyncError::NoBaseCommit`] if nothing is synced yet and other
    ///   branches exist
    /// - [`SyncError::BranchMissingRemotely`] if `base` does not exist
    pub fn create_remote_branch(&self, name: &str, base: Option<&str>) -> SyncResult<String> {
        let state = self.link_state()?;

        if self.remote.branch_head(name)?.is_some() {
            return Err(SyncError::BranchAlreadyExists {
                branch: name.to_string(),
            });
        }

        let commit = match base {
            Some(base) => self
                .remote
                .branch_head(base)?
                .ok_or_else(|| SyncError::BranchMissingRemotely {
                    branch: base.to_string(),
                })?,
            None => match state.last_synced_commit {
                Some(commit) => commit,
                None if self.remote.branch_count()? > 0 => return Err(SyncError::NoBaseCommit),
                None => {
                    info!(branch = name, "creating initial empty commit");
                    // The bootstrap leaves `name` pointing at the new commit.
                    return self.bootstrap_branch(name);
                }
            },
        };

        self.remote.create_branch(name, &commit)?;
        info!(branch = name, commit = %commit, "branch created");
        Ok(commit)
    }

    /// Deletes a remote branch.
    ///
    /// Deleting the tracked branch needs a confirmation from `decisions`;
    /// returns `false` if it was refused.
    pub fn delete_remote_branch(
        &self,
        name: &str,
        decisions: &mut dyn DecisionProvider,
    ) -> SyncResult<bool> {
        let state = self.link_state()?;

        if self.remote.branch_head(name)?.is_none() {
            return Err(SyncError::BranchMissingRemotely {
                branch: name.to_string(),
            });
        }

        if name == state.branch {
            let question = format!(
                "'{name}' is your current local branch. Are you sure that you want to delete it from the remote repository?"
            );
            if !decisions.confirm(&question) {
                info!(branch = name, "deletion cancelled");
                return Ok(false);
            }
        }

        self.remote.delete_branch(name)?;
        info!(branch = name, "branch deleted");
        Ok(true)
    }

    /// Merges `source` into `base` on the provider. Nothing changes locally.
    pub fn merge(&self, source: &str, base: &str, message: &str) -> SyncResult<()> {
        for branch in [source, base] {
            if self.remote.branch_head(branch)?.is_none() {
                return Err(SyncError::BranchMissingRemotely {
                    branch: branch.to_string(),
                });
            }
        }
        info!(source, base, "merging");
        self.remote.merge_branches(source, base, message)
    }
}
