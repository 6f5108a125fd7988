//! Commit: publish local changes as a new remote commit.

use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteRepository, EMPTY_TREE_HASH};
use crate::repository::Repository;
use crate::state::CommitOutcome;
use ngh_core::{FileReference, RepositoryLinkState};
use ngh_storage::Workspace;
use tracing::info;

impl<R: RemoteRepository, W: Workspace> Repository<R, W> {
    /// Publishes every local change as one commit on the tracked branch.
    ///
    /// Preconditions are checked in order, each with its own error, and
    /// none of them mutates the remote:
    ///
    /// 1. [`SyncError::NothingToCommit`]
    /// 2. [`SyncError::RemoteRepositoryMissing`]
    /// 3. [`SyncError::BranchMissingRemotely`] when the branch is absent
    ///    but other branches exist (with no branches at all, the branch
    ///    is created with an empty commit)
    /// 4. [`SyncError::OutOfDate`] when the branch moved since the last sync
    ///
    /// The branch ref is advanced without force, so a push made by
    /// someone else in the meantime fails the commit instead of being
    /// overwritten. Blobs uploaded before a failure stay on the provider
    /// as unreferenced objects.
    pub fn commit(&mut self, message: &str) -> SyncResult<CommitOutcome> {
        info!("checking local changes");
        let state = self.link_state()?;
        let tracked = self.tracked_snapshot()?;
        let changes = self.local_changes_against(&tracked)?;

        if !changes.has_changes() {
            return Err(SyncError::NothingToCommit);
        }

        info!("checking state of remote repository");
        self.ensure_remote_exists()?;

        let (parent, bootstrapped) = match self.remote.branch_head(&state.branch)? {
            None => {
                if self.remote.branch_count()? > 0 {
                    return Err(SyncError::BranchMissingRemotely {
                        branch: state.branch.clone(),
                    });
                }
                info!(branch = %state.branch, "creating initial empty commit");
                (self.bootstrap_branch(&state.branch)?, true)
            }
            Some(head) => {
                if state.last_synced_commit.as_deref() != Some(head.as_str()) {
                    return Err(SyncError::OutOfDate);
                }
                (head, false)
            }
        };

        let to_upload = changes.added_or_modified();
        let mut uploaded = Vec::with_capacity(to_upload.len());
        if !to_upload.is_empty() {
            info!(files = to_upload.len(), "pushing new and changed files");
        }
        for path in &to_upload {
            info!(path = %path, "uploading");
            let data = self.workspace.read(path)?;
            let hash = self.remote.create_blob(&data)?;
            uploaded.push(FileReference::new(path.clone(), hash, data.len() as u64));
        }

        let mut snapshot = tracked.without(changes.changed().iter());
        for reference in &uploaded {
            snapshot.insert(reference.clone());
        }

        info!(files = snapshot.len(), "creating remote tree");
        let tree = self.remote.create_tree(&snapshot.to_references())?;

        info!("creating commit");
        let commit = self.remote.create_commit(
            message,
            &tree,
            Some(&parent),
            self.config.author.as_ref(),
        )?;

        info!(branch = %state.branch, commit = %commit, "updating branch reference");
        self.remote.set_branch_head(&state.branch, &commit, false)?;

        for reference in &uploaded {
            self.workspace.mark_unmodified(&reference.path)?;
        }
        let synced = RepositoryLinkState::new(
            state.repository,
            state.branch,
            Some(commit.clone()),
        );
        self.persist(&synced, &snapshot)?;

        Ok(CommitOutcome {
            commit,
            uploaded: uploaded.into_iter().map(|r| r.path).collect(),
            deleted: changes.deleted.into_iter().collect(),
            bootstrapped,
        })
    }

    /// Gives an empty repository its first commit on `branch`.
    ///
    /// The provider refuses git-object calls on a repository without any
    /// object, so a placeholder file is created through the content API
    /// first. The branch is then force-set to a commit of the empty tree.
    pub(crate) fn bootstrap_branch(&self, branch: &str) -> SyncResult<String> {
        self.remote.create_file(
            &self.config.placeholder_file,
            branch,
            &self.config.placeholder_message,
            &[0],
        )?;
        let commit = self.remote.create_commit(
            &self.config.bootstrap_message,
            EMPTY_TREE_HASH,
            None,
            self.config.author.as_ref(),
        )?;
        self.remote.set_branch_head(branch, &commit, true)?;
        Ok(commit)
    }
}
