//! Repository handle: clone, link, unlink and status.

use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteRepository, EMPTY_TREE_HASH};
use crate::state::{CloneOutcome, LinkOutcome, PullState, RemoteStatus, StatusReport};
use ngh_core::ledger::{decode_state, decode_tree, encode_state, encode_tree};
use ngh_core::{detect_local_changes, ChangeSet, RepositoryLinkState, TreeSnapshot};
use ngh_storage::{LedgerKind, Workspace};
use tracing::{debug, info};

/// Reads the state ledger of `workspace`, if linked.
///
/// Used to find out which remote repository to talk to before a
/// [`Repository`] can be built.
pub fn load_link_state<W: Workspace>(workspace: &W) -> SyncResult<Option<RepositoryLinkState>> {
    match workspace.load_ledger(LedgerKind::State)? {
        Some(text) => Ok(Some(decode_state(&text)?)),
        None => Ok(None),
    }
}

/// Repository ids are compared the way the provider resolves them,
/// ignoring case.
pub(crate) fn same_repository(recorded: &str, requested: &str) -> bool {
    recorded.eq_ignore_ascii_case(requested)
}

/// A working directory paired with the remote repository it mirrors.
///
/// Every operation goes through this handle; there is no global
/// "current repository". Ledgers are read at the start of each operation
/// and rewritten only by its final step.
pub struct Repository<R: RemoteRepository, W: Workspace> {
    pub(crate) remote: R,
    pub(crate) workspace: W,
    pub(crate) config: EngineConfig,
    pub(crate) pull_state: PullState,
}

impl<R: RemoteRepository, W: Workspace> Repository<R, W> {
    /// Creates a handle.
    pub fn new(remote: R, workspace: W, config: EngineConfig) -> Self {
        Self {
            remote,
            workspace,
            config,
            pull_state: PullState::Idle,
        }
    }

    /// The remote repository.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The working directory.
    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Phase of the running pull, `Idle` between operations.
    pub fn pull_state(&self) -> PullState {
        self.pull_state
    }

    /// Splits the handle into its collaborators.
    pub fn into_parts(self) -> (R, W) {
        (self.remote, self.workspace)
    }

    /// Reads the state ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotLinked`] if the working directory has none.
    pub fn link_state(&self) -> SyncResult<RepositoryLinkState> {
        load_link_state(&self.workspace)?.ok_or_else(|| SyncError::NotLinked {
            path: self.workspace.location(),
        })
    }

    /// Reads the tree ledger. A missing ledger is an empty snapshot.
    pub fn tracked_snapshot(&self) -> SyncResult<TreeSnapshot> {
        match self.workspace.load_ledger(LedgerKind::Tree)? {
            Some(text) => Ok(decode_tree(&text)?),
            None => Ok(TreeSnapshot::new()),
        }
    }

    /// Local changes against the tree ledger.
    pub fn local_changes(&self) -> SyncResult<ChangeSet> {
        let tracked = self.tracked_snapshot()?;
        self.local_changes_against(&tracked)
    }

    pub(crate) fn local_changes_against(&self, tracked: &TreeSnapshot) -> SyncResult<ChangeSet> {
        let files = self.workspace.list_files()?;
        let workspace = &self.workspace;
        Ok(detect_local_changes(tracked, files, |path| {
            workspace.is_modified(path)
        })?)
    }

    /// Full file listing of the tree of `commit`.
    pub(crate) fn remote_snapshot(&self, commit: &str) -> SyncResult<TreeSnapshot> {
        let tree = self
            .remote
            .commit_tree(commit)?
            .ok_or_else(|| SyncError::UnknownCommit {
                commit: commit.to_string(),
            })?;
        if tree == EMPTY_TREE_HASH {
            return Ok(TreeSnapshot::new());
        }
        let files = self.remote.tree_files(&tree, true)?;
        debug!(commit, tree = %tree, files = files.len(), "fetched remote tree");
        Ok(TreeSnapshot::from_references(files))
    }

    /// The repository id as the provider spells it.
    pub(crate) fn canonical_name(&self) -> SyncResult<String> {
        self.remote
            .full_name()?
            .ok_or_else(|| SyncError::RemoteRepositoryMissing {
                repository: self.remote.name().to_string(),
            })
    }

    pub(crate) fn ensure_remote_exists(&self) -> SyncResult<()> {
        if self.remote.repository_exists()? {
            Ok(())
        } else {
            Err(SyncError::RemoteRepositoryMissing {
                repository: self.remote.name().to_string(),
            })
        }
    }

    /// Rewrites both ledgers.
    pub(crate) fn write_ledgers(
        &mut self,
        state: &RepositoryLinkState,
        tree: &TreeSnapshot,
    ) -> SyncResult<()> {
        self.workspace
            .replace_ledgers(&encode_state(state), &encode_tree(tree))?;
        Ok(())
    }

    /// Final step of every successful operation: ledgers, then markers.
    pub(crate) fn persist(
        &mut self,
        state: &RepositoryLinkState,
        tree: &TreeSnapshot,
    ) -> SyncResult<()> {
        self.write_ledgers(state, tree)?;
        self.workspace.persist_markers()?;
        info!(
            repository = %state.repository,
            branch = %state.branch,
            commit = state.last_synced_commit.as_deref().unwrap_or(""),
            files = tree.len(),
            "local state updated"
        );
        Ok(())
    }

    /// Mirrors the default branch of the remote into the working directory.
    ///
    /// An interrupted clone of the same repository is continued: files
    /// already present with the expected size are not fetched again.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AlreadyLinked`] if linked to another repository
    /// - [`SyncError::DirectoryNotEmpty`] if unlinked and not empty
    /// - [`SyncError::RemoteEmpty`] if the repository has no commits
    pub fn clone_remote(&mut self) -> SyncResult<CloneOutcome> {
        let existing = load_link_state(&self.workspace)?;

        let (state, snapshot, resumed) = match existing {
            Some(state) if !same_repository(&state.repository, self.remote.name()) => {
                return Err(SyncError::AlreadyLinked {
                    path: self.workspace.location(),
                    repository: state.repository,
                });
            }
            Some(state) => {
                info!(repository = %state.repository, "already initialized, continuing the clone");
                let snapshot = self.tracked_snapshot()?;
                (state, snapshot, true)
            }
            None => {
                if self.workspace.root_has_contents()? {
                    return Err(SyncError::DirectoryNotEmpty {
                        path: self.workspace.location(),
                    });
                }
                info!(repository = %self.remote.name(), "getting repository information");
                let repository = self.canonical_name()?;
                if self.remote.branch_count()? == 0 {
                    return Err(SyncError::RemoteEmpty {
                        repository: self.remote.name().to_string(),
                    });
                }

                let branch = self.remote.default_branch()?;
                let head = self
                    .remote
                    .branch_head(&branch)?
                    .ok_or_else(|| SyncError::BranchMissingRemotely {
                        branch: branch.clone(),
                    })?;
                let snapshot = self.remote_snapshot(&head)?;
                let state = RepositoryLinkState::new(repository, branch, Some(head));

                // Written before downloading so an interrupted clone can resume.
                self.write_ledgers(&state, &snapshot)?;
                (state, snapshot, false)
            }
        };

        info!(branch = %state.branch, files = snapshot.len(), "getting files");
        let mut downloaded = Vec::new();
        let mut skipped = Vec::new();
        for reference in snapshot.iter() {
            if self.workspace.file_size(&reference.path)? == Some(reference.size) {
                debug!(path = %reference.path, "already exists, skipping");
                skipped.push(reference.path.clone());
                continue;
            }
            info!(path = %reference.path, "downloading");
            let data = self.remote.get_blob(&reference.blob_hash)?;
            self.workspace.write(&reference.path, &data)?;
            downloaded.push(reference.path.clone());
        }

        for path in snapshot.paths() {
            self.workspace.mark_unmodified(path)?;
        }
        self.workspace.persist_markers()?;

        Ok(CloneOutcome {
            branch: state.branch,
            commit: state.last_synced_commit,
            downloaded,
            skipped,
            resumed,
        })
    }

    /// Links the working directory to the remote without downloading.
    ///
    /// Every existing local file is flagged modified, so the next commit
    /// reconciles the directory with the remote tree.
    pub fn link(&mut self) -> SyncResult<LinkOutcome> {
        if let Some(state) = load_link_state(&self.workspace)? {
            return Err(SyncError::AlreadyLinked {
                path: self.workspace.location(),
                repository: state.repository,
            });
        }

        info!(repository = %self.remote.name(), "getting repository information");
        let repository = self.canonical_name()?;

        let (state, snapshot) = if self.remote.branch_count()? == 0 {
            let state =
                RepositoryLinkState::new(repository, self.config.unborn_branch.clone(), None);
            (state, TreeSnapshot::new())
        } else {
            let branch = self.remote.default_branch()?;
            let head = self
                .remote
                .branch_head(&branch)?
                .ok_or_else(|| SyncError::BranchMissingRemotely {
                    branch: branch.clone(),
                })?;
            let snapshot = self.remote_snapshot(&head)?;
            (RepositoryLinkState::new(repository, branch, Some(head)), snapshot)
        };

        let files = self.workspace.list_files()?;
        for path in &files {
            self.workspace.mark_modified(path)?;
        }

        self.persist(&state, &snapshot)?;

        Ok(LinkOutcome {
            branch: state.branch,
            commit: state.last_synced_commit,
            marked_modified: files.len(),
        })
    }

    /// Removes the link, leaving every file in place.
    pub fn unlink(&mut self) -> SyncResult<RepositoryLinkState> {
        let state = self.link_state()?;
        self.workspace.remove_metadata()?;
        info!(repository = %state.repository, "unlinked");
        Ok(state)
    }

    /// Reports local changes and the state of the tracked branch.
    ///
    /// A failure while querying the provider is reported in
    /// [`StatusReport::remote`] rather than returned.
    pub fn status(&self) -> SyncResult<StatusReport> {
        let state = self.link_state()?;
        let local = self.local_changes()?;

        let remote = match self.remote_status(&state) {
            Ok(status) => status,
            Err(err) => RemoteStatus::Unavailable(err.to_string()),
        };

        Ok(StatusReport {
            repository: state.repository,
            branch: state.branch,
            last_synced_commit: state.last_synced_commit,
            remote,
            local,
        })
    }

    fn remote_status(&self, state: &RepositoryLinkState) -> SyncResult<RemoteStatus> {
        if !self.remote.repository_exists()? {
            return Ok(RemoteStatus::RepositoryMissing);
        }
        Ok(match self.remote.branch_head(&state.branch)? {
            None => RemoteStatus::BranchMissing,
            Some(head) if Some(&head) == state.last_synced_commit.as_ref() => {
                RemoteStatus::UpToDate
            }
            Some(head) => RemoteStatus::Behind { remote_head: head },
        })
    }
}
