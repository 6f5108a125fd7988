//! In-memory remote repository for testing.

use crate::config::Author;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteRepository, EMPTY_TREE_HASH};
use ngh_core::FileReference;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Number of object-store calls made through [`RemoteRepository`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteStats {
    /// `create_blob` calls.
    pub blobs_created: usize,
    /// `create_tree` calls.
    pub trees_created: usize,
    /// `create_commit` calls.
    pub commits_created: usize,
    /// `get_blob` calls.
    pub blobs_fetched: usize,
    /// `tree_files` calls.
    pub trees_listed: usize,
    /// Successful `set_branch_head` calls.
    pub refs_updated: usize,
}

impl RemoteStats {
    /// Returns true if no object was created remotely.
    #[must_use]
    pub fn created_nothing(&self) -> bool {
        self.blobs_created == 0 && self.trees_created == 0 && self.commits_created == 0
    }
}

#[derive(Debug, Clone)]
struct CommitObject {
    tree: String,
    parents: Vec<String>,
}

#[derive(Debug)]
struct RemoteState {
    exists: bool,
    full_name: Option<String>,
    unreachable: bool,
    default_branch: Option<String>,
    branches: BTreeMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, Vec<FileReference>>,
    commits: HashMap<String, CommitObject>,
    sequence: u64,
    stats: RemoteStats,
}

impl RemoteState {
    fn new(exists: bool) -> Self {
        let mut trees = HashMap::new();
        trees.insert(EMPTY_TREE_HASH.to_string(), Vec::new());
        Self {
            exists,
            full_name: None,
            unreachable: false,
            default_branch: None,
            branches: BTreeMap::new(),
            blobs: HashMap::new(),
            trees,
            commits: HashMap::new(),
            sequence: 0,
            stats: RemoteStats::default(),
        }
    }

    fn check_reachable(&self) -> SyncResult<()> {
        if self.unreachable {
            return Err(SyncError::Transport("connection refused".into()));
        }
        if !self.exists {
            return Err(SyncError::remote(404, "Not Found"));
        }
        Ok(())
    }

    fn store_blob(&mut self, data: &[u8]) -> String {
        let hash = content_hash(&[b"blob", data]);
        self.blobs.insert(hash.clone(), data.to_vec());
        hash
    }

    fn store_tree(&mut self, files: &[FileReference]) -> SyncResult<String> {
        if files.is_empty() {
            return Ok(EMPTY_TREE_HASH.to_string());
        }
        let mut sorted: Vec<FileReference> = files.to_vec();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut lines = String::new();
        for file in &sorted {
            if !self.blobs.contains_key(&file.blob_hash) {
                return Err(SyncError::remote(
                    422,
                    format!("tree.sha {} is not a valid blob", file.blob_hash),
                ));
            }
            lines.push_str(&format!("{} {}\n", file.blob_hash, file.path));
        }

        let hash = content_hash(&[b"tree", lines.as_bytes()]);
        self.trees.insert(hash.clone(), sorted);
        Ok(hash)
    }

    fn store_commit(&mut self, message: &str, tree: &str, parents: Vec<String>) -> SyncResult<String> {
        if !self.trees.contains_key(tree) {
            return Err(SyncError::remote(422, format!("Tree SHA does not exist: {tree}")));
        }
        if let Some(parent) = parents.iter().find(|p| !self.commits.contains_key(*p)) {
            return Err(SyncError::remote(
                422,
                format!("Parent SHA does not exist or is not a commit object: {parent}"),
            ));
        }

        self.sequence += 1;
        let record = format!(
            "{tree}\n{}\n{message}\n{}",
            parents.join(" "),
            self.sequence
        );
        let hash = content_hash(&[b"commit", record.as_bytes()]);
        self.commits.insert(
            hash.clone(),
            CommitObject {
                tree: tree.to_string(),
                parents,
            },
        );
        Ok(hash)
    }

    fn descends_from(&self, commit: &str, ancestor: &str) -> bool {
        let mut pending = vec![commit.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(object) = self.commits.get(&current) {
                pending.extend(object.parents.iter().cloned());
            }
        }
        false
    }

    fn files_of_commit(&self, commit: &str) -> Vec<FileReference> {
        self.commits
            .get(commit)
            .and_then(|c| self.trees.get(&c.tree))
            .cloned()
            .unwrap_or_default()
    }

    /// Builds a commit on top of `branch` applying upserts and deletions.
    fn apply_change(
        &mut self,
        branch: &str,
        upserts: &[(&str, &[u8])],
        deletes: &[&str],
        message: &str,
    ) -> String {
        let parent = self.branches.get(branch).cloned();
        let mut files: BTreeMap<String, FileReference> = parent
            .as_deref()
            .map(|p| self.files_of_commit(p))
            .unwrap_or_default()
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect();

        for path in deletes {
            files.remove(*path);
        }
        for (path, data) in upserts {
            let hash = self.store_blob(data);
            files.insert(
                (*path).to_string(),
                FileReference::new(*path, hash, data.len() as u64),
            );
        }

        let references: Vec<FileReference> = files.into_values().collect();
        // Every blob was stored above, so neither store can fail.
        let tree = self
            .store_tree(&references)
            .unwrap_or_else(|_| EMPTY_TREE_HASH.to_string());
        let commit = self
            .store_commit(message, &tree, parent.into_iter().collect())
            .unwrap_or_default();

        self.branches.insert(branch.to_string(), commit.clone());
        if self.default_branch.is_none() {
            self.default_branch = Some(branch.to_string());
        }
        commit
    }
}

fn content_hash(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();
    // Truncated to the length of a Git object id.
    digest
        .iter()
        .take(20)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// A complete content-addressed provider held in memory.
///
/// Clones share the same repository, so a test can seed and inspect the
/// remote while the engine owns another handle.
///
/// # Example
///
/// ```rust
/// use ngh_sync_engine::{MemoryRemote, RemoteRepository};
///
/// let remote = MemoryRemote::new("octo/demo");
/// let head = remote.seed_commit("main", &[("readme.md", b"hello")]);
/// assert_eq!(remote.branch_head("main").unwrap(), Some(head));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    name: String,
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemote {
    /// Creates an existing repository without branches.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(RemoteState::new(true))),
        }
    }

    /// Creates a handle to a repository that does not exist.
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(RemoteState::new(false))),
        }
    }

    /// Another handle to the same repository, addressed as `name`.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::clone(&self.state),
        }
    }

    /// Pushes a commit whose tree is exactly `files` onto `branch`.
    pub fn seed_commit(&self, branch: &str, files: &[(&str, &[u8])]) -> String {
        let mut state = self.state.lock();
        let existing: Vec<String> = state
            .branches
            .get(branch)
            .map(|head| state.files_of_commit(head))
            .unwrap_or_default()
            .into_iter()
            .map(|f| f.path)
            .collect();
        let deletes: Vec<&str> = existing.iter().map(String::as_str).collect();
        state.apply_change(branch, files, &deletes, "seed")
    }

    /// Pushes a commit onto `branch` that upserts and deletes some files.
    pub fn seed_change(&self, branch: &str, upserts: &[(&str, &[u8])], deletes: &[&str]) -> String {
        self.state
            .lock()
            .apply_change(branch, upserts, deletes, "change")
    }

    /// Simulates another client pushing to `branch`.
    pub fn move_branch_behind_our_back(&self, branch: &str) -> String {
        self.state
            .lock()
            .apply_change(branch, &[], &[], "concurrent push")
    }

    /// Sets the default branch.
    pub fn set_default_branch(&self, branch: &str) {
        self.state.lock().default_branch = Some(branch.to_string());
    }

    /// Makes the provider report `full_name` as the repository id,
    /// the way GitHub fixes the casing of a name typed by the user.
    pub fn set_full_name(&self, full_name: &str) {
        self.state.lock().full_name = Some(full_name.to_string());
    }

    /// Makes every call fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    /// Call counters.
    #[must_use]
    pub fn stats(&self) -> RemoteStats {
        self.state.lock().stats
    }

    /// Resets the call counters.
    pub fn reset_stats(&self) {
        self.state.lock().stats = RemoteStats::default();
    }

    /// Head of `branch`, without touching the counters.
    #[must_use]
    pub fn head(&self, branch: &str) -> Option<String> {
        self.state.lock().branches.get(branch).cloned()
    }

    /// Path to content map of the tree of `commit`.
    #[must_use]
    pub fn files_at(&self, commit: &str) -> BTreeMap<String, Vec<u8>> {
        let state = self.state.lock();
        state
            .files_of_commit(commit)
            .into_iter()
            .filter_map(|f| state.blobs.get(&f.blob_hash).map(|d| (f.path, d.clone())))
            .collect()
    }

    /// Parents of `commit`.
    #[must_use]
    pub fn parents_of(&self, commit: &str) -> Vec<String> {
        self.state
            .lock()
            .commits
            .get(commit)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }
}

impl RemoteRepository for MemoryRemote {
    fn name(&self) -> &str {
        &self.name
    }

    fn repository_exists(&self) -> SyncResult<bool> {
        let state = self.state.lock();
        if state.unreachable {
            return Err(SyncError::Transport("connection refused".into()));
        }
        Ok(state.exists)
    }

    fn full_name(&self) -> SyncResult<Option<String>> {
        let state = self.state.lock();
        if state.unreachable {
            return Err(SyncError::Transport("connection refused".into()));
        }
        Ok(state
            .exists
            .then(|| state.full_name.clone().unwrap_or_else(|| self.name.clone())))
    }

    fn create_repository(&self, _description: &str, _private: bool) -> SyncResult<String> {
        let mut state = self.state.lock();
        if state.unreachable {
            return Err(SyncError::Transport("connection refused".into()));
        }
        if state.exists {
            return Err(SyncError::remote(422, "name already exists on this account"));
        }
        *state = RemoteState::new(true);
        Ok(self.name.clone())
    }

    fn delete_repository(&self) -> SyncResult<()> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        let stats = state.stats;
        *state = RemoteState::new(false);
        state.stats = stats;
        Ok(())
    }

    fn default_branch(&self) -> SyncResult<String> {
        let state = self.state.lock();
        state.check_reachable()?;
        Ok(state
            .default_branch
            .clone()
            .unwrap_or_else(|| "main".to_string()))
    }

    fn list_branches(&self) -> SyncResult<Vec<String>> {
        let state = self.state.lock();
        state.check_reachable()?;
        Ok(state.branches.keys().cloned().collect())
    }

    fn branch_head(&self, branch: &str) -> SyncResult<Option<String>> {
        let state = self.state.lock();
        state.check_reachable()?;
        Ok(state.branches.get(branch).cloned())
    }

    fn set_branch_head(&self, branch: &str, commit: &str, force: bool) -> SyncResult<()> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        if !state.commits.contains_key(commit) {
            return Err(SyncError::remote(422, "Object does not exist"));
        }
        match state.branches.get(branch) {
            None => {
                // An empty repository accepts its first ref through an update.
                if !state.branches.is_empty() {
                    return Err(SyncError::remote(422, "Reference does not exist"));
                }
            }
            Some(current) => {
                if !force && !state.descends_from(commit, current) {
                    return Err(SyncError::remote(422, "Update is not a fast forward"));
                }
            }
        }
        state.branches.insert(branch.to_string(), commit.to_string());
        if state.default_branch.is_none() {
            state.default_branch = Some(branch.to_string());
        }
        state.stats.refs_updated += 1;
        Ok(())
    }

    fn create_branch(&self, branch: &str, commit: &str) -> SyncResult<()> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        if state.branches.contains_key(branch) {
            return Err(SyncError::remote(422, "Reference already exists"));
        }
        if !state.commits.contains_key(commit) {
            return Err(SyncError::remote(422, "Object does not exist"));
        }
        state.branches.insert(branch.to_string(), commit.to_string());
        if state.default_branch.is_none() {
            state.default_branch = Some(branch.to_string());
        }
        Ok(())
    }

    fn delete_branch(&self, branch: &str) -> SyncResult<()> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        if state.branches.remove(branch).is_none() {
            return Err(SyncError::remote(422, "Reference does not exist"));
        }
        Ok(())
    }

    fn commit_tree(&self, commit: &str) -> SyncResult<Option<String>> {
        let state = self.state.lock();
        state.check_reachable()?;
        Ok(state.commits.get(commit).map(|c| c.tree.clone()))
    }

    fn tree_files(&self, tree: &str, recursive: bool) -> SyncResult<Vec<FileReference>> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        state.stats.trees_listed += 1;
        let files = state
            .trees
            .get(tree)
            .cloned()
            .ok_or_else(|| SyncError::remote(404, "Not Found"))?;
        Ok(files
            .into_iter()
            .filter(|f| recursive || !f.path.contains('/'))
            .collect())
    }

    fn get_blob(&self, hash: &str) -> SyncResult<Vec<u8>> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        state.stats.blobs_fetched += 1;
        state
            .blobs
            .get(hash)
            .cloned()
            .ok_or_else(|| SyncError::remote(404, "Not Found"))
    }

    fn create_blob(&self, data: &[u8]) -> SyncResult<String> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        state.stats.blobs_created += 1;
        Ok(state.store_blob(data))
    }

    fn create_tree(&self, files: &[FileReference]) -> SyncResult<String> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        state.stats.trees_created += 1;
        state.store_tree(files)
    }

    fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: Option<&str>,
        _author: Option<&Author>,
    ) -> SyncResult<String> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        state.stats.commits_created += 1;
        state.store_commit(message, tree, parent.map(str::to_string).into_iter().collect())
    }

    fn create_file(&self, path: &str, branch: &str, message: &str, data: &[u8]) -> SyncResult<()> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        state.apply_change(branch, &[(path, data)], &[], message);
        Ok(())
    }

    fn merge_branches(&self, source: &str, base: &str, message: &str) -> SyncResult<()> {
        let mut state = self.state.lock();
        state.check_reachable()?;
        let source_head = state
            .branches
            .get(source)
            .cloned()
            .ok_or_else(|| SyncError::remote(404, "Head does not exist"))?;
        let base_head = state
            .branches
            .get(base)
            .cloned()
            .ok_or_else(|| SyncError::remote(404, "Base does not exist"))?;

        if state.descends_from(&base_head, &source_head) {
            return Ok(());
        }
        if state.descends_from(&source_head, &base_head) {
            state.branches.insert(base.to_string(), source_head);
            return Ok(());
        }

        // No content merge: files of the source win over the base.
        let mut files: BTreeMap<String, FileReference> = state
            .files_of_commit(&base_head)
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect();
        for file in state.files_of_commit(&source_head) {
            files.insert(file.path.clone(), file);
        }
        let references: Vec<FileReference> = files.into_values().collect();
        let tree = state.store_tree(&references)?;
        let commit = state.store_commit(message, &tree, vec![base_head, source_head])?;
        state.branches.insert(base.to_string(), commit);
        Ok(())
    }
}
