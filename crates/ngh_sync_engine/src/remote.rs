//! Remote object-store abstraction.

use crate::config::Author;
use crate::error::SyncResult;
use ngh_core::FileReference;

/// Hash of the tree with no entries, known to every Git provider.
pub const EMPTY_TREE_HASH: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// The object-store API of one remote repository.
///
/// Every call is a blocking request that returns a result or a typed
/// failure. Objects (blobs, trees, commits) are immutable and
/// content-addressed; branch refs are the only mutable state.
///
/// # Implementors
///
/// - [`crate::GithubRemote`] - REST adapter over an [`crate::HttpClient`]
/// - [`crate::MemoryRemote`] - In-memory provider for testing
pub trait RemoteRepository {
    /// Repository id (`owner/name`).
    fn name(&self) -> &str;

    /// Returns true if the repository exists and is visible.
    fn repository_exists(&self) -> SyncResult<bool>;

    /// The `owner/name` id as cased by the provider, or `None` if the
    /// repository does not exist.
    fn full_name(&self) -> SyncResult<Option<String>> {
        Ok(self
            .repository_exists()?
            .then(|| self.name().to_string()))
    }

    /// Creates the repository, returning its full name.
    fn create_repository(&self, description: &str, private: bool) -> SyncResult<String>;

    /// Deletes the repository with everything in it.
    fn delete_repository(&self) -> SyncResult<()>;

    /// Name of the default branch.
    fn default_branch(&self) -> SyncResult<String>;

    /// Names of every branch, in provider order.
    fn list_branches(&self) -> SyncResult<Vec<String>>;

    /// Number of branches.
    fn branch_count(&self) -> SyncResult<usize> {
        Ok(self.list_branches()?.len())
    }

    /// Head commit of `branch`, or `None` if the branch does not exist.
    fn branch_head(&self, branch: &str) -> SyncResult<Option<String>>;

    /// Moves `branch` to `commit`.
    ///
    /// A non-forced update is refused unless it is a fast-forward, which
    /// is how a concurrent push is detected.
    fn set_branch_head(&self, branch: &str, commit: &str, force: bool) -> SyncResult<()>;

    /// Creates `branch` pointing to `commit`.
    fn create_branch(&self, branch: &str, commit: &str) -> SyncResult<()>;

    /// Deletes `branch`.
    fn delete_branch(&self, branch: &str) -> SyncResult<()>;

    /// Tree of `commit`, or `None` if the commit is unknown.
    fn commit_tree(&self, commit: &str) -> SyncResult<Option<String>>;

    /// Files of `tree`. Subtrees are expanded when `recursive` is set.
    fn tree_files(&self, tree: &str, recursive: bool) -> SyncResult<Vec<FileReference>>;

    /// Contents of a blob.
    fn get_blob(&self, hash: &str) -> SyncResult<Vec<u8>>;

    /// Stores a blob and returns its hash.
    fn create_blob(&self, data: &[u8]) -> SyncResult<String>;

    /// Stores a tree holding exactly `files` and returns its hash.
    fn create_tree(&self, files: &[FileReference]) -> SyncResult<String>;

    /// Stores a commit and returns its hash.
    fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: Option<&str>,
        author: Option<&Author>,
    ) -> SyncResult<String>;

    /// Creates a file through the provider's content API.
    ///
    /// Only used to give an empty repository its first object.
    fn create_file(&self, path: &str, branch: &str, message: &str, data: &[u8]) -> SyncResult<()>;

    /// Merges `source` into `base` on the provider side.
    fn merge_branches(&self, source: &str, base: &str, message: &str) -> SyncResult<()>;
}
