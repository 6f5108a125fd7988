//! Workspace trait definition.

use crate::error::StoreResult;
use ngh_core::ledger::{STATE_LEDGER, TREE_LEDGER};

/// The two ledgers persisted in the metadata directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerKind {
    /// Repository id, tracked branch and last synced commit.
    State,
    /// The last synced tree snapshot.
    Tree,
}

impl LedgerKind {
    /// File name of the ledger inside the metadata directory.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self {
            LedgerKind::State => STATE_LEDGER,
            LedgerKind::Tree => TREE_LEDGER,
        }
    }
}

/// A working directory mirrored from a remote repository.
///
/// Workspaces are addressed by root-relative, slash-separated paths.
/// They own the modification marker of every file and the persisted
/// ledgers, but never interpret ledger contents.
///
/// # Invariants
///
/// - `write` sets the modification marker of the written path
/// - `mark_unmodified` is the only way to clear a marker
/// - `list_files` never reports anything under the metadata directory
/// - `replace_ledger` leaves either the old or the new ledger on disk,
///   never a partial one
/// - `replace_ledgers` replaces both ledgers or neither
/// - Marker changes become durable only through `persist_markers`
///
/// # Implementors
///
/// - [`super::DiskWorkspace`] - A real directory
/// - [`super::MemoryWorkspace`] - For testing
pub trait Workspace {
    /// Human-readable location, for messages.
    fn location(&self) -> String;

    /// Returns true if the root holds anything besides the metadata directory.
    fn root_has_contents(&self) -> StoreResult<bool>;

    /// Returns true if `path` is an existing file.
    fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Size of the file at `path`, or `None` if it does not exist.
    fn file_size(&self, path: &str) -> StoreResult<Option<u64>>;

    /// Reads the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::NotFound`] if the file does not exist.
    fn read(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Creates or replaces the file at `path`, creating parent directories.
    fn write(&mut self, path: &str, data: &[u8]) -> StoreResult<()>;

    /// Deletes the file at `path`. Deleting a missing file is not an error.
    fn delete(&mut self, path: &str) -> StoreResult<()>;

    /// Every file in the working directory, sorted, metadata excluded.
    fn list_files(&self) -> StoreResult<Vec<String>>;

    /// Reads the modification marker of `path`.
    fn is_modified(&self, path: &str) -> StoreResult<bool>;

    /// Sets the modification marker of `path`.
    fn mark_modified(&mut self, path: &str) -> StoreResult<()>;

    /// Clears the modification marker of `path`.
    fn mark_unmodified(&mut self, path: &str) -> StoreResult<()>;

    /// Makes pending marker changes durable.
    fn persist_markers(&mut self) -> StoreResult<()>;

    /// Returns true if the working directory holds a state ledger.
    fn is_linked(&self) -> StoreResult<bool>;

    /// Reads a ledger, or `None` if it was never written.
    fn load_ledger(&self, kind: LedgerKind) -> StoreResult<Option<String>>;

    /// Atomically replaces a ledger with `contents`.
    fn replace_ledger(&mut self, kind: LedgerKind, contents: &str) -> StoreResult<()>;

    /// Replaces the state and tree ledgers together.
    ///
    /// On error both ledgers keep their previous contents.
    fn replace_ledgers(&mut self, state: &str, tree: &str) -> StoreResult<()>;

    /// Removes the metadata directory, leaving the files untouched.
    fn remove_metadata(&mut self) -> StoreResult<()>;
}
