//! Snapshot data model.

use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, BTreeSet};

/// A file as recorded in a tree snapshot.
///
/// The path is relative to the repository root and always uses `/` as
/// separator. The blob hash is an opaque content address assigned by the
/// remote provider. The size is informational only: it never takes part
/// in equality checks between snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileReference {
    /// Root-relative slash-separated path.
    pub path: String,
    /// Content address of the blob.
    pub blob_hash: String,
    /// Size of the blob in bytes.
    pub size: u64,
}

impl FileReference {
    /// Creates a new file reference.
    pub fn new(path: impl Into<String>, blob_hash: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            blob_hash: blob_hash.into(),
            size,
        }
    }

    /// Normalizes a relative path to the form used in snapshots.
    ///
    /// Backslashes become slashes, leading `./` and `/` are stripped and
    /// repeated separators collapse. Empty paths and paths escaping the
    /// root through `..` are rejected.
    pub fn normalize_path(path: &str) -> CoreResult<String> {
        let replaced = path.replace('\\', "/");
        let mut parts = Vec::new();
        for part in replaced.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    return Err(CoreError::InvalidPath {
                        path: path.to_string(),
                    })
                }
                other => parts.push(other),
            }
        }

        if parts.is_empty() {
            return Err(CoreError::InvalidPath {
                path: path.to_string(),
            });
        }

        Ok(parts.join("/"))
    }
}

/// A set of file references, unique by path.
///
/// Represents either the remote content at a commit or the content that
/// was last synced locally (the `tree` ledger). Iteration is ordered by
/// path so encoding and diffing are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    files: BTreeMap<String, FileReference>,
}

impl TreeSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from references. A later reference for the same
    /// path replaces an earlier one.
    pub fn from_references(references: impl IntoIterator<Item = FileReference>) -> Self {
        let mut snapshot = Self::new();
        for reference in references {
            snapshot.insert(reference);
        }
        snapshot
    }

    /// Inserts a reference, returning the one it replaced.
    pub fn insert(&mut self, reference: FileReference) -> Option<FileReference> {
        self.files.insert(reference.path.clone(), reference)
    }

    /// Removes the reference for `path`.
    pub fn remove(&mut self, path: &str) -> Option<FileReference> {
        self.files.remove(path)
    }

    /// Looks up the reference for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileReference> {
        self.files.get(path)
    }

    /// Returns true if `path` is tracked.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no file is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates references in path order.
    pub fn iter(&self) -> impl Iterator<Item = &FileReference> {
        self.files.values()
    }

    /// Iterates paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Returns all references in path order.
    #[must_use]
    pub fn to_references(&self) -> Vec<FileReference> {
        self.files.values().cloned().collect()
    }

    /// Returns a snapshot without the given paths.
    #[must_use]
    pub fn without<'a>(&self, paths: impl IntoIterator<Item = &'a String>) -> Self {
        let mut result = self.clone();
        for path in paths {
            result.files.remove(path);
        }
        result
    }
}

impl FromIterator<FileReference> for TreeSnapshot {
    fn from_iter<I: IntoIterator<Item = FileReference>>(iter: I) -> Self {
        Self::from_references(iter)
    }
}

/// Which remote repository and branch a working directory mirrors.
///
/// When `last_synced_commit` is present, the tree of that commit equals
/// the persisted [`TreeSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLinkState {
    /// Remote repository id (`owner/name`).
    pub repository: String,
    /// Branch tracked by this working copy.
    pub branch: String,
    /// Commit the working copy was last synced to.
    pub last_synced_commit: Option<String>,
}

impl RepositoryLinkState {
    /// Creates a link state.
    pub fn new(
        repository: impl Into<String>,
        branch: impl Into<String>,
        last_synced_commit: Option<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            branch: branch.into(),
            last_synced_commit,
        }
    }
}

/// Classification of paths into added, modified, deleted and unchanged.
///
/// The four sets are disjoint. Together they cover every path of the
/// old snapshot and of the current state that was compared against it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Paths present now but not before.
    pub added: BTreeSet<String>,
    /// Paths present in both with different content.
    pub modified: BTreeSet<String>,
    /// Paths present before but not now.
    pub deleted: BTreeSet<String>,
    /// Paths present in both with the same content.
    pub unchanged: BTreeSet<String>,
}

impl ChangeSet {
    /// Returns true if anything was added, modified or deleted.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.deleted.is_empty()
    }

    /// Union of added, modified and deleted paths.
    #[must_use]
    pub fn changed(&self) -> BTreeSet<String> {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.deleted)
            .cloned()
            .collect()
    }

    /// Union of added and modified paths, the ones whose content must travel.
    #[must_use]
    pub fn added_or_modified(&self) -> BTreeSet<String> {
        self.added.union(&self.modified).cloned().collect()
    }

    /// Every path covered by the change set.
    #[must_use]
    pub fn all_paths(&self) -> BTreeSet<String> {
        let mut all = self.changed();
        all.extend(self.unchanged.iter().cloned());
        all
    }
}
