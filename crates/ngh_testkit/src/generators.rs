//! Property-based test generators using proptest.
//!
//! Provides strategies for generating snapshots and change sets that
//! respect the model's invariants.

use ngh_core::{ChangeSet, FileReference, TreeSnapshot};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Strategy for generating normalized relative paths without spaces.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}(/[a-z]{1,6}){0,2}(\\.[a-z]{1,3})?")
        .expect("Invalid regex")
}

/// Strategy for generating blob hashes.
pub fn blob_hash_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9a-f]{40}").expect("Invalid regex")
}

/// Strategy for generating file references.
pub fn file_reference_strategy() -> impl Strategy<Value = FileReference> {
    (path_strategy(), blob_hash_strategy(), 0u64..1_000_000)
        .prop_map(|(path, hash, size)| FileReference::new(path, hash, size))
}

/// Strategy for generating snapshots of up to `max_files` files.
pub fn snapshot_strategy(max_files: usize) -> impl Strategy<Value = TreeSnapshot> {
    prop::collection::vec(file_reference_strategy(), 0..=max_files)
        .prop_map(TreeSnapshot::from_references)
}

/// Strategy for generating an old snapshot and an evolution of it.
///
/// Paths of the old snapshot are kept, rehashed or dropped, and new paths
/// are added, so all four classifications show up.
pub fn snapshot_pair_strategy() -> impl Strategy<Value = (TreeSnapshot, TreeSnapshot)> {
    (
        snapshot_strategy(16),
        prop::collection::vec(0u8..3, 16),
        snapshot_strategy(6),
        blob_hash_strategy(),
    )
        .prop_map(|(old, fates, extra, fresh_hash)| {
            let mut new = TreeSnapshot::new();
            for (reference, fate) in old.iter().zip(fates.iter().cycle()) {
                match fate {
                    0 => {
                        new.insert(reference.clone());
                    }
                    1 => {
                        new.insert(FileReference::new(
                            reference.path.clone(),
                            fresh_hash.clone(),
                            reference.size,
                        ));
                    }
                    _ => {}
                }
            }
            for reference in extra.iter() {
                if !old.contains(&reference.path) {
                    new.insert(reference.clone());
                }
            }
            (old, new)
        })
}

/// Strategy for generating a tracked snapshot with a consistent local change set.
///
/// The change set's sets are disjoint and refer to tracked paths, except
/// `added`, which never does.
pub fn local_changes_strategy() -> impl Strategy<Value = (TreeSnapshot, ChangeSet)> {
    (
        snapshot_strategy(12),
        prop::collection::vec(0u8..3, 12),
        prop::collection::btree_set(path_strategy(), 0..4),
    )
        .prop_map(|(tracked, fates, added)| {
            let mut changes = ChangeSet::default();
            for (path, fate) in tracked.paths().zip(fates.iter().cycle()) {
                let set = match fate {
                    0 => &mut changes.unchanged,
                    1 => &mut changes.modified,
                    _ => &mut changes.deleted,
                };
                set.insert(path.to_string());
            }
            changes.added = added
                .into_iter()
                .filter(|p| !tracked.contains(p))
                .collect::<BTreeSet<_>>();
            (tracked, changes)
        })
}

/// Strategy for generating repository contents (path to bytes).
pub fn files_strategy(max_files: usize) -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        path_strategy(),
        prop::collection::vec(any::<u8>(), 0..64),
        0..=max_files,
    )
    .prop_filter("a path must not also be a directory", |files| {
        files
            .keys()
            .all(|p| !files.keys().any(|q| q.starts_with(&format!("{p}/"))))
    })
}
