//! Local and remote change detection.

use crate::model::{ChangeSet, TreeSnapshot};
use std::collections::BTreeSet;
use tracing::debug;

/// Classifies local files against the last synced snapshot.
///
/// `local_files` is the enumeration of the working directory (metadata
/// directory excluded). `is_modified` reports the modification marker of
/// a path. The marker is the only change signal: no content is hashed,
/// so a byte-identical rewrite is still reported as modified.
///
/// - absent from `tracked` → added
/// - tracked and marked → modified
/// - tracked and not marked → unchanged
/// - tracked but not enumerated → deleted
pub fn detect_local_changes<I, F, E>(
    tracked: &TreeSnapshot,
    local_files: I,
    mut is_modified: F,
) -> Result<ChangeSet, E>
where
    I: IntoIterator<Item = String>,
    F: FnMut(&str) -> Result<bool, E>,
{
    let mut changes = ChangeSet::default();
    let mut seen = BTreeSet::new();

    for path in local_files {
        if !seen.insert(path.clone()) {
            continue;
        }

        if !tracked.contains(&path) {
            debug!(path = %path, "local file added");
            changes.added.insert(path);
        } else if is_modified(&path)? {
            debug!(path = %path, "local file modified");
            changes.modified.insert(path);
        } else {
            changes.unchanged.insert(path);
        }
    }

    for path in tracked.paths() {
        if !seen.contains(path) {
            debug!(path = %path, "local file deleted");
            changes.deleted.insert(path.to_string());
        }
    }

    Ok(changes)
}

/// Classifies paths between two snapshots by blob hash equality.
///
/// Sizes are ignored: two references with the same hash are unchanged
/// whatever their recorded sizes.
#[must_use]
pub fn detect_remote_changes(old: &TreeSnapshot, new: &TreeSnapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for reference in new.iter() {
        match old.get(&reference.path) {
            None => {
                changes.added.insert(reference.path.clone());
            }
            Some(previous) if previous.blob_hash != reference.blob_hash => {
                changes.modified.insert(reference.path.clone());
            }
            Some(_) => {
                changes.unchanged.insert(reference.path.clone());
            }
        }
    }

    for path in old.paths() {
        if !new.contains(path) {
            changes.deleted.insert(path.to_string());
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileReference;
    use proptest::prelude::*;
    use std::convert::Infallible;

    fn snapshot(entries: &[(&str, &str)]) -> TreeSnapshot {
        entries
            .iter()
            .map(|(path, hash)| FileReference::new(*path, *hash, 1))
            .collect()
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn local_classification() {
        let tracked = snapshot(&[("a.txt", "1"), ("b.txt", "2"), ("gone.txt", "3")]);
        let local = vec!["a.txt".to_string(), "b.txt".to_string(), "new.txt".to_string()];
        let marked = set(&["b.txt", "new.txt"]);

        let changes =
            detect_local_changes(&tracked, local, |p| Ok::<_, Infallible>(marked.contains(p)))
                .unwrap();

        assert_eq!(changes.added, set(&["new.txt"]));
        assert_eq!(changes.modified, set(&["b.txt"]));
        assert_eq!(changes.deleted, set(&["gone.txt"]));
        assert_eq!(changes.unchanged, set(&["a.txt"]));
    }

    #[test]
    fn local_marker_is_only_signal() {
        // Same tracked content, marker set: still modified.
        let tracked = snapshot(&[("a.txt", "1")]);
        let changes =
            detect_local_changes(&tracked, vec!["a.txt".to_string()], |_| {
                Ok::<_, Infallible>(true)
            })
            .unwrap();
        assert_eq!(changes.modified, set(&["a.txt"]));
    }

    #[test]
    fn local_marker_errors_propagate() {
        let tracked = snapshot(&[("a.txt", "1")]);
        let result = detect_local_changes(&tracked, vec!["a.txt".to_string()], |_| {
            Err::<bool, _>("stat failed")
        });
        assert_eq!(result.unwrap_err(), "stat failed");
    }

    #[test]
    fn remote_classification() {
        let old = snapshot(&[("same", "1"), ("changed", "2"), ("removed", "3")]);
        let new = snapshot(&[("same", "1"), ("changed", "20"), ("fresh", "4")]);

        let changes = detect_remote_changes(&old, &new);

        assert_eq!(changes.added, set(&["fresh"]));
        assert_eq!(changes.modified, set(&["changed"]));
        assert_eq!(changes.deleted, set(&["removed"]));
        assert_eq!(changes.unchanged, set(&["same"]));
    }

    #[test]
    fn remote_ignores_size() {
        let old = TreeSnapshot::from_references(vec![FileReference::new("a", "h", 1)]);
        let new = TreeSnapshot::from_references(vec![FileReference::new("a", "h", 99)]);
        let changes = detect_remote_changes(&old, &new);
        assert_eq!(changes.unchanged, set(&["a"]));
        assert!(!changes.has_changes());
    }

    fn arb_snapshot() -> impl Strategy<Value = TreeSnapshot> {
        prop::collection::btree_map("[a-e]{1,2}", "[0-3]", 0..12).prop_map(|m| {
            m.into_iter()
                .map(|(path, hash)| FileReference::new(path, hash, 0))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn remote_changes_partition_union(old in arb_snapshot(), new in arb_snapshot()) {
            let changes = detect_remote_changes(&old, &new);

            let union: BTreeSet<String> =
                old.paths().chain(new.paths()).map(str::to_string).collect();
            let total = changes.added.len()
                + changes.modified.len()
                + changes.deleted.len()
                + changes.unchanged.len();

            prop_assert_eq!(changes.all_paths(), union.clone());
            prop_assert_eq!(total, union.len());
        }

        #[test]
        fn local_changes_partition_union(
            tracked in arb_snapshot(),
            local in prop::collection::btree_set("[a-e]{1,2}", 0..12),
            marked in prop::collection::btree_set("[a-e]{1,2}", 0..12),
        ) {
            let changes = detect_local_changes(&tracked, local.clone(), |p| {
                Ok::<_, Infallible>(marked.contains(p))
            })
            .unwrap();

            let mut union: BTreeSet<String> = tracked.paths().map(str::to_string).collect();
            union.extend(local.iter().cloned());
            let total = changes.added.len()
                + changes.modified.len()
                + changes.deleted.len()
                + changes.unchanged.len();

            prop_assert_eq!(changes.all_paths(), union.clone());
            prop_assert_eq!(total, union.len());
        }
    }
}
