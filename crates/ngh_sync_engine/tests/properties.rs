//! Properties of ledgers and pull resolution over generated snapshots.

use ngh_core::ledger::{decode_tree, encode_tree};
use ngh_core::{
    detect_remote_changes, resolve_pull_conflicts, ChangeSet, Decision, PullStrategy,
    ScriptedDecisions,
};
use ngh_testkit::generators::*;
use proptest::prelude::*;

/// Remote and local changes made against the same synced snapshot.
fn pull_inputs() -> impl Strategy<Value = (ChangeSet, ChangeSet)> {
    (
        snapshot_pair_strategy(),
        prop::collection::vec(0u8..3, 16),
        prop::collection::btree_set(path_strategy(), 0..4),
    )
        .prop_map(|((old, new), fates, added)| {
            let remote = detect_remote_changes(&old, &new);
            let mut local = ChangeSet::default();
            for (path, fate) in old.paths().zip(fates.iter().cycle()) {
                let set = match fate {
                    0 => &mut local.unchanged,
                    1 => &mut local.modified,
                    _ => &mut local.deleted,
                };
                set.insert(path.to_string());
            }
            local.added = added.into_iter().filter(|p| !old.contains(p)).collect();
            (remote, local)
        })
}

proptest! {
    #[test]
    fn tree_ledger_round_trips(snapshot in snapshot_strategy(24)) {
        let text = encode_tree(&snapshot);
        prop_assert_eq!(text.lines().count(), snapshot.len());
        prop_assert_eq!(decode_tree(&text).unwrap(), snapshot);
    }

    #[test]
    fn keep_local_never_overwrites_local_changes((remote, local) in pull_inputs()) {
        let mut decisions = ScriptedDecisions::new(Decision::TakeRemote);
        let resolution =
            resolve_pull_conflicts(&remote, &local, PullStrategy::KeepLocal, &mut decisions);

        for path in local.modified.iter().chain(&local.deleted).chain(&local.added) {
            prop_assert!(!resolution.download.contains(path));
        }
        for path in local.modified.iter().chain(&local.added) {
            prop_assert!(!resolution.delete_locally.contains(path));
        }
        prop_assert!(decisions.asked().is_empty());
    }

    #[test]
    fn overwrite_takes_every_remote_change((remote, local) in pull_inputs()) {
        let mut decisions = ScriptedDecisions::new(Decision::KeepLocal);
        let resolution = resolve_pull_conflicts(
            &remote,
            &local,
            PullStrategy::OverwriteWithRemote,
            &mut decisions,
        );

        prop_assert_eq!(&resolution.download, &remote.added_or_modified());
        prop_assert_eq!(&resolution.delete_locally, &remote.deleted);
        prop_assert!(decisions.asked().is_empty());
    }
}
