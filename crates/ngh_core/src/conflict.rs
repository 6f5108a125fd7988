//! Pull conflict classification and resolution.

use crate::model::ChangeSet;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::info;

/// The four ways a local change can overlap a remote change during pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictKind {
    /// Modified both remotely and locally.
    BothModified,
    /// Modified remotely, deleted locally.
    ModifiedRemotelyDeletedLocally,
    /// Deleted remotely, modified locally.
    DeletedRemotelyModifiedLocally,
    /// Added both remotely and locally, independently.
    BothAdded,
}

impl ConflictKind {
    /// All kinds, in the order they are resolved.
    pub const ALL: [ConflictKind; 4] = [
        ConflictKind::BothModified,
        ConflictKind::ModifiedRemotelyDeletedLocally,
        ConflictKind::DeletedRemotelyModifiedLocally,
        ConflictKind::BothAdded,
    ];

    /// Paths of this kind for the given remote and local changes.
    #[must_use]
    pub fn overlap(&self, remote: &ChangeSet, local: &ChangeSet) -> BTreeSet<String> {
        let (remote_side, local_side) = match self {
            ConflictKind::BothModified => (&remote.modified, &local.modified),
            ConflictKind::ModifiedRemotelyDeletedLocally => (&remote.modified, &local.deleted),
            ConflictKind::DeletedRemotelyModifiedLocally => (&remote.deleted, &local.modified),
            ConflictKind::BothAdded => (&remote.added, &local.added),
        };
        remote_side.intersection(local_side).cloned().collect()
    }

    /// True when taking the remote side means deleting the local file
    /// rather than downloading the remote one.
    #[must_use]
    pub fn remote_side_deletes(&self) -> bool {
        matches!(self, ConflictKind::DeletedRemotelyModifiedLocally)
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConflictKind::BothModified => "modified both locally and remotely",
            ConflictKind::ModifiedRemotelyDeletedLocally => "modified remotely but deleted locally",
            ConflictKind::DeletedRemotelyModifiedLocally => "deleted remotely but modified locally",
            ConflictKind::BothAdded => "added both locally and remotely",
        };
        f.write_str(text)
    }
}

/// How pull handles conflicting paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullStrategy {
    /// Ask the decision provider for every conflicting path.
    #[default]
    Ask,
    /// Keep the local side of every conflict.
    KeepLocal,
    /// Take the remote side of every conflict.
    OverwriteWithRemote,
}

/// Outcome chosen for one conflicting path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the local file as it is (or keep it deleted).
    KeepLocal,
    /// Apply the remote side (download, undelete or delete).
    TakeRemote,
}

/// Supplies decisions for conflicts when the strategy is [`PullStrategy::Ask`].
///
/// Implementations are synchronous. The console implementation blocks on
/// a key press; [`ScriptedDecisions`] answers from a table for tests.
pub trait DecisionProvider {
    /// Decides one conflicting path.
    fn decide(&mut self, kind: ConflictKind, path: &str) -> Decision;

    /// Asks for a yes/no confirmation of a destructive remote action.
    fn confirm(&mut self, _question: &str) -> bool {
        false
    }
}

/// A decision provider answering from a fixed table.
#[derive(Debug, Clone)]
pub struct ScriptedDecisions {
    default: Decision,
    answers: HashMap<(ConflictKind, String), Decision>,
    confirm_answer: bool,
    asked: Vec<(ConflictKind, String)>,
}

impl ScriptedDecisions {
    /// Creates a provider answering `default` to every question.
    pub fn new(default: Decision) -> Self {
        Self {
            default,
            answers: HashMap::new(),
            confirm_answer: false,
            asked: Vec::new(),
        }
    }

    /// Sets the answer for one path of one kind.
    pub fn with_answer(
        mut self,
        kind: ConflictKind,
        path: impl Into<String>,
        decision: Decision,
    ) -> Self {
        self.answers.insert((kind, path.into()), decision);
        self
    }

    /// Sets the answer for confirmations.
    pub fn with_confirmation(mut self, answer: bool) -> Self {
        self.confirm_answer = answer;
        self
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> &[(ConflictKind, String)] {
        &self.asked
    }
}

impl Default for ScriptedDecisions {
    fn default() -> Self {
        Self::new(Decision::TakeRemote)
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn decide(&mut self, kind: ConflictKind, path: &str) -> Decision {
        self.asked.push((kind, path.to_string()));
        self.answers
            .get(&(kind, path.to_string()))
            .copied()
            .unwrap_or(self.default)
    }

    fn confirm(&mut self, _question: &str) -> bool {
        self.confirm_answer
    }
}

/// A conflict met during pull and what was decided for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    /// Kind of overlap.
    pub kind: ConflictKind,
    /// Conflicting path.
    pub path: String,
    /// Decision applied.
    pub decision: Decision,
}

/// Files to fetch and files to remove after conflict resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullResolution {
    /// Paths to download from the new remote snapshot.
    pub download: BTreeSet<String>,
    /// Paths to delete from the working directory.
    pub delete_locally: BTreeSet<String>,
    /// Every conflict met, in resolution order.
    pub conflicts: Vec<ConflictRecord>,
}

/// Computes the download and delete sets for a pull.
///
/// Starts from `remote.added ∪ remote.modified` to download and
/// `remote.deleted` to delete, then walks the four conflict kinds in
/// order. Keeping the local side removes the path from the set the
/// remote side would have touched. The provider is consulted only for
/// [`PullStrategy::Ask`], in kind order then path order.
pub fn resolve_pull_conflicts(
    remote: &ChangeSet,
    local: &ChangeSet,
    strategy: PullStrategy,
    provider: &mut dyn DecisionProvider,
) -> PullResolution {
    let mut resolution = PullResolution {
        download: remote.added_or_modified(),
        delete_locally: remote.deleted.clone(),
        conflicts: Vec::new(),
    };

    for kind in ConflictKind::ALL {
        for path in kind.overlap(remote, local) {
            let decision = match strategy {
                PullStrategy::Ask => provider.decide(kind, &path),
                PullStrategy::KeepLocal => Decision::KeepLocal,
                PullStrategy::OverwriteWithRemote => Decision::TakeRemote,
            };

            info!(path = %path, conflict = %kind, ?decision, "pull conflict");

            if decision == Decision::KeepLocal {
                if kind.remote_side_deletes() {
                    resolution.delete_locally.remove(&path);
                } else {
                    resolution.download.remove(&path);
                }
            }

            resolution.conflicts.push(ConflictRecord {
                kind,
                path,
                decision,
            });
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    /// One path per conflict kind plus one non-conflicting path per remote set.
    fn fixture() -> (ChangeSet, ChangeSet) {
        let remote = ChangeSet {
            added: set(&["both_added", "remote_added"]),
            modified: set(&["both_modified", "mod_del", "remote_modified"]),
            deleted: set(&["del_mod", "remote_deleted"]),
            unchanged: set(&["same"]),
        };
        let local = ChangeSet {
            added: set(&["both_added", "local_added"]),
            modified: set(&["both_modified", "del_mod"]),
            deleted: set(&["mod_del"]),
            unchanged: set(&["same", "remote_modified", "remote_deleted"]),
        };
        (remote, local)
    }

    #[test]
    fn overwrite_takes_remote_everywhere() {
        let (remote, local) = fixture();
        let mut provider = ScriptedDecisions::default();
        let res = resolve_pull_conflicts(
            &remote,
            &local,
            PullStrategy::OverwriteWithRemote,
            &mut provider,
        );

        assert_eq!(
            res.download,
            set(&["both_added", "both_modified", "mod_del", "remote_added", "remote_modified"])
        );
        assert_eq!(res.delete_locally, set(&["del_mod", "remote_deleted"]));
        assert_eq!(res.conflicts.len(), 4);
        assert!(provider.asked().is_empty());
    }

    #[test]
    fn keep_local_protects_every_local_change() {
        let (remote, local) = fixture();
        let mut provider = ScriptedDecisions::default();
        let res = resolve_pull_conflicts(&remote, &local, PullStrategy::KeepLocal, &mut provider);

        assert_eq!(res.download, set(&["remote_added", "remote_modified"]));
        assert_eq!(res.delete_locally, set(&["remote_deleted"]));
        assert!(res.conflicts.iter().all(|c| c.decision == Decision::KeepLocal));
        assert!(provider.asked().is_empty());
    }

    #[test]
    fn ask_consults_provider_in_kind_order() {
        let (remote, local) = fixture();
        let mut provider = ScriptedDecisions::new(Decision::TakeRemote)
            .with_answer(ConflictKind::BothModified, "both_modified", Decision::KeepLocal)
            .with_answer(ConflictKind::DeletedRemotelyModifiedLocally, "del_mod", Decision::KeepLocal);

        let res = resolve_pull_conflicts(&remote, &local, PullStrategy::Ask, &mut provider);

        let kinds: Vec<ConflictKind> = provider.asked().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, ConflictKind::ALL.to_vec());
        assert!(!res.download.contains("both_modified"));
        assert!(res.download.contains("mod_del"));
        assert!(res.download.contains("both_added"));
        assert!(!res.delete_locally.contains("del_mod"));
    }

    #[test]
    fn no_overlap_no_conflicts() {
        let remote = ChangeSet {
            added: set(&["a"]),
            ..ChangeSet::default()
        };
        let local = ChangeSet {
            modified: set(&["b"]),
            ..ChangeSet::default()
        };
        let mut provider = ScriptedDecisions::default();
        let res = resolve_pull_conflicts(&remote, &local, PullStrategy::Ask, &mut provider);
        assert!(res.conflicts.is_empty());
        assert_eq!(res.download, set(&["a"]));
    }

    #[test]
    fn default_confirmation_is_no() {
        struct Silent;
        impl DecisionProvider for Silent {
            fn decide(&mut self, _kind: ConflictKind, _path: &str) -> Decision {
                Decision::KeepLocal
            }
        }
        assert!(!Silent.confirm("delete?"));
        assert!(ScriptedDecisions::default().with_confirmation(true).confirm("delete?"));
    }

    fn arb_paths() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set("[a-f]", 0..6)
    }

    /// Builds remote and local change sets that could come from the same
    /// old snapshot: remote-added and local-added paths are untracked,
    /// every other changed path is tracked.
    fn arb_changes() -> impl Strategy<Value = (ChangeSet, ChangeSet)> {
        (arb_paths(), arb_paths(), arb_paths(), arb_paths(), arb_paths(), arb_paths()).prop_map(
            |(ra, rm, rd, la, lm, ld)| {
                let rm: BTreeSet<String> = rm.difference(&ra).cloned().collect();
                let rd: BTreeSet<String> =
                    rd.difference(&ra).filter(|p| !rm.contains(*p)).cloned().collect();
                let la: BTreeSet<String> =
                    la.iter().filter(|p| !rm.contains(*p) && !rd.contains(*p)).cloned().collect();
                let lm: BTreeSet<String> =
                    lm.iter().filter(|p| !la.contains(*p) && !ra.contains(*p)).cloned().collect();
                let ld: BTreeSet<String> = ld
                    .iter()
                    .filter(|p| !la.contains(*p) && !ra.contains(*p) && !lm.contains(*p))
                    .cloned()
                    .collect();
                (
                    ChangeSet { added: ra, modified: rm, deleted: rd, unchanged: BTreeSet::new() },
                    ChangeSet { added: la, modified: lm, deleted: ld, unchanged: BTreeSet::new() },
                )
            },
        )
    }

    proptest! {
        #[test]
        fn keep_local_excludes_overlapping_local_changes((remote, local) in arb_changes()) {
            let res = resolve_pull_conflicts(
                &remote, &local, PullStrategy::KeepLocal, &mut ScriptedDecisions::default());

            let remote_touched = remote.changed();
            for path in local.modified.union(&local.deleted) {
                if remote_touched.contains(path) {
                    prop_assert!(!res.download.contains(path));
                }
            }
        }

        #[test]
        fn overwrite_downloads_all_remote_content((remote, local) in arb_changes()) {
            let res = resolve_pull_conflicts(
                &remote, &local, PullStrategy::OverwriteWithRemote, &mut ScriptedDecisions::default());
            prop_assert_eq!(res.download, remote.added_or_modified());
            prop_assert_eq!(res.delete_locally, remote.deleted.clone());
        }

        #[test]
        fn resolution_is_deterministic((remote, local) in arb_changes(), keep in any::<bool>()) {
            let default = if keep { Decision::KeepLocal } else { Decision::TakeRemote };
            let first = resolve_pull_conflicts(
                &remote, &local, PullStrategy::Ask, &mut ScriptedDecisions::new(default));
            let second = resolve_pull_conflicts(
                &remote, &local, PullStrategy::Ask, &mut ScriptedDecisions::new(default));
            prop_assert_eq!(first, second);
        }
    }
}
