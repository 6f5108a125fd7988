//! Branch management, switching and merging.

use ngh_core::{Decision, PullStrategy, ScriptedDecisions};
use ngh_storage::{LedgerKind, MemoryWorkspace};
use ngh_sync_engine::{MemoryRemote, RemoteRepository, SyncError};
use ngh_testkit::prelude::*;

fn take_remote() -> ScriptedDecisions {
    ScriptedDecisions::new(Decision::TakeRemote)
}

#[test]
fn create_branch_from_synced_commit() {
    let mirror = TestMirror::cloned(&[("a", b"1")]);
    mirror.remote.seed_change("main", &[("b", b"2")], &[]);

    let commit = mirror.repo.create_remote_branch("feature", None).unwrap();
    assert_eq!(commit, mirror.head);
    assert_eq!(mirror.remote.head("feature"), Some(mirror.head.clone()));
    assert_eq!(
        mirror.repo.list_branches().unwrap(),
        vec!["feature".to_string(), "main".to_string()]
    );
}

#[test]
fn create_branch_from_other_branch() {
    let mirror = TestMirror::cloned(&[("a", b"1")]);
    let tip = mirror.remote.seed_change("main", &[("b", b"2")], &[]);

    let commit = mirror
        .repo
        .create_remote_branch("hotfix", Some("main"))
        .unwrap();
    assert_eq!(commit, tip);

    assert!(matches!(
        mirror.repo.create_remote_branch("x", Some("nope")),
        Err(SyncError::BranchMissingRemotely { .. })
    ));
    assert!(matches!(
        mirror.repo.create_remote_branch("hotfix", None),
        Err(SyncError::BranchAlreadyExists { .. })
    ));
}

#[test]
fn create_branch_needs_a_base_commit() {
    let remote = MemoryRemote::new("octo/late");
    let mirror = TestMirror::linked(remote.clone(), MemoryWorkspace::new());
    remote.seed_commit("main", &[("a", b"1")]);

    assert!(matches!(
        mirror.repo.create_remote_branch("feature", None),
        Err(SyncError::NoBaseCommit)
    ));
}

#[test]
fn create_branch_in_empty_repository_bootstraps() {
    let remote = MemoryRemote::new("octo/empty");
    let mirror = TestMirror::linked(remote.clone(), MemoryWorkspace::new());

    let commit = mirror.repo.create_remote_branch("develop", None).unwrap();
    assert_eq!(remote.head("develop"), Some(commit.clone()));
    assert!(remote.files_at(&commit).is_empty());
}

#[test]
fn deleting_tracked_branch_needs_confirmation() {
    let mirror = TestMirror::cloned(&[("a", b"1")]);
    mirror.repo.create_remote_branch("feature", None).unwrap();

    let mut refuse = take_remote();
    assert!(!mirror.repo.delete_remote_branch("main", &mut refuse).unwrap());
    assert!(mirror.remote.head("main").is_some());

    let mut accept = take_remote().with_confirmation(true);
    assert!(mirror.repo.delete_remote_branch("main", &mut accept).unwrap());
    assert!(mirror.remote.head("main").is_none());

    // Other branches go without asking.
    assert!(mirror
        .repo
        .delete_remote_branch("feature", &mut refuse)
        .unwrap());
    assert!(matches!(
        mirror.repo.delete_remote_branch("feature", &mut refuse),
        Err(SyncError::BranchMissingRemotely { .. })
    ));
}

#[test]
fn switch_to_branch_at_same_commit_only_rewrites_state() {
    let mut mirror = TestMirror::cloned(&[("a", b"1")]);
    mirror.repo.create_remote_branch("feature", None).unwrap();
    let writes = mirror.workspace.ledger_writes();

    let outcome = mirror
        .repo
        .switch_branch("feature", PullStrategy::Ask, &mut take_remote())
        .unwrap();

    assert_eq!(outcome.branch, "feature");
    assert!(outcome.pull.is_none());
    assert_eq!(mirror.workspace.ledger_writes(), writes + 1);
    assert_eq!(
        ledger_lines(&mirror.workspace, LedgerKind::State),
        vec![TEST_REPOSITORY.to_string(), "feature".into(), mirror.head.clone()]
    );

    // Commits now go to the new branch.
    mirror.workspace.user_write("a", b"on feature");
    let commit = mirror.repo.commit("feature work").unwrap();
    assert_eq!(mirror.remote.head("feature"), Some(commit.commit));
    assert_eq!(mirror.remote.head("main"), Some(mirror.head.clone()));
}

#[test]
fn switch_to_branch_pulls_its_files() {
    let mut mirror = TestMirror::cloned(&[("a", b"1")]);
    mirror.remote.create_branch("feature", &mirror.head).unwrap();
    let tip = mirror
        .remote
        .seed_change("feature", &[("f", b"feature file")], &[]);

    let outcome = mirror
        .repo
        .switch_branch("feature", PullStrategy::Ask, &mut take_remote())
        .unwrap();

    assert_eq!(outcome.commit, tip);
    let pull = outcome.pull.unwrap();
    assert_eq!(pull.downloaded, vec!["f".to_string()]);
    assert_eq!(mirror.workspace.file("f"), Some(b"feature file".to_vec()));
    assert_eq!(
        ledger_lines(&mirror.workspace, LedgerKind::State)[1],
        "feature"
    );
}

#[test]
fn switch_to_older_commit_keeps_branch() {
    let mut mirror = TestMirror::cloned(&[("a", b"1")]);
    let c1 = mirror.head.clone();
    mirror.remote.seed_change("main", &[("a", b"two")], &[]);
    mirror
        .repo
        .pull(PullStrategy::Ask, &mut take_remote())
        .unwrap();

    let outcome = mirror
        .repo
        .switch_branch(&c1, PullStrategy::Ask, &mut take_remote())
        .unwrap();

    assert_eq!(outcome.branch, "main");
    assert_eq!(outcome.commit, c1);
    assert_eq!(mirror.workspace.file("a"), Some(b"1".to_vec()));
    assert_eq!(
        ledger_lines(&mirror.workspace, LedgerKind::State),
        vec![TEST_REPOSITORY.to_string(), "main".into(), c1]
    );
}

#[test]
fn switch_refusals() {
    let mut mirror = TestMirror::cloned(&[("a", b"1")]);

    assert!(matches!(
        mirror
            .repo
            .switch_branch("MAIN", PullStrategy::Ask, &mut take_remote()),
        Err(SyncError::BranchMissingRemotely { .. })
    ));
    assert!(matches!(
        mirror
            .repo
            .switch_branch("main", PullStrategy::Ask, &mut take_remote()),
        Err(SyncError::AlreadyOnBranch { .. })
    ));
    assert!(matches!(
        mirror.repo.switch_branch(
            "0123456789abcdef0123456789abcdef01234567",
            PullStrategy::Ask,
            &mut take_remote()
        ),
        Err(SyncError::UnknownCommit { .. })
    ));
    assert!(matches!(
        mirror
            .repo
            .switch_branch("nope", PullStrategy::Ask, &mut take_remote()),
        Err(SyncError::BranchMissingRemotely { .. })
    ));
}

#[test]
fn merge_on_provider() {
    let mirror = TestMirror::cloned(&[("a", b"1")]);
    mirror.repo.create_remote_branch("feature", None).unwrap();
    let tip = mirror
        .remote
        .seed_change("feature", &[("b", b"2")], &[]);

    mirror.repo.merge("feature", "main", "merge feature").unwrap();
    assert_eq!(mirror.remote.head("main"), Some(tip));
    assert_eq!(mirror.workspace.file("b"), None);

    assert!(matches!(
        mirror.repo.merge("ghost", "main", "x"),
        Err(SyncError::BranchMissingRemotely { ref branch }) if branch == "ghost"
    ));
}
