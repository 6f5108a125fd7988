//! Test fixtures for mirrors.
//!
//! Provides ready-made remote/working-directory pairs so scenario tests
//! start from a known synced state.

use ngh_storage::{DiskWorkspace, LedgerKind, MemoryWorkspace, Workspace};
use ngh_sync_engine::{EngineConfig, MemoryRemote, Repository};
use tempfile::TempDir;

/// Repository id used by the fixtures.
pub const TEST_REPOSITORY: &str = "octo/fixture";

/// Branch seeded by the fixtures.
pub const TEST_BRANCH: &str = "main";

/// Creates a remote with one commit holding exactly `files` on `main`.
///
/// Returns the remote and the commit.
pub fn seeded_remote(files: &[(&str, &[u8])]) -> (MemoryRemote, String) {
    let remote = MemoryRemote::new(TEST_REPOSITORY);
    let head = remote.seed_commit(TEST_BRANCH, files);
    (remote, head)
}

/// Lines of a ledger, without line terminators.
pub fn ledger_lines<W: Workspace>(workspace: &W, kind: LedgerKind) -> Vec<String> {
    workspace
        .load_ledger(kind)
        .expect("Failed to read ledger")
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// An in-memory mirror: a seeded remote and a working directory cloned from it.
///
/// `remote` and `workspace` share state with the handles inside `repo`,
/// so tests can simulate other clients and user edits through them.
pub struct TestMirror {
    /// The engine handle.
    pub repo: Repository<MemoryRemote, MemoryWorkspace>,
    /// Test-side handle to the remote.
    pub remote: MemoryRemote,
    /// Test-side handle to the working directory.
    pub workspace: MemoryWorkspace,
    /// Commit the working directory was cloned at.
    pub head: String,
}

impl TestMirror {
    /// Seeds a remote with `files` and clones it. Call counters start at zero.
    pub fn cloned(files: &[(&str, &[u8])]) -> Self {
        let (remote, head) = seeded_remote(files);
        let workspace = MemoryWorkspace::new();
        let mut repo = Repository::new(remote.clone(), workspace.clone(), EngineConfig::default());
        repo.clone_remote().expect("Failed to clone fixture remote");
        remote.reset_stats();
        Self {
            repo,
            remote,
            workspace,
            head,
        }
    }

    /// Links an unlinked working directory to `remote`.
    pub fn linked(remote: MemoryRemote, workspace: MemoryWorkspace) -> Self {
        let mut repo = Repository::new(remote.clone(), workspace.clone(), EngineConfig::default());
        let outcome = repo.link().expect("Failed to link fixture remote");
        remote.reset_stats();
        Self {
            repo,
            remote,
            workspace,
            head: outcome.commit.unwrap_or_default(),
        }
    }
}

/// A mirror whose working directory lives in a temporary directory.
pub struct TestDiskMirror {
    /// The engine handle.
    pub repo: Repository<MemoryRemote, DiskWorkspace>,
    /// Test-side handle to the remote.
    pub remote: MemoryRemote,
    /// Commit the working directory was cloned at.
    pub head: String,
    /// The temporary directory (kept alive to prevent cleanup).
    pub dir: TempDir,
}

impl TestDiskMirror {
    /// Seeds a remote with `files` and clones it into a temporary directory.
    pub fn cloned(files: &[(&str, &[u8])]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (remote, head) = seeded_remote(files);
        let workspace =
            DiskWorkspace::open_unlinked(dir.path()).expect("Failed to open working directory");
        let mut repo = Repository::new(remote.clone(), workspace, EngineConfig::default());
        repo.clone_remote().expect("Failed to clone fixture remote");
        remote.reset_stats();
        Self {
            repo,
            remote,
            head,
            dir,
        }
    }

    /// Writes a file directly on disk, as an editor would.
    pub fn edit(&self, path: &str, data: &[u8]) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(full, data).expect("Failed to write file");
    }

    /// Removes a file directly on disk.
    pub fn remove(&self, path: &str) {
        std::fs::remove_file(self.dir.path().join(path)).expect("Failed to remove file");
    }

    /// Reads a file directly from disk.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.dir.path().join(path)).ok()
    }
}
