//! In-memory workspace for testing.

use crate::error::{StoreError, StoreResult};
use crate::workspace::{LedgerKind, Workspace};
use ngh_core::FileReference;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, Vec<u8>>,
    modified: BTreeSet<String>,
    ledgers: HashMap<LedgerKind, String>,
    /// Modified set as of the last `persist_markers`.
    persisted_modified: BTreeSet<String>,
    fail_ledger_writes: bool,
    fail_file_writes_after: Option<usize>,
    ledger_writes: usize,
}

/// A working directory held entirely in memory.
///
/// Clones share the same contents, so a test can keep a handle while
/// the engine owns another one.
///
/// # Example
///
/// ```rust
/// use ngh_storage::{MemoryWorkspace, Workspace};
///
/// let workspace = MemoryWorkspace::new().with_file("a.txt", b"hi");
/// assert!(!workspace.is_modified("a.txt").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkspace {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryWorkspace {
    /// Creates an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unmodified file.
    #[must_use]
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        {
            let mut inner = self.inner.write();
            inner.files.insert(path.to_string(), data.to_vec());
            inner.modified.remove(path);
        }
        self
    }

    /// Makes every subsequent ledger replacement fail.
    pub fn fail_ledger_writes(&self, fail: bool) {
        self.inner.write().fail_ledger_writes = fail;
    }

    /// Lets `count` more file writes succeed, then fails the rest.
    pub fn fail_file_writes_after(&self, count: usize) {
        self.inner.write().fail_file_writes_after = Some(count);
    }

    /// Edits a file the way a user would, setting its marker.
    pub fn user_write(&self, path: &str, data: &[u8]) {
        let mut inner = self.inner.write();
        inner.files.insert(path.to_string(), data.to_vec());
        inner.modified.insert(path.to_string());
    }

    /// Deletes a file the way a user would.
    pub fn user_delete(&self, path: &str) {
        let mut inner = self.inner.write();
        inner.files.remove(path);
        inner.modified.remove(path);
    }

    /// Contents of a file, if present.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.read().files.get(path).cloned()
    }

    /// Raw ledger text, if written.
    #[must_use]
    pub fn ledger(&self, kind: LedgerKind) -> Option<String> {
        self.inner.read().ledgers.get(&kind).cloned()
    }

    /// Number of successful ledger replacements so far.
    #[must_use]
    pub fn ledger_writes(&self) -> usize {
        self.inner.read().ledger_writes
    }

    /// Paths whose marker was set at the last `persist_markers`.
    #[must_use]
    pub fn persisted_modified(&self) -> BTreeSet<String> {
        self.inner.read().persisted_modified.clone()
    }
}

fn normalize(path: &str) -> StoreResult<String> {
    Ok(FileReference::normalize_path(path)?)
}

impl Workspace for MemoryWorkspace {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn root_has_contents(&self) -> StoreResult<bool> {
        Ok(!self.inner.read().files.is_empty())
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        let path = normalize(path)?;
        Ok(self.inner.read().files.contains_key(&path))
    }

    fn file_size(&self, path: &str) -> StoreResult<Option<u64>> {
        let path = normalize(path)?;
        Ok(self
            .inner
            .read()
            .files
            .get(&path)
            .map(|data| data.len() as u64))
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let path = normalize(path)?;
        self.inner
            .read()
            .files
            .get(&path)
            .cloned()
            .ok_or(StoreError::NotFound(path))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> StoreResult<()> {
        let path = normalize(path)?;
        let mut inner = self.inner.write();
        if let Some(remaining) = inner.fail_file_writes_after.as_mut() {
            if *remaining == 0 {
                return Err(StoreError::Injected(format!("write of {path}")));
            }
            *remaining -= 1;
        }
        inner.files.insert(path.clone(), data.to_vec());
        inner.modified.insert(path);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> StoreResult<()> {
        let path = normalize(path)?;
        let mut inner = self.inner.write();
        inner.files.remove(&path);
        inner.modified.remove(&path);
        Ok(())
    }

    fn list_files(&self) -> StoreResult<Vec<String>> {
        Ok(self.inner.read().files.keys().cloned().collect())
    }

    fn is_modified(&self, path: &str) -> StoreResult<bool> {
        let path = normalize(path)?;
        Ok(self.inner.read().modified.contains(&path))
    }

    fn mark_modified(&mut self, path: &str) -> StoreResult<()> {
        let path = normalize(path)?;
        self.inner.write().modified.insert(path);
        Ok(())
    }

    fn mark_unmodified(&mut self, path: &str) -> StoreResult<()> {
        let path = normalize(path)?;
        let mut inner = self.inner.write();
        if !inner.files.contains_key(&path) {
            return Err(StoreError::NotFound(path));
        }
        inner.modified.remove(&path);
        Ok(())
    }

    fn persist_markers(&mut self) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.persisted_modified = inner.modified.clone();
        Ok(())
    }

    fn is_linked(&self) -> StoreResult<bool> {
        Ok(self.inner.read().ledgers.contains_key(&LedgerKind::State))
    }

    fn load_ledger(&self, kind: LedgerKind) -> StoreResult<Option<String>> {
        Ok(self.inner.read().ledgers.get(&kind).cloned())
    }

    fn replace_ledger(&mut self, kind: LedgerKind, contents: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.fail_ledger_writes {
            return Err(StoreError::Injected(format!(
                "replace of {} ledger",
                kind.file_name()
            )));
        }
        inner.ledgers.insert(kind, contents.to_string());
        inner.ledger_writes += 1;
        Ok(())
    }

    fn replace_ledgers(&mut self, state: &str, tree: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.fail_ledger_writes {
            return Err(StoreError::Injected("replace of ledgers".to_string()));
        }
        inner.ledgers.insert(LedgerKind::Tree, tree.to_string());
        inner.ledgers.insert(LedgerKind::State, state.to_string());
        inner.ledger_writes += 2;
        Ok(())
    }

    fn remove_metadata(&mut self) -> StoreResult<()> {
        self.inner.write().ledgers.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_contents() {
        let handle = MemoryWorkspace::new();
        let mut engine_side = handle.clone();
        engine_side.write("a", b"1").unwrap();
        assert_eq!(handle.file("a"), Some(b"1".to_vec()));
        assert!(handle.is_modified("a").unwrap());
    }

    #[test]
    fn seeded_files_are_clean() {
        let workspace = MemoryWorkspace::new().with_file("a", b"1");
        assert!(!workspace.is_modified("a").unwrap());
        workspace.user_write("a", b"2");
        assert!(workspace.is_modified("a").unwrap());
    }

    #[test]
    fn normalizes_paths() {
        let mut workspace = MemoryWorkspace::new();
        workspace.write("dir\\file.txt", b"x").unwrap();
        assert!(workspace.exists("dir/file.txt").unwrap());
        assert!(workspace.write("../x", b"x").is_err());
    }

    #[test]
    fn injected_failures() {
        let mut workspace = MemoryWorkspace::new();
        workspace.fail_file_writes_after(1);
        workspace.write("a", b"1").unwrap();
        assert!(matches!(
            workspace.write("b", b"2"),
            Err(StoreError::Injected(_))
        ));

        workspace.fail_ledger_writes(true);
        assert!(workspace.replace_ledger(LedgerKind::Tree, "").is_err());
        assert!(workspace.replace_ledgers("s", "").is_err());
        assert_eq!(workspace.ledger_writes(), 0);
        assert_eq!(workspace.ledger(LedgerKind::State), None);
    }

    #[test]
    fn markers_persist_on_request() {
        let mut workspace = MemoryWorkspace::new();
        workspace.write("a", b"1").unwrap();
        assert!(workspace.persisted_modified().is_empty());
        workspace.persist_markers().unwrap();
        assert!(workspace.persisted_modified().contains("a"));
    }
}
