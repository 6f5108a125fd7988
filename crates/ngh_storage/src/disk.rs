//! Working directory on the local file system.
//!
//! Layout of a linked working directory:
//!
//! ```text
//! <root>/
//! ├─ .ngh/
//! │  ├─ state     # Repository, branch, last synced commit
//! │  ├─ tree      # Last synced tree snapshot
//! │  ├─ marks     # Stamps of files known to be unmodified
//! │  └─ LOCK      # Advisory lock for a single ngh process
//! └─ ...          # Mirrored files
//! ```

use crate::error::{StoreError, StoreResult};
use crate::marks::{MarkIndex, Stamp};
use crate::workspace::{LedgerKind, Workspace};
use fs2::FileExt;
use ngh_core::{CoreError, FileReference};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the metadata directory at the root of a working directory.
pub const METADATA_DIR: &str = ".ngh";

const LOCK_FILE: &str = "LOCK";
const MARKS_FILE: &str = "marks";

/// A working directory backed by the local file system.
///
/// Holds an exclusive advisory lock on the metadata directory once it
/// exists, so two ngh processes never operate on the same working copy.
///
/// # Example
///
/// ```rust,no_run
/// use ngh_storage::{DiskWorkspace, Workspace};
/// use std::path::Path;
///
/// let workspace = DiskWorkspace::discover(Path::new("."))?;
/// for path in workspace.list_files()? {
///     println!("{path}");
/// }
/// # Ok::<(), ngh_storage::StoreError>(())
/// ```
#[derive(Debug)]
pub struct DiskWorkspace {
    root: PathBuf,
    marks: MarkIndex,
    lock: Option<File>,
}

impl DiskWorkspace {
    /// Opens a linked working directory rooted exactly at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotLinked`] if `root` holds no state ledger,
    /// or [`StoreError::Locked`] if another process holds the lock.
    pub fn open(root: &Path) -> StoreResult<Self> {
        let state = root.join(METADATA_DIR).join(LedgerKind::State.file_name());
        if !state.is_file() {
            return Err(StoreError::NotLinked(root.to_path_buf()));
        }
        Self::load(root)
    }

    /// Finds the linked working directory containing `start`.
    ///
    /// Walks up from `start` until a directory holding a state ledger is
    /// found, so commands work from any subdirectory of a working copy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotLinked`] if no ancestor is linked.
    pub fn discover(start: &Path) -> StoreResult<Self> {
        let start = fs::canonicalize(start)?;
        for candidate in start.ancestors() {
            let state = candidate
                .join(METADATA_DIR)
                .join(LedgerKind::State.file_name());
            if state.is_file() {
                debug!(root = %candidate.display(), "found linked working directory");
                return Self::load(candidate);
            }
        }
        Err(StoreError::NotLinked(start))
    }

    /// Opens `root` whether or not it is linked, creating it if missing.
    ///
    /// Used by the operations that establish a link.
    pub fn open_unlinked(root: &Path) -> StoreResult<Self> {
        if !root.exists() {
            fs::create_dir_all(root)?;
        }
        if !root.is_dir() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("not a directory: {}", root.display()),
            )));
        }
        Self::load(root)
    }

    fn load(root: &Path) -> StoreResult<Self> {
        let mut workspace = Self {
            root: root.to_path_buf(),
            marks: MarkIndex::new(),
            lock: None,
        };

        if workspace.metadata_dir().is_dir() {
            workspace.acquire_lock()?;
            let marks_path = workspace.metadata_dir().join(MARKS_FILE);
            if marks_path.is_file() {
                workspace.marks = MarkIndex::decode(&fs::read_to_string(&marks_path)?)?;
            }
        }

        Ok(workspace)
    }

    /// Root of the working directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    fn acquire_lock(&mut self) -> StoreResult<()> {
        if self.lock.is_some() {
            return Ok(());
        }
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.metadata_dir().join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(self.root.clone()));
        }
        self.lock = Some(lock_file);
        Ok(())
    }

    fn ensure_metadata_dir(&mut self) -> StoreResult<()> {
        let dir = self.metadata_dir();
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
        }
        self.acquire_lock()
    }

    /// Maps a relative path to a file system path.
    ///
    /// Rejects anything that would land inside the metadata directory.
    fn resolve(&self, path: &str) -> StoreResult<(String, PathBuf)> {
        let normalized = FileReference::normalize_path(path)?;
        if normalized == METADATA_DIR || normalized.starts_with(&format!("{METADATA_DIR}/")) {
            return Err(CoreError::InvalidPath {
                path: path.to_string(),
            }
            .into());
        }
        let full = self.root.join(&normalized);
        Ok((normalized, full))
    }

    /// Writes a metadata file atomically.
    ///
    /// 1. Write to a temporary file
    /// 2. Sync it to disk
    /// 3. Rename it over the target
    /// 4. Fsync the metadata directory
    fn atomic_write(&mut self, name: &str, contents: &[u8]) -> StoreResult<()> {
        self.ensure_metadata_dir()?;
        let dir = self.metadata_dir();
        let temp = write_temp(&dir, name, contents)?;
        fs::rename(&temp, dir.join(name))?;
        sync_directory(&dir)
    }

    /// Replaces several metadata files as a group.
    ///
    /// Every temporary file is written and synced before the first rename.
    /// If a rename fails, the files already renamed get their previous
    /// contents back and files that did not exist are removed again.
    fn atomic_write_all(&mut self, files: &[(&str, &[u8])]) -> StoreResult<()> {
        self.ensure_metadata_dir()?;
        let dir = self.metadata_dir();

        let mut temps = Vec::with_capacity(files.len());
        for (name, contents) in files {
            match write_temp(&dir, name, contents) {
                Ok(temp) => temps.push(temp),
                Err(e) => {
                    remove_temps(&temps);
                    return Err(e);
                }
            }
        }

        let mut previous = Vec::with_capacity(files.len());
        for (&(name, _), temp) in files.iter().zip(&temps) {
            let target = dir.join(name);
            let old = match fs::read(&target) {
                Ok(data) => Some(data),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => {
                    remove_temps(&temps);
                    self.restore(&previous);
                    return Err(e.into());
                }
            };
            if let Err(e) = fs::rename(temp, &target) {
                remove_temps(&temps);
                self.restore(&previous);
                return Err(e.into());
            }
            previous.push((name, old));
        }

        sync_directory(&dir)
    }

    /// Puts back metadata files replaced by a failed group write.
    fn restore(&mut self, previous: &[(&str, Option<Vec<u8>>)]) {
        for (name, old) in previous.iter().rev() {
            let restored = match old {
                Some(data) => self.atomic_write(name, data),
                None => fs::remove_file(self.metadata_dir().join(name)).map_err(Into::into),
            };
            if let Err(e) = restored {
                warn!(file = *name, error = %e, "could not restore metadata file");
            }
        }
    }

    fn walk(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> StoreResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if prefix.is_empty() && name == METADATA_DIR {
                continue;
            }

            // Follows symlinks; dangling ones are skipped.
            let Ok(metadata) = fs::metadata(entry.path()) else {
                continue;
            };
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            if metadata.is_dir() {
                self.walk(&entry.path(), &relative, out)?;
            } else if metadata.is_file() {
                out.push(relative);
            }
        }
        Ok(())
    }

    /// Removes directories left empty by a delete, up to the root.
    fn prune_empty_parents(&self, file: &Path) {
        let mut current = file.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            // Fails on non-empty directories, which ends the walk.
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

impl Workspace for DiskWorkspace {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn root_has_contents(&self) -> StoreResult<bool> {
        if !self.root.is_dir() {
            return Ok(false);
        }
        for entry in fs::read_dir(&self.root)? {
            if entry?.file_name() != METADATA_DIR {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        let (_, full) = self.resolve(path)?;
        Ok(full.is_file())
    }

    fn file_size(&self, path: &str) -> StoreResult<Option<u64>> {
        let (_, full) = self.resolve(path)?;
        match fs::metadata(&full) {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let (normalized, full) = self.resolve(path)?;
        match fs::read(&full) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(normalized)),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, path: &str, data: &[u8]) -> StoreResult<()> {
        let (normalized, full) = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, data)?;
        self.marks.set_modified(&normalized);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> StoreResult<()> {
        let (normalized, full) = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => self.prune_empty_parents(&full),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.marks.set_modified(&normalized);
        Ok(())
    }

    fn list_files(&self) -> StoreResult<Vec<String>> {
        let mut files = Vec::new();
        if self.root.is_dir() {
            self.walk(&self.root, "", &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn is_modified(&self, path: &str) -> StoreResult<bool> {
        let (normalized, full) = self.resolve(path)?;
        let Some(stamp) = self.marks.get(&normalized) else {
            return Ok(true);
        };
        match fs::metadata(&full) {
            Ok(metadata) => Ok(Stamp::from_metadata(&metadata) != *stamp),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    fn mark_modified(&mut self, path: &str) -> StoreResult<()> {
        let (normalized, _) = self.resolve(path)?;
        self.marks.set_modified(&normalized);
        Ok(())
    }

    fn mark_unmodified(&mut self, path: &str) -> StoreResult<()> {
        let (normalized, full) = self.resolve(path)?;
        let metadata = match fs::metadata(&full) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(normalized))
            }
            Err(e) => return Err(e.into()),
        };
        self.marks.set_clean(&normalized, Stamp::from_metadata(&metadata));
        Ok(())
    }

    fn persist_markers(&mut self) -> StoreResult<()> {
        let root = self.root.clone();
        self.marks.retain(|path| root.join(path).is_file());
        if !self.marks.is_dirty() {
            return Ok(());
        }
        let encoded = self.marks.encode();
        self.atomic_write(MARKS_FILE, encoded.as_bytes())?;
        self.marks.mark_saved();
        debug!(clean = self.marks.len(), "persisted modification index");
        Ok(())
    }

    fn is_linked(&self) -> StoreResult<bool> {
        Ok(self
            .metadata_dir()
            .join(LedgerKind::State.file_name())
            .is_file())
    }

    fn load_ledger(&self, kind: LedgerKind) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.metadata_dir().join(kind.file_name())) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn replace_ledger(&mut self, kind: LedgerKind, contents: &str) -> StoreResult<()> {
        self.atomic_write(kind.file_name(), contents.as_bytes())?;
        debug!(ledger = kind.file_name(), bytes = contents.len(), "replaced ledger");
        Ok(())
    }

    fn replace_ledgers(&mut self, state: &str, tree: &str) -> StoreResult<()> {
        self.atomic_write_all(&[
            (LedgerKind::Tree.file_name(), tree.as_bytes()),
            (LedgerKind::State.file_name(), state.as_bytes()),
        ])?;
        debug!(state = state.len(), tree = tree.len(), "replaced ledgers");
        Ok(())
    }

    fn remove_metadata(&mut self) -> StoreResult<()> {
        // Release the lock first so the directory can be removed everywhere.
        self.lock = None;
        self.marks = MarkIndex::new();
        let dir = self.metadata_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Writes and syncs `<name>.tmp` in `dir`.
fn write_temp(dir: &Path, name: &str, contents: &[u8]) -> StoreResult<PathBuf> {
    let temp = dir.join(format!("{name}.tmp"));
    let mut file = File::create(&temp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(temp)
}

fn remove_temps(temps: &[PathBuf]) {
    for temp in temps {
        // Already renamed ones are gone.
        let _ = fs::remove_file(temp);
    }
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> StoreResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StoreResult<()> {
    // NTFS journals metadata updates.
    Ok(())
}
