//! Modification marker index.
//!
//! The disk workspace has no native "modified" flag on files, so it keeps
//! a stamp (size and modification time) for every file the engine last
//! confirmed as synced. A file is modified when it has no stamp or when
//! its current size or modification time differs from the stamp.
//!
//! The index is persisted as `marks` in the metadata directory:
//!
//! ```text
//! <size> <mtime-nanos> <path>\r\n
//! ```
//!
//! Paths may contain spaces; they are the third field taken verbatim.

use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::fs::Metadata;
use std::time::UNIX_EPOCH;

/// Size and modification time of a clean file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    /// File size in bytes.
    pub size: u64,
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_nanos: u128,
}

impl Stamp {
    /// Captures the stamp of a file from its metadata.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mtime_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());
        Self {
            size: metadata.len(),
            mtime_nanos,
        }
    }
}

/// Stamps of every file considered unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkIndex {
    stamps: BTreeMap<String, Stamp>,
    dirty: bool,
}

impl MarkIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stamp recorded for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Stamp> {
        self.stamps.get(path)
    }

    /// Records `path` as clean with the given stamp.
    pub fn set_clean(&mut self, path: &str, stamp: Stamp) {
        if self.stamps.insert(path.to_string(), stamp) != Some(stamp) {
            self.dirty = true;
        }
    }

    /// Forgets the stamp of `path`, making it modified.
    pub fn set_modified(&mut self, path: &str) {
        if self.stamps.remove(path).is_some() {
            self.dirty = true;
        }
    }

    /// Drops stamps of paths rejected by `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.stamps.len();
        self.stamps.retain(|path, _| keep(path));
        if self.stamps.len() != before {
            self.dirty = true;
        }
    }

    /// Number of clean paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// Returns true if no path is clean.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Returns true if the index changed since it was loaded or saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a successful save.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Serializes the index.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (path, stamp) in &self.stamps {
            out.push_str(&format!("{} {} {}\r\n", stamp.size, stamp.mtime_nanos, path));
        }
        out
    }

    /// Parses a serialized index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptMarks`] on a malformed line.
    pub fn decode(text: &str) -> StoreResult<Self> {
        let mut stamps = BTreeMap::new();

        for (index, raw) in text.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.is_empty() {
                continue;
            }
            let corrupt = |message: &str| StoreError::CorruptMarks {
                line: index + 1,
                message: message.to_string(),
            };

            let mut fields = line.splitn(3, ' ');
            let size = fields
                .next()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| corrupt("invalid size"))?;
            let mtime_nanos = fields
                .next()
                .and_then(|s| s.parse::<u128>().ok())
                .ok_or_else(|| corrupt("invalid modification time"))?;
            let path = fields
                .next()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| corrupt("missing path"))?;

            stamps.insert(path.to_string(), Stamp { size, mtime_nanos });
        }

        Ok(Self {
            stamps,
            dirty: false,
        })
    }
}
