//! Discarding local changes.

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteRepository;
use crate::repository::Repository;
use crate::state::ResetOutcome;
use ngh_storage::Workspace;
use std::collections::BTreeSet;
use tracing::info;

/// Case-insensitive glob match supporting `*` and `?`.
///
/// `*` also matches `/`, so `*` alone matches every path. A pattern with
/// no `/` is also tried against the file name.
#[must_use]
pub fn pathspec_matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let path = path.to_lowercase();
    if glob(pattern.as_bytes(), path.as_bytes()) {
        return true;
    }
    if !pattern.contains('/') {
        if let Some((_, name)) = path.rsplit_once('/') {
            return glob(pattern.as_bytes(), name.as_bytes());
        }
    }
    false
}

fn glob(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}

impl<R: RemoteRepository, W: Workspace> Repository<R, W> {
    /// Discards local changes.
    ///
    /// Added files are deleted. Modified and deleted files are restored
    /// from the last synced tree and marked unmodified. Without a
    /// `pathspec` every changed path is reset. A pathspec is matched as a
    /// glob against changed paths; failing that, it may name a deleted
    /// path exactly (ignoring case). Nothing matching is not an error.
    ///
    /// The ledgers are not rewritten.
    pub fn reset(&mut self, pathspec: Option<&str>) -> SyncResult<ResetOutcome> {
        self.link_state()?;
        let tracked = self.tracked_snapshot()?;
        let changes = self.local_changes_against(&tracked)?;
        let changed = changes.changed();

        let targets: BTreeSet<String> = match pathspec {
            None => changed,
            Some(spec) => {
                let matched: BTreeSet<String> = changed
                    .iter()
                    .filter(|path| pathspec_matches(spec, path))
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    changes
                        .deleted
                        .iter()
                        .find(|path| path.eq_ignore_ascii_case(spec))
                        .cloned()
                        .into_iter()
                        .collect()
                } else {
                    matched
                }
            }
        };

        let mut outcome = ResetOutcome::default();
        if targets.is_empty() {
            info!("no changes match the supplied pathspec, nothing to do");
            return Ok(outcome);
        }

        for path in &targets {
            if changes.added.contains(path) {
                info!(path = %path, "deleting");
                self.workspace.delete(path)?;
                outcome.deleted.push(path.clone());
            } else {
                let reference = tracked.get(path).ok_or_else(|| {
                    SyncError::Protocol(format!("{path} is not in the synced tree"))
                })?;
                info!(path = %path, "restoring");
                let data = self.remote.get_blob(&reference.blob_hash)?;
                self.workspace.write(path, &data)?;
                self.workspace.mark_unmodified(path)?;
                outcome.restored.push(path.clone());
            }
        }

        self.workspace.persist_markers()?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_patterns() {
        assert!(pathspec_matches("*", "docs/a.md"));
        assert!(pathspec_matches("*.md", "readme.md"));
        assert!(pathspec_matches("*.md", "docs/a.md"));
        assert!(pathspec_matches("docs/*", "docs/a.md"));
        assert!(pathspec_matches("?.txt", "a.txt"));
        assert!(pathspec_matches("README.MD", "readme.md"));
        assert!(!pathspec_matches("docs/*", "src/a.md"));
        assert!(!pathspec_matches("?.txt", "ab.txt"));
        assert!(!pathspec_matches("*.rs", "main.go"));
    }
}
