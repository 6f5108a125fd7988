//! Codecs for the two persisted ledgers.
//!
//! Both ledgers are plain text with CRLF line terminators:
//!
//! ```text
//! tree:   <blobHash> <sizeInBytes> <path>\r\n   (one line per file)
//! state:  <repository>\r\n<branch>\r\n<lastSyncedCommit>\r\n
//! ```
//!
//! An empty tree ledger is an empty snapshot. The last-synced commit line
//! of the state ledger is empty when the branch has no commit yet.
//! Decoders accept bare LF terminators and a missing final terminator.

use crate::error::{CoreError, CoreResult};
use crate::model::{FileReference, RepositoryLinkState, TreeSnapshot};

/// File name of the tree ledger inside the metadata directory.
pub const TREE_LEDGER: &str = "tree";

/// File name of the state ledger inside the metadata directory.
pub const STATE_LEDGER: &str = "state";

const LINE_END: &str = "\r\n";

/// Encodes a snapshot as tree ledger text, one line per file in path order.
#[must_use]
pub fn encode_tree(snapshot: &TreeSnapshot) -> String {
    let mut out = String::new();
    for reference in snapshot.iter() {
        out.push_str(&reference.blob_hash);
        out.push(' ');
        out.push_str(&reference.size.to_string());
        out.push(' ');
        out.push_str(&reference.path);
        out.push_str(LINE_END);
    }
    out
}

/// Decodes tree ledger text.
///
/// Blank lines are skipped. A path listed twice is rejected since a
/// snapshot is unique by path.
pub fn decode_tree(text: &str) -> CoreResult<TreeSnapshot> {
    let mut snapshot = TreeSnapshot::new();

    for (index, raw_line) in text.split('\n').enumerate() {
        let line_no = index + 1;
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(3, ' ');
        let blob_hash = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::invalid_ledger(TREE_LEDGER, line_no, "missing blob hash"))?;
        let size_text = parts
            .next()
            .ok_or_else(|| CoreError::invalid_ledger(TREE_LEDGER, line_no, "missing size"))?;
        let path = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::invalid_ledger(TREE_LEDGER, line_no, "missing path"))?;

        let size = size_text.parse::<u64>().map_err(|_| {
            CoreError::invalid_ledger(
                TREE_LEDGER,
                line_no,
                format!("invalid size: {size_text:?}"),
            )
        })?;

        if snapshot
            .insert(FileReference::new(path, blob_hash, size))
            .is_some()
        {
            return Err(CoreError::invalid_ledger(
                TREE_LEDGER,
                line_no,
                format!("duplicate path: {path}"),
            ));
        }
    }

    Ok(snapshot)
}

/// Encodes a link state as state ledger text (always three lines).
#[must_use]
pub fn encode_state(state: &RepositoryLinkState) -> String {
    format!(
        "{repo}{LINE_END}{branch}{LINE_END}{commit}{LINE_END}",
        repo = state.repository,
        branch = state.branch,
        commit = state.last_synced_commit.as_deref().unwrap_or(""),
    )
}

/// Decodes state ledger text.
pub fn decode_state(text: &str) -> CoreResult<RepositoryLinkState> {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let repository = lines
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::invalid_ledger(STATE_LEDGER, 1, "missing repository id"))?;
    let branch = lines
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::invalid_ledger(STATE_LEDGER, 2, "missing branch"))?;
    let last_synced_commit = lines
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(RepositoryLinkState::new(
        repository,
        branch,
        last_synced_commit,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> TreeSnapshot {
        TreeSnapshot::from_references(vec![
            FileReference::new("readme.md", "aaa111", 12),
            FileReference::new("src/main.c", "bbb222", 2048),
            FileReference::new("empty.txt", "e69de2", 0),
        ])
    }

    #[test]
    fn tree_encoding_layout() {
        let text = encode_tree(&sample_snapshot());
        assert_eq!(
            text,
            "e69de2 0 empty.txt\r\naaa111 12 readme.md\r\nbbb222 2048 src/main.c\r\n"
        );
    }

    #[test]
    fn tree_roundtrip() {
        let snapshot = sample_snapshot();
        let decoded = decode_tree(&encode_tree(&snapshot)).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn empty_tree_ledger_is_empty_snapshot() {
        assert_eq!(encode_tree(&TreeSnapshot::new()), "");
        assert!(decode_tree("").unwrap().is_empty());
        assert!(decode_tree("\r\n").unwrap().is_empty());
    }

    #[test]
    fn tree_accepts_lf_and_missing_terminator() {
        let decoded = decode_tree("h1 1 a.txt\nh2 2 b.txt").unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get("b.txt").unwrap().size, 2);
    }

    #[test]
    fn tree_rejects_malformed_lines() {
        assert!(matches!(
            decode_tree("h1 1 a.txt\r\nh2 two b.txt\r\n"),
            Err(CoreError::InvalidLedger { line: 2, .. })
        ));
        assert!(decode_tree("h1 1\r\n").is_err());
        assert!(decode_tree("h1\r\n").is_err());
        assert!(decode_tree(" 1 a.txt\r\n").is_err());
    }

    #[test]
    fn tree_rejects_duplicate_paths() {
        let err = decode_tree("h1 1 a.txt\r\nh2 2 a.txt\r\n").unwrap_err();
        assert!(err.to_string().contains("duplicate path"));
    }

    #[test]
    fn state_layout_and_roundtrip() {
        let state = RepositoryLinkState::new("konamiman/test", "master", Some("c1".into()));
        let text = encode_state(&state);
        assert_eq!(text, "konamiman/test\r\nmaster\r\nc1\r\n");
        assert_eq!(decode_state(&text).unwrap(), state);
    }

    #[test]
    fn state_without_commit() {
        let state = RepositoryLinkState::new("konamiman/test", "master", None);
        let text = encode_state(&state);
        assert_eq!(text, "konamiman/test\r\nmaster\r\n\r\n");
        assert_eq!(decode_state(&text).unwrap().last_synced_commit, None);
        assert_eq!(
            decode_state("konamiman/test\nmaster").unwrap().last_synced_commit,
            None
        );
    }

    #[test]
    fn state_rejects_missing_lines() {
        assert!(decode_state("").is_err());
        assert!(decode_state("owner/repo\r\n").is_err());
        assert!(decode_state("owner/repo\r\n\r\nc1\r\n").is_err());
    }
}
