//! # ngh storage
//!
//! Working directory access for ngh.
//!
//! This crate provides the local filesystem collaborator used by the sync
//! engine. A [`Workspace`] reads and writes files by root-relative slash
//! paths, enumerates them (excluding the metadata directory), owns the
//! per-path modification marker and persists the two ledgers.
//!
//! ## Design Principles
//!
//! - Workspaces do not interpret ledger contents, `ngh_core` does
//! - Ledgers are replaced wholesale and atomically, never patched
//! - The modification marker is set on every write and cleared only
//!   when the engine confirms a sync
//!
//! ## Available Workspaces
//!
//! - [`DiskWorkspace`] - A real directory with a `.ngh` metadata directory
//! - [`MemoryWorkspace`] - For testing
//!
//! ## Example
//!
//! ```rust
//! use ngh_storage::{MemoryWorkspace, Workspace};
//!
//! let mut workspace = MemoryWorkspace::new();
//! workspace.write("docs/readme.md", b"hello").unwrap();
//! assert!(workspace.is_modified("docs/readme.md").unwrap());
//! assert_eq!(workspace.list_files().unwrap(), vec!["docs/readme.md".to_string()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod disk;
mod error;
mod marks;
mod memory;
mod workspace;

pub use disk::{DiskWorkspace, METADATA_DIR};
pub use error::{StoreError, StoreResult};
pub use marks::{MarkIndex, Stamp};
pub use memory::MemoryWorkspace;
pub use workspace::{LedgerKind, Workspace};
