//! # ngh core
//!
//! Snapshot model and reconciliation rules for ngh.
//!
//! This crate provides:
//! - [`FileReference`], [`TreeSnapshot`] and [`RepositoryLinkState`]
//! - Codecs for the two persisted ledgers (`tree` and `state`)
//! - Local and remote change detection producing a [`ChangeSet`]
//! - The pull conflict resolver and its pluggable [`DecisionProvider`]
//!
//! This is a pure crate with no I/O operations. Reading the working
//! directory and talking to the remote provider live in `ngh_storage`
//! and `ngh_sync_engine`.
//!
//! ## Key Invariants
//!
//! - A [`TreeSnapshot`] holds at most one reference per path
//! - The four sets of a [`ChangeSet`] partition the paths they describe
//! - Local detection trusts the modification marker only, never content
//! - Conflict resolution is deterministic for identical inputs and answers

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod detect;
mod error;
pub mod ledger;
mod model;

pub use conflict::{
    resolve_pull_conflicts, ConflictKind, ConflictRecord, Decision, DecisionProvider,
    PullResolution, PullStrategy, ScriptedDecisions,
};
pub use detect::{detect_local_changes, detect_remote_changes};
pub use error::{CoreError, CoreResult};
pub use model::{ChangeSet, FileReference, RepositoryLinkState, TreeSnapshot};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
