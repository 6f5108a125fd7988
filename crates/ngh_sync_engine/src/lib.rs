//! # ngh sync engine
//!
//! Mirrors a remote Git repository into a local directory through the
//! provider's object-store API, without a local Git installation.
//!
//! This crate provides:
//! - The [`Repository`] handle sequencing clone, link, pull, commit,
//!   reset and branch operations
//! - Repository creation and destruction ([`create_repository`],
//!   [`destroy_repository`])
//! - The pull state machine ([`PullState`])
//! - The [`RemoteRepository`] abstraction with a GitHub REST adapter
//!   ([`GithubRemote`]) and an in-memory provider ([`MemoryRemote`])
//! - The engine error taxonomy ([`SyncError`], [`ErrorKind`])
//!
//! ## Architecture
//!
//! Each operation reads the `state` and `tree` ledgers, talks to the
//! provider, applies file system effects through a
//! [`ngh_storage::Workspace`] and, as its very last step, rewrites the
//! ledgers and the modification markers.
//!
//! ## Key Invariants
//!
//! - Ledgers are rewritten only after every other effect succeeded
//! - Preconditions fail before any remote mutation
//! - Branch refs are advanced without force, so concurrent pushes are
//!   detected instead of overwritten
//! - Remote failures are surfaced as they are, never retried

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod admin;
mod branch;
mod commit;
mod config;
mod error;
mod http;
mod memory_remote;
mod pull;
mod remote;
mod repository;
mod reset;
mod state;

pub use admin::{create_repository, destroy_repository};
pub use config::{Author, EngineConfig};
pub use error::{ErrorKind, FieldError, SyncError, SyncResult};
pub use http::{GithubRemote, HttpClient, HttpResponse, Method, GITHUB_API_URL};
pub use memory_remote::{MemoryRemote, RemoteStats};
pub use pull::looks_like_commit_hash;
pub use remote::{RemoteRepository, EMPTY_TREE_HASH};
pub use repository::{load_link_state, Repository};
pub use reset::pathspec_matches;
pub use state::{
    CloneOutcome, CommitOutcome, LinkOutcome, PullOutcome, PullState, RemoteStatus,
    ResetOutcome, StatusReport, SwitchOutcome,
};
