//! # ngh testkit
//!
//! Test utilities for ngh.
//!
//! This crate provides:
//! - Fixtures pairing a seeded [`ngh_sync_engine::MemoryRemote`] with a
//!   cloned working directory, in memory or on disk
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ngh_testkit::prelude::*;
//!
//! #[test]
//! fn pull_after_remote_change() {
//!     let mut mirror = TestMirror::cloned(&[("a.txt", b"1")]);
//!     mirror.remote.seed_change("main", &[("a.txt", b"2")], &[]);
//!     // ... pull and assert
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
