#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `walk` captures the state of a directory tree as an in-memory
//! [`Snapshot`]: one map of regular files and one map of directories, both
//! keyed by the slash-normalized path relative to the walked root. Snapshots
//! are taken once at the start of a reconciliation pass and discarded when
//! the pass completes.
//!
//! # Design
//!
//! Traversal is delegated to `walkdir` with link following enabled, so a
//! symbolic link contributes an entry only when its target resolves to a
//! regular file or directory at walk time. Broken links are skipped with a
//! debug trace rather than failing the walk. Keys use forward slashes on
//! every platform so two snapshots taken on different systems compare
//! identically; the original on-disk path is preserved inside [`FileMeta`]
//! for later I/O.
//!
//! # Errors
//!
//! A missing root yields an empty snapshot. A root that exists but is not a
//! directory, and any traversal failure other than a broken link, abort the
//! walk with a [`WalkError`].

mod error;
mod snapshot;

pub use error::WalkError;
pub use snapshot::{key_for, snapshot, FileMeta, Snapshot};

/// Result alias for snapshot operations.
pub type WalkResult<T> = Result<T, WalkError>;
