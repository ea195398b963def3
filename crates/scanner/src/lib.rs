#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `scanner` plans the reconciliation of two directory trees. It snapshots
//! the source and destination, diffs them under one of three modes, and
//! emits an ordered stream of tasks for the worker pool: single-file copies,
//! deletions, and batched copies where many small files ride inside one tar
//! archive.
//!
//! # Design
//!
//! [`scan`] is the single entry point. It runs on the producer side of the
//! pipeline and writes into a [`TaskSink`], typically a rendezvous channel
//! whose consumer is the worker pool; the sink's backpressure is what keeps
//! the planner from racing ahead of the workers. The [`CopyBatcher`] is
//! owned exclusively by the planner and is interleaved with diffing so a
//! non-batchable event (an oversized file, a mode switch) flushes the
//! in-progress archive before anything out of order can be emitted.
//!
//! # Invariants
//!
//! - Source-to-destination copies are emitted in ascending lexicographic
//!   order of the normalized relative key, and the stream is identical
//!   across repeated scans of unchanged trees.
//! - In mirror mode, directory deletions are ordered by descending path
//!   length so children always precede their parents.
//! - No batch archive exceeds the configured file-count or byte limits, and
//!   no file larger than the threshold ever enters an archive.

mod batcher;
mod diff;
mod error;
mod mode;
mod sink;
mod tune;

pub use batcher::CopyBatcher;
pub use diff::scan;
pub use error::ScanError;
pub use mode::Mode;
pub use sink::TaskSink;
pub use tune::{tune_batching, BatchingOptions};

/// Result alias for planner operations.
pub type ScanResult<T> = Result<T, ScanError>;
