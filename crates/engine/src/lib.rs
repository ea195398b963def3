#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `engine` executes the task stream produced by the planner. A fixed-size
//! [`Pool`] of worker threads pulls tasks off a shared channel, copies or
//! deletes accordingly, and feeds per-task reports to a single collector
//! that assembles the final [`Report`].
//!
//! # Design
//!
//! Each worker owns an [`Executor`], a small value type holding the
//! verbosity and bandwidth settings. Single-file copies stream through a
//! writer that feeds the destination and a SHA-256 hasher at once; on Linux
//! an unthrottled copy first attempts a kernel `sendfile` transfer and
//! falls back to the buffered path when the syscall declines. Batched
//! copies unpack their tar payload member by member, trusting the entry
//! metadata over the tar headers, and record one digest over the whole
//! archive.
//!
//! # Invariants
//!
//! - A task is consumed by exactly one worker; the producer side observes
//!   backpressure through the shared channel.
//! - Workers keep draining the channel after a failure. The pool retains
//!   the first error and always finalizes the report so callers can
//!   inspect partial progress.
//! - Finalized reports order their copy and delete lists by destination,
//!   making downstream rendering deterministic regardless of worker
//!   scheduling.

mod copy;
mod error;
mod executor;
mod pool;
mod report;
mod zerocopy;

pub use error::{EngineError, EngineResult};
pub use executor::Executor;
pub use pool::{Pool, PoolError};
pub use report::{Report, ReportSnapshot, TaskReport};
