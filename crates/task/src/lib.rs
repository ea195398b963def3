#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `task` carries the work items exchanged between the treesync planner and
//! its executors. The planner emits a totally ordered stream of [`Task`]
//! values; a worker consumes each task exactly once and acts on it.
//!
//! The crate is deliberately leaf-level: it holds only data definitions so
//! the scanner, the engine, and the CLI can share them without dragging in
//! each other's dependencies.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of work a [`Task`] describes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Copy a single file from `src` to `dst`.
    #[default]
    Copy,
    /// Remove the path at `dst`. `src` is unused.
    Delete,
    /// Copy every file described by the attached [`BatchPayload`].
    CopyBatch,
}

/// A single unit of work produced by the planner.
///
/// For [`Action::CopyBatch`] the `src`/`dst` fields mirror the first batch
/// entry so listings can show a representative path; the authoritative
/// per-file routing lives in [`BatchPayload::entries`].
#[derive(Clone, Debug)]
pub struct Task {
    /// What to do.
    pub action: Action,
    /// Source path for copy-family actions.
    pub src: PathBuf,
    /// Destination path; the removal target for [`Action::Delete`].
    pub dst: PathBuf,
    /// Batched payload, present only for [`Action::CopyBatch`].
    pub batch: Option<BatchPayload>,
}

impl Task {
    /// Builds a single-file copy task.
    #[must_use]
    pub fn copy(src: PathBuf, dst: PathBuf) -> Self {
        Self {
            action: Action::Copy,
            src,
            dst,
            batch: None,
        }
    }

    /// Builds a deletion task for `dst`.
    #[must_use]
    pub fn delete(dst: PathBuf) -> Self {
        Self {
            action: Action::Delete,
            src: PathBuf::new(),
            dst,
            batch: None,
        }
    }

    /// Builds a batched copy task from an assembled payload.
    ///
    /// The representative `src`/`dst` are lifted from the first entry.
    #[must_use]
    pub fn copy_batch(payload: BatchPayload) -> Self {
        let (src, dst) = match payload.entries.first() {
            Some(entry) => (entry.source.clone(), entry.destination.clone()),
            None => (PathBuf::new(), PathBuf::new()),
        };
        Self {
            action: Action::CopyBatch,
            src,
            dst,
            batch: Some(payload),
        }
    }
}

/// Metadata and serialized contents for a batch of small files.
///
/// `archive` holds a USTAR stream with exactly one regular member per entry,
/// in the same order as `entries`. Members use synthetic names (`file-0`,
/// `file-1`, ...); the real destinations live in the entry list. Consumers
/// must treat the archive as read-only and honor [`BatchEntry::size`] over
/// the tar header when the two disagree.
#[derive(Clone, Debug)]
pub struct BatchPayload {
    /// Per-file routing, ordered to match the archive members.
    pub entries: Vec<BatchEntry>,
    /// The tar archive carrying the file contents.
    pub archive: Vec<u8>,
}

impl BatchPayload {
    /// Sum of the entry sizes, i.e. the payload bytes excluding tar framing.
    #[must_use]
    pub fn payload_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }
}

/// One file inside a batched copy request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Where the bytes were read from.
    pub source: PathBuf,
    /// Where the bytes must be written.
    pub destination: PathBuf,
    /// Exact number of payload bytes for this file.
    pub size: u64,
}
