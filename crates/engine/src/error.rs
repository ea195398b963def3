use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for task execution.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while executing tasks.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A batch task arrived without its payload.
    #[error("copy batch task missing payload")]
    MissingBatchPayload,
    /// A destination parent directory could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// Underlying error reported by the operating system.
        source: io::Error,
    },
    /// A file copy failed.
    #[error("failed to copy '{src}' to '{dst}': {source}")]
    Copy {
        /// Source of the failed copy.
        src: PathBuf,
        /// Destination of the failed copy.
        dst: PathBuf,
        /// Underlying error reported by the operating system.
        source: io::Error,
    },
    /// A deletion failed.
    #[error("failed to delete '{path}': {source}")]
    Delete {
        /// The path that could not be removed.
        path: PathBuf,
        /// Underlying error reported by the operating system.
        source: io::Error,
    },
    /// The archive ended before every batch entry had a member.
    #[error("missing archive member for batch entry {index}")]
    MissingMember {
        /// Index of the entry without a member.
        index: usize,
    },
    /// The batch archive could not be read.
    #[error("failed to read batch archive at entry {index}: {source}")]
    Archive {
        /// Index of the entry being read when the failure occurred.
        index: usize,
        /// Underlying error reported while decoding the archive.
        source: io::Error,
    },
    /// An archive member carried fewer bytes than its entry declared.
    #[error("batch entry {index} truncated: expected {expected} bytes, got {actual}")]
    TruncatedMember {
        /// Index of the truncated entry.
        index: usize,
        /// Bytes the entry declared.
        expected: u64,
        /// Bytes actually present.
        actual: u64,
    },
    /// A worker thread died without reporting.
    #[error("worker thread panicked")]
    WorkerPanicked,
}
