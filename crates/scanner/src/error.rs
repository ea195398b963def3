use std::io;
use std::path::PathBuf;

use thiserror::Error;

use walk::WalkError;

/// Error raised while planning a reconciliation pass.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Source or destination root was empty.
    #[error("source and destination directories are required")]
    MissingRoot,
    /// The requested mode name is not recognized.
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
    /// Snapshotting one of the roots failed.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// A source file could not be read while batching.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// Underlying error reported by the operating system.
        source: io::Error,
    },
    /// Writing into the in-memory batch archive failed.
    #[error("failed to assemble batch archive: {0}")]
    Archive(#[source] io::Error),
    /// The downstream task consumer disconnected before the plan finished.
    #[error("task channel closed before the scan finished")]
    SinkClosed,
}
