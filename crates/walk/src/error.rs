use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error returned when a snapshot cannot be taken.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The root exists but is not a directory.
    #[error("{path} is not a directory")]
    NotADirectory {
        /// The offending root path.
        path: PathBuf,
    },
    /// The root could not be inspected.
    #[error("failed to inspect snapshot root '{path}': {source}")]
    Root {
        /// The root path that failed to stat.
        path: PathBuf,
        /// Underlying error reported by the operating system.
        source: io::Error,
    },
    /// Traversal failed below the root.
    #[error("failed to walk '{path}': {source}")]
    Walk {
        /// The path that could not be visited.
        path: PathBuf,
        /// Underlying error reported by the operating system.
        source: io::Error,
    },
}
