use std::io;
use std::path::PathBuf;

use thiserror::Error;

use bandwidth::RateParseError;
use engine::PoolError;
use scanner::ScanError;

/// Failures surfaced by the command-line frontend.
#[derive(Debug, Error)]
pub enum CliError {
    /// Planning the reconciliation failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// Executing the plan failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The `--bandwidth` value could not be parsed.
    #[error("invalid --bandwidth value: {0}")]
    Rate(#[from] RateParseError),
    /// The report file could not be written.
    #[error("failed to write report to '{path}': {source}")]
    ReportWrite {
        /// Requested report path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Writing to the output stream failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    /// The planner thread died without returning.
    #[error("planner thread panicked")]
    ProducerPanicked,
}
