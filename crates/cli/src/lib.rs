#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Thin command-line frontend for the treesync binary.
//!
//! The crate exposes [`run_with`] so the binary stays a few lines: it parses
//! the argument vector, wires the planner thread to either a task listing
//! (`scan`) or the worker pool (`sync`), and maps every failure to a
//! non-zero [`ExitCode`]. All substantive behavior lives in the library
//! crates; this layer only owns argument definitions, logging setup, and
//! output rendering.

mod args;
mod commands;
mod error;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

pub use error::CliError;

use crate::args::{build_cli, CommonOptions, SyncOptions};

/// Parses `args` and runs the selected subcommand.
///
/// Listings and summaries go to `stdout`; diagnostics and error messages go
/// to `stderr`. Returns exit code 0 on success, 2 for argument errors, and
/// 1 for any planning or execution failure.
pub fn run_with<I, T>(args: I, stdout: &mut dyn Write, stderr: &mut dyn Write) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match build_cli().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) => {
            let rendered = err.render();
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    let _ = write!(stdout, "{rendered}");
                    ExitCode::SUCCESS
                }
                _ => {
                    let _ = write!(stderr, "{rendered}");
                    exit_code_from(2)
                }
            };
        }
    };

    let result = match matches.subcommand() {
        Some(("scan", sub)) => CommonOptions::from_matches(sub).and_then(|opts| {
            init_logging(opts.verbose);
            commands::run_scan(opts, stdout)
        }),
        Some(("sync", sub)) => CommonOptions::from_matches(sub).and_then(|opts| {
            init_logging(opts.verbose);
            SyncOptions::from_matches(sub)
                .and_then(|sync_opts| commands::run_sync(opts, sync_opts, stdout))
        }),
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(stderr, "treesync: {err}");
            exit_code_from(1)
        }
    }
}

/// Clamps an integer status into the valid process exit-code range.
#[must_use]
pub fn exit_code_from(status: i32) -> ExitCode {
    ExitCode::from(u8::try_from(status.clamp(0, i32::from(u8::MAX))).unwrap_or(u8::MAX))
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_from_clamps_negative_values() {
        assert_eq!(exit_code_from(-5), ExitCode::from(0));
    }

    #[test]
    fn exit_code_from_clamps_large_values() {
        assert_eq!(exit_code_from(1_000), ExitCode::from(u8::MAX));
    }

    #[test]
    fn exit_code_from_preserves_valid_values() {
        assert_eq!(exit_code_from(42), ExitCode::from(42));
    }

    #[test]
    fn missing_subcommand_is_an_argument_error() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run_with(["treesync"], &mut out, &mut err);
        assert_eq!(code, exit_code_from(2));
        assert!(!err.is_empty());
    }

    #[test]
    fn help_goes_to_stdout_and_succeeds() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run_with(["treesync", "--help"], &mut out, &mut err);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(String::from_utf8_lossy(&out).contains("scan"));
    }

    #[test]
    fn unknown_mode_is_reported() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run_with(
            [
                "treesync",
                "scan",
                "--src",
                "/nonexistent-a",
                "--dst",
                "/nonexistent-b",
                "--mode",
                "replicate",
            ],
            &mut out,
            &mut err,
        );
        assert_eq!(code, exit_code_from(1));
        assert!(String::from_utf8_lossy(&err).contains("unknown mode"));
    }
}
