use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use bandwidth::parse_rate;
use scanner::{BatchingOptions, Mode};

use crate::error::CliError;

pub(crate) fn build_cli() -> Command {
    Command::new("treesync")
        .about("Reconcile two directory trees with batched small-file transfer")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(scan_command())
        .subcommand(sync_command())
}

fn scan_command() -> Command {
    with_common_args(
        Command::new("scan")
            .about("Analyze differences between a source and destination to plan work"),
    )
}

fn sync_command() -> Command {
    with_common_args(
        Command::new("sync").about("Execute the planned work so the trees align"),
    )
    .arg(
        Arg::new("workers")
            .long("workers")
            .value_name("COUNT")
            .value_parser(value_parser!(usize))
            .default_value("4")
            .help("Number of worker threads"),
    )
    .arg(
        Arg::new("bandwidth")
            .long("bandwidth")
            .value_name("RATE")
            .default_value("0")
            .help("Per-copy bandwidth cap in bytes per second, k/m/g suffixes accepted (0 for unlimited)"),
    )
    .arg(
        Arg::new("report-json")
            .long("report-json")
            .value_name("PATH")
            .help("Write the finalized run report to PATH as JSON"),
    )
}

fn with_common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("src")
            .long("src")
            .value_name("PATH")
            .required(true)
            .help("Source directory; a trailing separator means contents-only"),
    )
    .arg(
        Arg::new("dst")
            .long("dst")
            .value_name("PATH")
            .required(true)
            .help("Destination directory"),
    )
    .arg(
        Arg::new("mode")
            .long("mode")
            .value_name("MODE")
            .default_value("update")
            .help("update (one-way copy), mirror (one-way copy + deletes), or sync (bidirectional)"),
    )
    .arg(
        Arg::new("verbose")
            .long("verbose")
            .action(ArgAction::SetTrue)
            .help("Enable verbose output"),
    )
    .arg(
        Arg::new("batch-threshold")
            .long("batch-threshold")
            .value_name("BYTES")
            .value_parser(value_parser!(u64))
            .default_value("0")
            .help("Maximum file size in bytes eligible for batching (0 disables)"),
    )
    .arg(
        Arg::new("batch-max-files")
            .long("batch-max-files")
            .value_name("COUNT")
            .value_parser(value_parser!(usize))
            .default_value("0")
            .help("Maximum files per batch task (0 for unlimited)"),
    )
    .arg(
        Arg::new("batch-max-bytes")
            .long("batch-max-bytes")
            .value_name("BYTES")
            .value_parser(value_parser!(u64))
            .default_value("0")
            .help("Maximum total bytes per batch task (0 for unlimited)"),
    )
    .arg(
        Arg::new("auto-batch")
            .long("auto-batch")
            .action(ArgAction::SetTrue)
            .help("Automatically tune batching parameters from the discovered files"),
    )
}

/// Options shared by `scan` and `sync`.
pub(crate) struct CommonOptions {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub include_dir: bool,
    pub mode: Mode,
    pub verbose: bool,
    pub batching: BatchingOptions,
}

impl CommonOptions {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Result<Self, CliError> {
        let src_raw: &String = matches.get_one("src").expect("src is required");
        let dst_raw: &String = matches.get_one("dst").expect("dst is required");
        let mode_raw: &String = matches.get_one("mode").expect("mode has a default");

        let mode = Mode::parse(mode_raw)?;
        let batching = BatchingOptions {
            threshold: *matches.get_one::<u64>("batch-threshold").unwrap_or(&0),
            max_files: *matches.get_one::<usize>("batch-max-files").unwrap_or(&0),
            max_bytes: *matches.get_one::<u64>("batch-max-bytes").unwrap_or(&0),
            auto_tune: matches.get_flag("auto-batch"),
        };

        Ok(Self {
            src: PathBuf::from(src_raw),
            dst: PathBuf::from(dst_raw),
            // A trailing separator asks for contents-only semantics;
            // otherwise the source directory itself lands in the
            // destination.
            include_dir: !has_trailing_separator(src_raw),
            mode,
            verbose: matches.get_flag("verbose"),
            batching,
        })
    }
}

/// Options specific to `sync`.
#[derive(Debug)]
pub(crate) struct SyncOptions {
    pub workers: usize,
    pub bandwidth_limit: u64,
    pub report_json: Option<PathBuf>,
}

impl SyncOptions {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Result<Self, CliError> {
        let rate_raw: &String = matches.get_one("bandwidth").expect("bandwidth has a default");
        Ok(Self {
            workers: *matches.get_one::<usize>("workers").unwrap_or(&4),
            bandwidth_limit: parse_rate(rate_raw)?,
            report_json: matches.get_one::<String>("report-json").map(PathBuf::from),
        })
    }
}

fn has_trailing_separator(path: &str) -> bool {
    !path.is_empty() && path.ends_with(std::path::MAIN_SEPARATOR)
}
