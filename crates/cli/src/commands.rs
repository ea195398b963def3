use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::thread;

use crossbeam_channel::bounded;
use tracing::debug;

use engine::{Pool, Report};
use scanner::scan;
use task::{Action, Task};

use crate::args::{CommonOptions, SyncOptions};
use crate::error::CliError;

/// Plans the reconciliation and lists every task without executing it.
pub(crate) fn run_scan(opts: CommonOptions, stdout: &mut dyn Write) -> Result<(), CliError> {
    let (producer, tasks) = spawn_planner(&opts);

    for task in tasks {
        print_task(stdout, &task, &opts)?;
    }

    join_planner(producer)
}

/// Plans and executes the reconciliation, then prints a run summary.
pub(crate) fn run_sync(
    opts: CommonOptions,
    sync_opts: SyncOptions,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    let (producer, tasks) = spawn_planner(&opts);

    debug!(
        workers = sync_opts.workers,
        bandwidth = sync_opts.bandwidth_limit,
        "starting worker pool"
    );
    let pool = Pool::new(sync_opts.workers, opts.verbose, sync_opts.bandwidth_limit);
    let report = pool.run(tasks)?;

    print_summary(stdout, &report)?;
    if let Some(path) = &sync_opts.report_json {
        write_report_json(path, &report)?;
    }

    join_planner(producer)
}

type Planner = thread::JoinHandle<Result<(), scanner::ScanError>>;

fn spawn_planner(opts: &CommonOptions) -> (Planner, crossbeam_channel::Receiver<Task>) {
    // Rendezvous channel: the planner blocks until the consumer takes each
    // task, so nothing queues up in memory and order is preserved.
    let (tx, rx) = bounded::<Task>(0);
    let src = opts.src.clone();
    let dst = opts.dst.clone();
    let include_dir = opts.include_dir;
    let mode = opts.mode;
    let batching = opts.batching;
    let producer = thread::spawn(move || {
        let mut sink = tx;
        scan(&src, &dst, include_dir, mode, batching, &mut sink)
    });
    (producer, rx)
}

fn join_planner(producer: Planner) -> Result<(), CliError> {
    match producer.join() {
        Ok(result) => {
            result?;
            Ok(())
        }
        Err(_) => Err(CliError::ProducerPanicked),
    }
}

fn print_task(stdout: &mut dyn Write, task: &Task, opts: &CommonOptions) -> Result<(), CliError> {
    let verbose = opts.verbose;
    match task.action {
        Action::Copy => {
            if verbose {
                writeln!(
                    stdout,
                    "[copy:{}] {} -> {}",
                    opts.mode,
                    task.src.display(),
                    task.dst.display()
                )?;
            } else {
                writeln!(stdout, "{} -> {}", task.src.display(), task.dst.display())?;
            }
        }
        Action::CopyBatch => {
            let (count, bytes) = task
                .batch
                .as_ref()
                .map_or((0, 0), |batch| (batch.entries.len(), batch.payload_bytes()));
            if verbose {
                writeln!(
                    stdout,
                    "[copy-batch:{}] {} files ({} bytes) -> {}",
                    opts.mode,
                    count,
                    bytes,
                    task.dst.display()
                )?;
            } else {
                writeln!(stdout, "batch {} files -> {}", count, task.dst.display())?;
            }
        }
        Action::Delete => {
            if verbose {
                writeln!(stdout, "[delete:{}] {}", opts.mode, task.dst.display())?;
            } else {
                writeln!(stdout, "delete {}", task.dst.display())?;
            }
        }
    }
    Ok(())
}

fn print_summary(stdout: &mut dyn Write, report: &Report) -> Result<(), CliError> {
    writeln!(
        stdout,
        "synchronized {} files ({}) in {:.2}s, {} deleted, {}/s",
        report.copied_file_count(),
        human_bytes(report.total_bytes() as f64),
        report.duration().as_secs_f64(),
        report.delete_count(),
        human_bytes(report.average_speed_bytes()),
    )?;
    Ok(())
}

fn write_report_json(path: &Path, report: &Report) -> Result<(), CliError> {
    let report_err = |source: std::io::Error| CliError::ReportWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(report_err)?;
        }
    }
    let file = File::create(path).map_err(report_err)?;
    serde_json::to_writer_pretty(&file, &report.snapshot())
        .map_err(|source| report_err(source.into()))?;
    file.sync_all().map_err(report_err)
}

fn human_bytes(value: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if value <= 0.0 {
        return "0 B".to_owned();
    }
    let mut value = value;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
