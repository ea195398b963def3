use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use thiserror::Error;
use tracing::warn;

use task::Task;

use crate::error::EngineError;
use crate::executor::Executor;
use crate::report::Report;

/// A run that failed part-way through.
///
/// The pool finalizes the report even on failure so callers can inspect
/// partial progress; this error carries both the first failure and that
/// report.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct PoolError {
    report: Report,
    source: EngineError,
}

impl PoolError {
    /// The first error a worker observed.
    #[must_use]
    pub fn error(&self) -> &EngineError {
        &self.source
    }

    /// The finalized partial report.
    #[must_use]
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Consumes the error, yielding the partial report.
    #[must_use]
    pub fn into_report(self) -> Report {
        self.report
    }
}

/// Fixed-size pool of worker threads executing the planner's task stream.
pub struct Pool {
    workers: usize,
    verbose: bool,
    bandwidth_limit: u64,
}

impl Pool {
    /// Creates a pool. Worker counts below one are coerced to one; a
    /// bandwidth limit of zero disables pacing.
    #[must_use]
    pub fn new(workers: usize, verbose: bool, bandwidth_limit: u64) -> Self {
        Self {
            workers: workers.max(1),
            verbose,
            bandwidth_limit,
        }
    }

    /// Drains `tasks` to completion and returns the finalized report.
    ///
    /// Workers pull from the shared channel until the producer drops its
    /// sender. Execution order across workers is unspecified; the report's
    /// task lists are sorted on finalize. Workers do not stop on a sibling's
    /// failure, so a failed run still yields a complete picture of what
    /// did succeed.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] wrapping the first failure and the finalized
    /// partial report.
    pub fn run(&self, tasks: Receiver<Task>) -> Result<Report, PoolError> {
        let (report_tx, report_rx) = unbounded();
        let (err_tx, err_rx) = unbounded();

        let collected = Report::new();
        let collector = thread::spawn(move || {
            let mut report = collected;
            for task_report in report_rx {
                report.record(task_report);
            }
            report
        });

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let tasks = tasks.clone();
            let report_tx = report_tx.clone();
            let err_tx = err_tx.clone();
            let executor = Executor::new(self.verbose, self.bandwidth_limit);
            handles.push(thread::spawn(move || {
                for task in tasks.iter() {
                    match executor.run_task(task) {
                        Ok(task_report) => {
                            if report_tx.send(task_report).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "task failed");
                            if err_tx.send(err).is_err() {
                                break;
                            }
                        }
                    }
                }
            }));
        }
        drop(report_tx);
        drop(err_tx);
        drop(tasks);

        let mut worker_panicked = false;
        for handle in handles {
            if handle.join().is_err() {
                worker_panicked = true;
            }
        }

        let mut report = match collector.join() {
            Ok(report) => report,
            Err(_) => {
                worker_panicked = true;
                Report::new()
            }
        };
        report.finalize();

        let first_error = err_rx
            .try_iter()
            .next()
            .or_else(|| worker_panicked.then_some(EngineError::WorkerPanicked));
        match first_error {
            None => Ok(report),
            Some(source) => Err(PoolError { report, source }),
        }
    }
}
