use std::fs::{self, File};
use std::io::{self, Read};
use std::num::NonZeroU64;
use std::path::Path;
use std::time::{Instant, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use task::{Action, BatchPayload, Task};

use crate::copy::{copy_stream, hex_digest};
use crate::error::{EngineError, EngineResult};
use crate::report::TaskReport;
use crate::zerocopy::try_zero_copy;

/// Executes individual tasks: single copies, batched copies, and deletes.
///
/// An `Executor` is a small value holding the knobs a worker needs; the
/// pool hands one to every worker thread, and embedders running remote
/// task streams can drive one directly.
#[derive(Clone, Copy, Debug)]
pub struct Executor {
    verbose: bool,
    bandwidth_limit: Option<NonZeroU64>,
}

impl Executor {
    /// Creates an executor. A `bandwidth_limit` of zero disables pacing.
    #[must_use]
    pub fn new(verbose: bool, bandwidth_limit: u64) -> Self {
        Self {
            verbose,
            bandwidth_limit: NonZeroU64::new(bandwidth_limit),
        }
    }

    /// Runs one task to completion and describes the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the filesystem operation fails or the
    /// task payload is malformed. No partial report is produced on error.
    pub fn run_task(&self, task: Task) -> EngineResult<TaskReport> {
        match task.action {
            Action::Copy => {
                if self.verbose {
                    info!(src = %task.src.display(), dst = %task.dst.display(), "copy");
                } else {
                    debug!(src = %task.src.display(), dst = %task.dst.display(), "copy");
                }
                let started_at = SystemTime::now();
                let clock = Instant::now();
                let (bytes, digest) = self.copy_file(&task.src, &task.dst)?;
                Ok(TaskReport {
                    action: Action::Copy,
                    source: task.src.display().to_string(),
                    destination: task.dst.display().to_string(),
                    bytes,
                    digest,
                    started_at,
                    duration: clock.elapsed(),
                    batch_entries: Vec::new(),
                })
            }
            Action::CopyBatch => {
                let payload = task.batch.ok_or(EngineError::MissingBatchPayload)?;
                if self.verbose {
                    info!(files = payload.entries.len(), "copy batch");
                } else {
                    debug!(files = payload.entries.len(), "copy batch");
                }
                let started_at = SystemTime::now();
                let clock = Instant::now();
                let (bytes, digest) = self.copy_batch(&payload)?;
                let (source, destination) = match payload.entries.first() {
                    Some(first) => (
                        first.source.display().to_string(),
                        format!(
                            "{} (batch of {} files)",
                            first.destination.display(),
                            payload.entries.len()
                        ),
                    ),
                    None => (String::new(), "batch of 0 files".to_owned()),
                };
                Ok(TaskReport {
                    action: Action::CopyBatch,
                    source,
                    destination,
                    bytes,
                    digest,
                    started_at,
                    duration: clock.elapsed(),
                    batch_entries: payload.entries,
                })
            }
            Action::Delete => {
                if self.verbose {
                    info!(dst = %task.dst.display(), "delete");
                } else {
                    debug!(dst = %task.dst.display(), "delete");
                }
                let started_at = SystemTime::now();
                let clock = Instant::now();
                delete_path(&task.dst).map_err(|source| EngineError::Delete {
                    path: task.dst.clone(),
                    source,
                })?;
                Ok(TaskReport {
                    action: Action::Delete,
                    source: String::new(),
                    destination: task.dst.display().to_string(),
                    bytes: 0,
                    digest: String::new(),
                    started_at,
                    duration: clock.elapsed(),
                    batch_entries: Vec::new(),
                })
            }
        }
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> EngineResult<(u64, String)> {
        create_parents(dst)?;

        if self.bandwidth_limit.is_none() {
            let attempted = try_zero_copy(src, dst).map_err(|source| EngineError::Copy {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
                source,
            })?;
            if let Some(done) = attempted {
                return Ok(done);
            }
        }

        let copy_err = |source: io::Error| EngineError::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source,
        };
        let mut reader = File::open(src).map_err(copy_err)?;
        let mut writer = File::create(dst).map_err(copy_err)?;
        let outcome = copy_stream(&mut reader, &mut writer, self.bandwidth_limit).map_err(copy_err)?;
        writer.sync_all().map_err(copy_err)?;
        Ok((outcome.bytes, outcome.digest))
    }

    fn copy_batch(&self, payload: &BatchPayload) -> EngineResult<(u64, String)> {
        let digest = hex_digest(&Sha256::digest(&payload.archive));

        let mut archive = tar::Archive::new(payload.archive.as_slice());
        let mut members = archive
            .entries()
            .map_err(|source| EngineError::Archive { index: 0, source })?;

        let mut total: u64 = 0;
        for (index, entry) in payload.entries.iter().enumerate() {
            let member = members
                .next()
                .ok_or(EngineError::MissingMember { index })?
                .map_err(|source| EngineError::Archive { index, source })?;

            create_parents(&entry.destination)?;
            let copy_err = |source: io::Error| EngineError::Copy {
                src: entry.source.clone(),
                dst: entry.destination.clone(),
                source,
            };
            let mut writer = File::create(&entry.destination).map_err(copy_err)?;
            // The entry size is authoritative when it disagrees with the
            // tar header.
            let mut limited = member.take(entry.size);
            let outcome =
                copy_stream(&mut limited, &mut writer, self.bandwidth_limit).map_err(copy_err)?;
            writer.sync_all().map_err(copy_err)?;
            total += outcome.bytes;
            if outcome.bytes != entry.size {
                return Err(EngineError::TruncatedMember {
                    index,
                    expected: entry.size,
                    actual: outcome.bytes,
                });
            }
        }

        Ok((total, digest))
    }
}

fn create_parents(path: &Path) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| EngineError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Removes a file or directory tree; an already-absent path is success.
fn delete_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
    }
}
