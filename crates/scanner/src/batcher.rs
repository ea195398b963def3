use std::fs::File;
use std::io::BufReader;
use std::mem;
use std::path::Path;
use std::time::UNIX_EPOCH;

use tar::{Builder, EntryType, Header};
use tracing::trace;

use task::{BatchEntry, BatchPayload, Task};
use walk::FileMeta;

use crate::error::ScanError;
use crate::sink::TaskSink;
use crate::tune::BatchingOptions;

/// Tar headers are 512 bytes; used when reserving archive capacity.
const TAR_BLOCK: u64 = 512;
/// Cap on the up-front archive buffer reservation.
const MAX_RESERVE: u64 = 16 << 20;
const MIN_COPY_BUF: u64 = 32 * 1024;
const MAX_COPY_BUF: u64 = 256 * 1024;

/// Accumulates small-file copies into in-memory tar archives.
///
/// The batcher is single-owner state on the planner thread: each `add`
/// either forwards an immediate copy task or appends the file to the
/// archive under construction, and `flush` seals the archive into one
/// [`Task`] carrying a [`BatchPayload`]. Any I/O failure while appending
/// discards the partial archive; a partial batch is never emitted.
pub struct CopyBatcher {
    opts: BatchingOptions,
    builder: Option<Builder<Vec<u8>>>,
    entries: Vec<BatchEntry>,
    total_bytes: u64,
    copy_buf_len: usize,
}

impl CopyBatcher {
    /// Creates a batcher for the resolved options.
    #[must_use]
    pub fn new(opts: BatchingOptions) -> Self {
        let copy_buf_len = if opts.enabled() {
            usize::try_from((opts.threshold / 2).clamp(MIN_COPY_BUF, MAX_COPY_BUF))
                .unwrap_or(MIN_COPY_BUF as usize)
        } else {
            0
        };
        Self {
            opts,
            builder: None,
            entries: Vec::new(),
            total_bytes: 0,
            copy_buf_len,
        }
    }

    /// Routes one planned copy through the batcher.
    ///
    /// Files above the threshold (and every file when batching is disabled)
    /// become immediate copy tasks; anything already buffered is flushed
    /// first so emission order matches planning order.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when the source cannot be read, the archive
    /// cannot be extended, or the sink has closed. The partial batch is
    /// discarded on error.
    pub fn add(
        &mut self,
        src: &Path,
        dst: &Path,
        meta: &FileMeta,
        out: &mut dyn TaskSink,
    ) -> Result<(), ScanError> {
        if !self.opts.enabled() {
            return out.accept(Task::copy(src.to_path_buf(), dst.to_path_buf()));
        }
        if meta.len > self.opts.threshold {
            self.flush(out)?;
            return out.accept(Task::copy(src.to_path_buf(), dst.to_path_buf()));
        }
        if !self.can_add(meta.len) {
            self.flush(out)?;
        }

        if let Err(err) = self.append(src, dst, meta) {
            self.reset();
            return Err(err);
        }

        if self.reached_limits() {
            return self.flush(out);
        }
        Ok(())
    }

    /// Seals the archive under construction into a single batch task.
    ///
    /// A flush with no pending entries is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when finishing the archive fails or the sink
    /// has closed.
    pub fn flush(&mut self, out: &mut dyn TaskSink) -> Result<(), ScanError> {
        if !self.opts.enabled() {
            return Ok(());
        }
        if self.entries.is_empty() {
            self.reset();
            return Ok(());
        }

        let builder = match self.builder.take() {
            Some(builder) => builder,
            None => {
                self.reset();
                return Ok(());
            }
        };
        let archive = match builder.into_inner() {
            Ok(archive) => archive,
            Err(err) => {
                self.reset();
                return Err(ScanError::Archive(err));
            }
        };

        let entries = mem::take(&mut self.entries);
        self.total_bytes = 0;
        trace!(files = entries.len(), bytes = archive.len(), "sealed batch");
        out.accept(Task::copy_batch(BatchPayload { entries, archive }))
    }

    fn append(&mut self, src: &Path, dst: &Path, meta: &FileMeta) -> Result<(), ScanError> {
        let reserve = archive_reserve(&self.opts);
        let builder = self
            .builder
            .get_or_insert_with(|| Builder::new(Vec::with_capacity(reserve)));

        let file = File::open(src).map_err(|source| ScanError::Read {
            path: src.to_path_buf(),
            source,
        })?;
        let reader = BufReader::with_capacity(self.copy_buf_len, file);

        let mut header = Header::new_ustar();
        header.set_entry_type(EntryType::Regular);
        header.set_size(meta.len);
        header.set_mode(meta.mode);
        header.set_mtime(
            meta.modified
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        );

        let name = format!("file-{}", self.entries.len());
        builder
            .append_data(&mut header, name, reader)
            .map_err(|source| ScanError::Read {
                path: src.to_path_buf(),
                source,
            })?;

        self.entries.push(BatchEntry {
            source: src.to_path_buf(),
            destination: dst.to_path_buf(),
            size: meta.len,
        });
        self.total_bytes += meta.len;
        Ok(())
    }

    fn can_add(&self, size: u64) -> bool {
        if !self.opts.enabled() {
            return false;
        }
        if self.opts.max_files > 0 && self.entries.len() >= self.opts.max_files {
            return false;
        }
        if self.opts.max_bytes > 0 && self.total_bytes + size > self.opts.max_bytes {
            return false;
        }
        true
    }

    fn reached_limits(&self) -> bool {
        if !self.opts.enabled() {
            return false;
        }
        (self.opts.max_files > 0 && self.entries.len() >= self.opts.max_files)
            || (self.opts.max_bytes > 0 && self.total_bytes >= self.opts.max_bytes)
    }

    fn reset(&mut self) {
        self.builder = None;
        self.entries.clear();
        self.total_bytes = 0;
    }
}

/// Reserves room for the expected payload plus tar framing, bounded so a
/// generous `max_bytes` cannot balloon the planner's memory.
fn archive_reserve(opts: &BatchingOptions) -> usize {
    if opts.max_bytes == 0 {
        return 0;
    }
    let headers = (opts.max_files as u64 + 1) * TAR_BLOCK;
    usize::try_from((opts.max_bytes + headers).min(MAX_RESERVE)).unwrap_or(0)
}
