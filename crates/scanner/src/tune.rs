use std::collections::BTreeMap;

use tracing::debug;

use walk::FileMeta;

/// Files larger than this are never worth batching.
const SMALL_FILE_CUTOFF: u64 = 512 * 1024;
/// Fewer small files than this and batching is not worth enabling.
const MIN_SMALL_FILES: usize = 4;
const MIN_THRESHOLD: u64 = 4 * 1024;
const MIN_TARGET_BATCH: u64 = 1 << 20;
const MAX_TARGET_BATCH: u64 = 8 << 20;
const MIN_BATCH_FILES: usize = 8;
const MAX_BATCH_FILES: usize = 512;

/// Knobs controlling how small-file copies are grouped into batches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchingOptions {
    /// Maximum per-file size eligible for batching. Zero disables batching.
    pub threshold: u64,
    /// Maximum files per batch. Zero means unlimited.
    pub max_files: usize,
    /// Maximum total payload bytes per batch. Zero means unlimited.
    pub max_bytes: u64,
    /// Derive the three limits above from the observed source files.
    pub auto_tune: bool,
}

impl BatchingOptions {
    /// Whether batching is active under these options.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.threshold > 0
    }
}

/// Chooses concrete batching parameters from the observed source files.
///
/// Returns `opts` unchanged when auto-tuning is off or any limit was set
/// manually; manual values always win. Tuning also declines when the tree
/// has too few small files for batching to pay off.
#[must_use]
pub fn tune_batching(opts: BatchingOptions, files: &BTreeMap<String, FileMeta>) -> BatchingOptions {
    if !opts.auto_tune {
        return opts;
    }
    if opts.threshold > 0 || opts.max_files > 0 || opts.max_bytes > 0 {
        // Manual overrides always win.
        return opts;
    }

    let mut small: Vec<u64> = files
        .values()
        .map(|meta| meta.len)
        .filter(|len| *len <= SMALL_FILE_CUTOFF)
        .collect();
    if small.len() < MIN_SMALL_FILES {
        return opts;
    }
    small.sort_unstable();

    let total: u64 = small.iter().sum();
    let avg = (total / small.len() as u64).max(1);

    let mut median = percentile(&small, 0.5);
    if median == 0 {
        median = avg;
    }
    let mut p90 = percentile(&small, 0.9);
    if p90 == 0 {
        p90 = median;
    }

    let threshold = p90.max(2 * median).max(MIN_THRESHOLD).min(SMALL_FILE_CUTOFF);

    // Aim for batches around a few megabytes so a worker only has to unpack
    // a handful of archives per second.
    let target_bytes = (avg * 64)
        .clamp(MIN_TARGET_BATCH, MAX_TARGET_BATCH)
        .max(threshold * 4);

    let max_files =
        usize::try_from(target_bytes / avg).map_or(MAX_BATCH_FILES, |files_per_batch| {
            files_per_batch.clamp(MIN_BATCH_FILES, MAX_BATCH_FILES)
        });

    let tuned = BatchingOptions {
        threshold,
        max_files,
        max_bytes: target_bytes,
        auto_tune: opts.auto_tune,
    };
    debug!(
        threshold = tuned.threshold,
        max_files = tuned.max_files,
        max_bytes = tuned.max_bytes,
        "auto-tuned batching parameters"
    );
    tuned
}

/// Percentile over an ascending-sorted slice using `ceil(p * n) - 1`,
/// clamped to the valid index range.
fn percentile(sorted: &[u64], pct: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    if pct <= 0.0 {
        return sorted[0];
    }
    if pct >= 1.0 {
        return sorted[sorted.len() - 1];
    }
    let idx = (pct * sorted.len() as f64).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}
