use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use task::Task;
use walk::{snapshot, FileMeta};

use crate::batcher::CopyBatcher;
use crate::error::ScanError;
use crate::mode::Mode;
use crate::sink::TaskSink;
use crate::tune::{tune_batching, BatchingOptions};

/// Diffs the source and destination trees and emits reconciliation tasks.
///
/// Snapshots both roots, then walks the source keys in ascending
/// lexicographic order emitting a copy wherever the destination is missing
/// or stale. Mirror mode follows up with deletions for destination-only
/// entries (directories ordered children-first); sync mode instead copies
/// destination-only and destination-newer files back to the source. Small
/// copies are routed through the [`CopyBatcher`], so the emitted stream
/// interleaves single copies with sealed batch tasks.
///
/// When `include_dir` is set, the source root's final path segment is
/// prepended to every key and the destination comparison root is extended
/// by it, so the source directory itself lands inside the destination. The
/// flag is silently dropped when the source has no usable basename.
///
/// # Errors
///
/// Returns [`ScanError`] on empty roots, snapshot failures, batch assembly
/// failures, or a closed sink. The first error stops the scan.
pub fn scan(
    src: &Path,
    dst: &Path,
    include_dir: bool,
    mode: Mode,
    opts: BatchingOptions,
    out: &mut dyn TaskSink,
) -> Result<(), ScanError> {
    if src.as_os_str().is_empty() || dst.as_os_str().is_empty() {
        return Err(ScanError::MissingRoot);
    }

    let clean_src = clean_path(src);
    let clean_dst = clean_path(dst);

    let mut include_dir = include_dir;
    let mut base = String::new();
    let mut dst_root = clean_dst.clone();
    if include_dir {
        match clean_src.file_name() {
            Some(name) if !name.is_empty() => {
                base = name.to_string_lossy().into_owned();
                dst_root = clean_dst.join(&base);
            }
            _ => include_dir = false,
        }
    }

    let src_snap = snapshot(&clean_src)?;
    let dst_snap = snapshot(&dst_root)?;
    debug!(
        mode = %mode,
        src_files = src_snap.files.len(),
        dst_files = dst_snap.files.len(),
        "snapshots complete"
    );

    let src_files = with_prefix(src_snap.files, &base, include_dir);
    let src_dirs = with_prefix(src_snap.dirs, &base, include_dir);
    let dst_files = with_prefix(dst_snap.files, &base, include_dir);
    let dst_dirs = with_prefix(dst_snap.dirs, &base, include_dir);

    let tuned = tune_batching(opts, &src_files);
    let mut batcher = CopyBatcher::new(tuned);

    for (key, src_meta) in &src_files {
        let needs_copy = match dst_files.get(key) {
            None => true,
            Some(dst_meta) => should_copy(src_meta, dst_meta),
        };
        if needs_copy {
            let dst_path = join_key(&clean_dst, key);
            batcher.add(&src_meta.path, &dst_path, src_meta, out)?;
        }
    }
    batcher.flush(out)?;

    match mode {
        Mode::Update => {}
        Mode::Mirror => {
            mirror_deletes(&clean_dst, &dst_files, &dst_dirs, &src_files, &src_dirs, out)?;
        }
        Mode::Sync => {
            sync_back(
                &clean_src,
                &base,
                include_dir,
                &src_files,
                &dst_files,
                &mut batcher,
                out,
            )?;
        }
    }

    Ok(())
}

/// A copy is due when the destination is absent, sized differently, or
/// strictly older. Equal modification times never trigger a copy.
fn should_copy(src: &FileMeta, dst: &FileMeta) -> bool {
    src.len != dst.len || src.modified > dst.modified
}

fn mirror_deletes(
    clean_dst: &Path,
    dst_files: &BTreeMap<String, FileMeta>,
    dst_dirs: &BTreeMap<String, FileMeta>,
    src_files: &BTreeMap<String, FileMeta>,
    src_dirs: &BTreeMap<String, FileMeta>,
    out: &mut dyn TaskSink,
) -> Result<(), ScanError> {
    for (key, dst_meta) in dst_files {
        if src_files.contains_key(key) {
            continue;
        }
        out.accept(Task::delete(dst_meta.path.clone()))?;
    }

    // Longest paths first so a directory's children are removed before the
    // directory itself; ties break lexicographically to keep the stream
    // stable across runs.
    let mut missing: Vec<&String> = dst_dirs
        .keys()
        .filter(|key| !src_dirs.contains_key(*key))
        .collect();
    missing.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    for key in missing {
        out.accept(Task::delete(join_key(clean_dst, key)))?;
    }
    Ok(())
}

fn sync_back(
    clean_src: &Path,
    base: &str,
    include_dir: bool,
    src_files: &BTreeMap<String, FileMeta>,
    dst_files: &BTreeMap<String, FileMeta>,
    batcher: &mut CopyBatcher,
    out: &mut dyn TaskSink,
) -> Result<(), ScanError> {
    for (key, dst_meta) in dst_files {
        if src_files.contains_key(key) {
            continue;
        }
        let Some(src_path) = src_path_for_key(key, clean_src, base, include_dir) else {
            continue;
        };
        batcher.add(&dst_meta.path, &src_path, dst_meta, out)?;
    }

    for (key, src_meta) in src_files {
        let Some(dst_meta) = dst_files.get(key) else {
            continue;
        };
        if dst_meta.modified > src_meta.modified {
            let Some(src_path) = src_path_for_key(key, clean_src, base, include_dir) else {
                continue;
            };
            batcher.add(&dst_meta.path, &src_path, dst_meta, out)?;
        }
    }

    batcher.flush(out)
}

fn with_prefix(
    map: BTreeMap<String, FileMeta>,
    base: &str,
    include: bool,
) -> BTreeMap<String, FileMeta> {
    if !include || base.is_empty() {
        return map;
    }
    map.into_iter()
        .map(|(key, meta)| {
            let key = if key.is_empty() {
                base.to_owned()
            } else {
                format!("{base}/{key}")
            };
            (key, meta)
        })
        .collect()
}

/// Maps a prefixed key back to its on-disk path under the source root.
fn src_path_for_key(key: &str, clean_src: &Path, base: &str, include_dir: bool) -> Option<PathBuf> {
    if !include_dir || base.is_empty() {
        return Some(join_key(clean_src, key));
    }
    if key == base {
        return Some(clean_src.to_path_buf());
    }
    let rest = key.strip_prefix(base)?.strip_prefix('/')?;
    Some(join_key(clean_src, rest))
}

/// Joins a slash-separated snapshot key under `root` using the platform
/// separator.
fn join_key(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in key.split('/') {
        path.push(part);
    }
    path
}

/// Collapses `.` segments and redundant separators, resolving `..`
/// lexically where possible.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = cleaned.pop();
                let at_root = matches!(cleaned.components().next(), Some(Component::RootDir));
                if !popped && !at_root {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}
