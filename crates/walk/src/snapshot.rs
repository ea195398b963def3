use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::WalkError;

/// Metadata captured for a single filesystem entry during a snapshot.
///
/// Populated once during the walk and immutable afterwards.
#[derive(Clone, Debug)]
pub struct FileMeta {
    /// Absolute (or root-relative, when the root was relative) on-disk path.
    pub path: PathBuf,
    /// Size in bytes. Zero for directories.
    pub len: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Unix permission bits; a fixed default on platforms without them.
    pub mode: u32,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Indexed view of a directory tree at a single point in time.
///
/// Keys are relative to the snapshot root, always slash-separated, and never
/// include the root itself. Ordered maps keep key iteration lexicographic,
/// which the planner relies on for deterministic task emission.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Regular files (and followed file symlinks) keyed by relative path.
    pub files: BTreeMap<String, FileMeta>,
    /// Directories keyed by relative path.
    pub dirs: BTreeMap<String, FileMeta>,
}

impl Snapshot {
    /// Returns `true` when the snapshot holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &fs::Metadata) -> u32 {
    0o644
}

/// Converts a root-relative path into a snapshot key.
///
/// Components are joined with `/` regardless of the platform separator so
/// keys from two snapshots compare bytewise.
#[must_use]
pub fn key_for(relative: &Path) -> String {
    let mut key = String::new();
    for component in relative.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key
}

/// Walks `root` and indexes every file and directory beneath it.
///
/// A missing root is a valid empty tree and yields an empty snapshot. A root
/// that exists but is not a directory is an error. Broken symbolic links are
/// skipped with a debug trace.
///
/// # Errors
///
/// Returns [`WalkError`] when the root cannot be inspected, is not a
/// directory, or the traversal fails below it.
pub fn snapshot(root: &Path) -> Result<Snapshot, WalkError> {
    let mut snap = Snapshot::default();

    let root_meta = match fs::metadata(root) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(snap),
        Err(err) => {
            return Err(WalkError::Root {
                path: root.to_path_buf(),
                source: err,
            })
        }
    };
    if !root_meta.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    for entry in WalkDir::new(root).follow_links(true).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // Broken links surface as NotFound once walkdir resolves the
                // target; the tree itself is intact, so keep going.
                if err
                    .io_error()
                    .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
                {
                    debug!(path = ?err.path(), "skipping unresolvable link");
                    continue;
                }
                let path = err
                    .path()
                    .map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                return Err(WalkError::Walk {
                    path,
                    source: err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("walk aborted")),
                });
            }
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                if err
                    .io_error()
                    .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
                {
                    debug!(path = ?entry.path(), "entry vanished during walk");
                    continue;
                }
                return Err(WalkError::Walk {
                    path: entry.path().to_path_buf(),
                    source: err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("metadata unavailable")),
                });
            }
        };

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path());
        let key = key_for(relative);
        if key.is_empty() {
            continue;
        }

        let modified = metadata.modified().map_err(|err| WalkError::Walk {
            path: entry.path().to_path_buf(),
            source: err,
        })?;

        let meta = FileMeta {
            path: entry.path().to_path_buf(),
            len: if metadata.is_dir() { 0 } else { metadata.len() },
            modified,
            mode: permission_bits(&metadata),
            is_dir: metadata.is_dir(),
        };

        if meta.is_dir {
            snap.dirs.insert(key, meta);
        } else {
            snap.files.insert(key, meta);
        }
    }

    Ok(snap)
}
