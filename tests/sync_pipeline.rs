//! End-to-end runs: planner feeding the worker pool over the rendezvous
//! channel, verified against the resulting destination tree and report.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use crossbeam_channel::bounded;
use filetime::{set_file_mtime, FileTime};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use engine::{Pool, Report};
use scanner::{scan, BatchingOptions, Mode, ScanError};
use task::Task;

fn write(root: &Path, rel: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Runs the full pipeline: planner thread -> rendezvous channel -> pool.
fn reconcile(
    src: &Path,
    dst: &Path,
    mode: Mode,
    opts: BatchingOptions,
    workers: usize,
    bandwidth: u64,
) -> Report {
    let (tx, rx) = bounded::<Task>(0);
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();
    let planner = thread::spawn(move || -> Result<(), ScanError> {
        let mut sink = tx;
        scan(&src, &dst, false, mode, opts, &mut sink)
    });

    let report = Pool::new(workers, false, bandwidth).run(rx).unwrap();
    planner.join().unwrap().unwrap();
    report
}

#[test]
fn update_run_copies_every_file_and_conserves_bytes() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();

    let files: [(&str, &[u8]); 4] = [
        ("a.txt", b"alpha"),
        ("nested/b.txt", b"bravo"),
        ("nested/deep/c.txt", b"charlie"),
        ("d.bin", b"\x00\x01\x02\x03"),
    ];
    let mut expected_bytes = 0u64;
    for (rel, contents) in files {
        write(src.path(), rel, contents);
        expected_bytes += contents.len() as u64;
    }

    let report = reconcile(
        src.path(),
        dst.path(),
        Mode::Update,
        BatchingOptions::default(),
        4,
        0,
    );

    for (rel, contents) in files {
        assert_eq!(fs::read(dst.path().join(rel)).unwrap(), contents);
    }
    assert_eq!(report.total_bytes(), expected_bytes);
    assert_eq!(report.copied_file_count(), files.len());
    assert_eq!(report.copy_count(), files.len());
    assert_eq!(report.delete_count(), 0);

    // Every copy report carries the digest of its source bytes.
    for (rel, contents) in files {
        let dst_path = dst.path().join(rel).display().to_string();
        let entry = report
            .copies()
            .iter()
            .find(|r| r.destination == dst_path)
            .unwrap();
        assert_eq!(entry.digest, sha256_hex(contents));
    }
}

#[test]
fn batched_run_round_trips_every_member() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();

    let mut expected = Vec::new();
    for i in 0..20 {
        let rel = format!("dir-{}/file-{i:02}.dat", i % 3);
        let contents = format!("payload {i}").repeat(i + 1).into_bytes();
        write(src.path(), &rel, &contents);
        expected.push((rel, contents));
    }

    let opts = BatchingOptions {
        threshold: 4096,
        max_files: 6,
        max_bytes: 0,
        auto_tune: false,
    };
    let report = reconcile(src.path(), dst.path(), Mode::Update, opts, 2, 0);

    let total: u64 = expected.iter().map(|(_, c)| c.len() as u64).sum();
    for (rel, contents) in &expected {
        assert_eq!(&fs::read(dst.path().join(rel)).unwrap(), contents);
    }
    assert_eq!(report.total_bytes(), total);
    assert_eq!(report.copied_file_count(), expected.len());
    // 20 files with at most 6 per batch means at least four batch tasks.
    assert!(report.copy_count() >= 4);
}

#[test]
fn mirror_run_removes_destination_extras() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "keep.txt", b"keep");
    write(dst.path(), "keep.txt", b"stale-but-replaced");
    write(dst.path(), "extra.txt", b"extra");
    write(dst.path(), "old/tree/gone.txt", b"gone");

    let report = reconcile(
        src.path(),
        dst.path(),
        Mode::Mirror,
        BatchingOptions::default(),
        2,
        0,
    );

    assert_eq!(fs::read(dst.path().join("keep.txt")).unwrap(), b"keep");
    assert!(!dst.path().join("extra.txt").exists());
    assert!(!dst.path().join("old").exists());
    assert!(report.delete_count() >= 3);
}

#[test]
fn sync_run_converges_both_trees() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();

    write(src.path(), "ours.txt", b"ours");
    write(dst.path(), "theirs.txt", b"theirs");

    let t0 = SystemTime::now() - Duration::from_secs(3600);
    let shared_src = write(src.path(), "shared.txt", b"old contents");
    let shared_dst = write(dst.path(), "shared.txt", b"new contents");
    set_file_mtime(&shared_src, FileTime::from_system_time(t0)).unwrap();
    set_file_mtime(
        &shared_dst,
        FileTime::from_system_time(t0 + Duration::from_secs(60)),
    )
    .unwrap();

    reconcile(
        src.path(),
        dst.path(),
        Mode::Sync,
        BatchingOptions::default(),
        2,
        0,
    );

    // Each side now holds the other's files, and the newer shared contents
    // won in both places.
    assert_eq!(fs::read(dst.path().join("ours.txt")).unwrap(), b"ours");
    assert_eq!(fs::read(src.path().join("theirs.txt")).unwrap(), b"theirs");
    assert_eq!(
        fs::read(src.path().join("shared.txt")).unwrap(),
        b"new contents"
    );
    assert_eq!(
        fs::read(dst.path().join("shared.txt")).unwrap(),
        b"new contents"
    );
}

#[test]
fn bandwidth_limited_run_is_byte_identical() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let payload: Vec<u8> = (0u8..=255).cycle().take(8 * 1024).collect();
    write(src.path(), "shaped.bin", &payload);

    let report = reconcile(
        src.path(),
        dst.path(),
        Mode::Update,
        BatchingOptions::default(),
        1,
        // Generous limit keeps the test fast while exercising the
        // throttled code path end to end.
        64 * 1024 * 1024,
    );

    assert_eq!(fs::read(dst.path().join("shaped.bin")).unwrap(), payload);
    assert_eq!(report.total_bytes(), payload.len() as u64);
    assert_eq!(report.copies()[0].digest, sha256_hex(&payload));
}

#[test]
fn repeated_runs_reach_a_fixed_point() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "one.txt", b"1");
    write(src.path(), "two/three.txt", b"3");

    let first = reconcile(
        src.path(),
        dst.path(),
        Mode::Mirror,
        BatchingOptions::default(),
        2,
        0,
    );
    assert_eq!(first.copied_file_count(), 2);

    // Second pass sees identical trees and does nothing.
    let second = reconcile(
        src.path(),
        dst.path(),
        Mode::Mirror,
        BatchingOptions::default(),
        2,
        0,
    );
    assert_eq!(second.copied_file_count(), 0);
    assert_eq!(second.delete_count(), 0);
    assert_eq!(second.total_bytes(), 0);
}
