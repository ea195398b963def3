//! Kernel-assisted copy path for unthrottled transfers.
//!
//! When no bandwidth limit is active, a Linux copy first tries `sendfile`
//! so file bytes never cross into userspace. Errnos that mean "this pairing
//! is not supported" trigger a clean fallback to the buffered path; the
//! digest is then computed with a second pass over the source, which the
//! page cache makes cheap right after the transfer.

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub(crate) fn try_zero_copy(
    src: &std::path::Path,
    dst: &std::path::Path,
) -> std::io::Result<Option<(u64, String)>> {
    use std::fs::{self, File, OpenOptions};
    use std::io::{self, Read, Seek, SeekFrom};
    use std::os::fd::AsRawFd;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    use sha2::{Digest, Sha256};

    use crate::copy::hex_digest;

    // Keep each syscall under a gigabyte so signals interrupt promptly.
    const MAX_CHUNK: u64 = 1 << 30;

    let mut src_file = File::open(src)?;
    let metadata = src_file.metadata()?;
    if !metadata.is_file() {
        return Ok(None);
    }
    let perm = metadata.permissions().mode() & 0o7777;

    let dst_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(perm)
        .open(dst)?;

    let size = metadata.len();
    let mut written: u64 = 0;
    let mut offset: libc::off_t = 0;
    while written < size {
        let chunk = usize::try_from((size - written).min(MAX_CHUNK)).unwrap_or(usize::MAX);
        // SAFETY: both descriptors are owned by this function and stay open
        // for the duration of the call.
        let sent = unsafe {
            libc::sendfile(
                dst_file.as_raw_fd(),
                src_file.as_raw_fd(),
                &mut offset,
                chunk,
            )
        };
        if sent < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::ENOSYS | libc::EINVAL | libc::EOPNOTSUPP | libc::EPERM) => {
                    drop(dst_file);
                    let _ = fs::remove_file(dst);
                    Ok(None)
                }
                Some(libc::EINTR | libc::EAGAIN) => continue,
                _ => Err(err),
            };
        }
        if sent == 0 {
            break;
        }
        written += sent as u64;
    }
    if written < size {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "short sendfile transfer",
        ));
    }

    dst_file.sync_all()?;
    fs::set_permissions(dst, fs::Permissions::from_mode(perm))?;

    src_file.seek(SeekFrom::Start(0))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = src_file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(Some((written, hex_digest(&hasher.finalize()))))
}

/// Platforms without a supported zero-copy syscall always take the
/// buffered fallback.
#[cfg(not(target_os = "linux"))]
pub(crate) fn try_zero_copy(
    _src: &std::path::Path,
    _dst: &std::path::Path,
) -> std::io::Result<Option<(u64, String)>> {
    Ok(None)
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn transfers_bytes_and_reports_the_source_digest() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let payload: Vec<u8> = (0u8..=255).cycle().take(128 * 1024 + 17).collect();
        fs::write(&src, &payload).unwrap();

        let result = try_zero_copy(&src, &dst).unwrap();

        match result {
            Some((written, digest)) => {
                assert_eq!(written, payload.len() as u64);
                assert_eq!(fs::read(&dst).unwrap(), payload);
                assert_eq!(
                    digest,
                    crate::copy::hex_digest(&Sha256::digest(&payload))
                );
            }
            // Some filesystems refuse file-to-file sendfile; the fallback
            // contract is exactly a None here.
            None => assert!(!dst.exists()),
        }
    }

    #[test]
    fn empty_source_copies_cleanly() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("empty.bin");
        let dst = dir.path().join("out.bin");
        fs::write(&src, b"").unwrap();

        if let Some((written, _)) = try_zero_copy(&src, &dst).unwrap() {
            assert_eq!(written, 0);
            assert_eq!(fs::read(&dst).unwrap(), b"");
        }
    }
}
