use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::num::NonZeroU64;

use sha2::{Digest, Sha256};

use bandwidth::Pacer;

/// Bytes moved and the digest observed while moving them.
pub(crate) struct CopyOutcome {
    pub bytes: u64,
    pub digest: String,
}

/// Streams `src` into `dst`, hashing every byte along the way.
///
/// Without a limit the bytes flow through a writer that feeds the
/// destination and the hasher in one pass. With a limit, a fixed-size loop
/// sleeps off the pacing deficit before each write so the transfer
/// converges on the configured rate.
pub(crate) fn copy_stream<R: Read + ?Sized, W: Write + ?Sized>(
    src: &mut R,
    dst: &mut W,
    limit: Option<NonZeroU64>,
) -> io::Result<CopyOutcome> {
    match limit {
        None => {
            let mut hasher = Sha256::new();
            let bytes = {
                let mut tee = TeeWriter {
                    dest: dst,
                    hasher: &mut hasher,
                };
                io::copy(src, &mut tee)?
            };
            Ok(CopyOutcome {
                bytes,
                digest: hex_digest(&hasher.finalize()),
            })
        }
        Some(limit) => throttled_copy(src, dst, limit),
    }
}

fn throttled_copy<R: Read + ?Sized, W: Write + ?Sized>(
    src: &mut R,
    dst: &mut W,
    limit: NonZeroU64,
) -> io::Result<CopyOutcome> {
    let pacer = Pacer::new(limit);
    let mut buf = vec![0u8; pacer.buffer_len()];
    let mut hasher = Sha256::new();
    let mut written: u64 = 0;

    loop {
        let read = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        pacer.pace(written + read as u64);
        hasher.update(&buf[..read]);
        dst.write_all(&buf[..read])?;
        written += read as u64;
    }

    Ok(CopyOutcome {
        bytes: written,
        digest: hex_digest(&hasher.finalize()),
    })
}

/// Writer that duplicates every byte into a hasher.
struct TeeWriter<'a, W: Write + ?Sized> {
    dest: &'a mut W,
    hasher: &'a mut Sha256,
}

impl<W: Write + ?Sized> Write for TeeWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.dest.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.dest.flush()
    }
}

/// Lowercase hex rendering of a digest.
pub(crate) fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
