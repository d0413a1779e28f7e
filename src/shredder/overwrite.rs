//! In-place overwrite of a single regular file followed by unlink.
//!
//! The overwrite never changes the file length: the final chunk is truncated
//! to the bytes that remain, so a file of `L` bytes receives exactly `L` bytes
//! of pattern. Partial overwrites are not rolled back; the caller reports the
//! failure and the file stays where it is.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rand::CryptoRng;

use crate::core::errors::{Result, ShredError};
use crate::shredder::pattern::{FillMode, fill};

/// Default write chunk in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Knobs for a single overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwriteOptions {
    pub chunk_size: usize,
    /// Open with `O_SYNC` so each write reaches the device before returning.
    pub sync_writes: bool,
}

impl Default for OverwriteOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sync_writes: true,
        }
    }
}

/// Overwrite every byte of `path` with `mode`, then fsync and close.
///
/// Returns the number of bytes written, which equals the length observed
/// before the first write. Symlinks and non-regular files are rejected.
pub fn overwrite<R: CryptoRng + ?Sized>(
    path: &Path,
    mode: FillMode,
    options: &OverwriteOptions,
    rng: &mut R,
) -> Result<u64> {
    let meta = fs::symlink_metadata(path).map_err(|source| ShredError::io(path, source))?;
    if !meta.file_type().is_file() {
        return Err(ShredError::NotRegularFile {
            path: path.to_path_buf(),
        });
    }
    let len = meta.len();

    let mut file = open_for_overwrite(path, options.sync_writes)?;
    let mut buffer = vec![0_u8; options.chunk_size.max(1)];
    let mut offset = 0_u64;
    let mut filled = false;

    while offset < len {
        let n = chunk_len(offset, len, buffer.len());
        if !filled || mode.refills_per_chunk() {
            fill(&mut buffer, mode, rng);
            filled = true;
        }
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| ShredError::io(path, source))?;
        file.write_all(&buffer[..n])
            .map_err(|source| ShredError::io(path, source))?;
        offset += n as u64;
    }

    file.sync_all()
        .map_err(|source| ShredError::io(path, source))?;
    drop(file);
    Ok(len)
}

/// Remove the directory entry for `path`.
pub fn unlink(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|source| ShredError::io(path, source))
}

/// Overwrite then unlink. Returns bytes overwritten.
pub fn shred<R: CryptoRng + ?Sized>(
    path: &Path,
    mode: FillMode,
    options: &OverwriteOptions,
    rng: &mut R,
) -> Result<u64> {
    let written = overwrite(path, mode, options, rng)?;
    unlink(path)?;
    Ok(written)
}

/// Bytes to write at `offset` for a file of `len` bytes with `chunk`-sized buffers.
pub(crate) fn chunk_len(offset: u64, len: u64, chunk: usize) -> usize {
    let remaining = len.saturating_sub(offset);
    usize::try_from(remaining).map_or(chunk, |r| r.min(chunk))
}

#[cfg(unix)]
fn open_for_overwrite(path: &Path, sync_writes: bool) -> Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut flags = libc::O_NOFOLLOW;
    if sync_writes {
        flags |= libc::O_SYNC;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(flags)
        .open(path)
        .map_err(|source| ShredError::io(path, source))
}

#[cfg(not(unix))]
fn open_for_overwrite(path: &Path, _sync_writes: bool) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| ShredError::io(path, source))
}
