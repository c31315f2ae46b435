//! Binary codec for model files.
//!
//! Two frame kinds, both checksummed with CRC32:
//! - metadata frames: JSON, length-prefixed (small; capped in size)
//! - float frames: raw little-endian `f32`, count-prefixed (large)
//!
//! The file starts with magic bytes and a version byte.

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use crc32fast::Hasher;
use serde::{de::DeserializeOwned, Serialize};

/// Current codec version.
pub const CODEC_VERSION: u8 = 1;

/// Magic bytes identifying an ngramvec model file.
pub const MAGIC: [u8; 4] = *b"NGVC";

/// Metadata frames larger than this are rejected as corrupt.
const MAX_META_SIZE: usize = 512 * 1024 * 1024;

/// Floats are checksummed and written in chunks of this many values.
const FLOAT_CHUNK: usize = 16 * 1024;

fn invalid(msg: String) -> IoError {
    IoError::new(ErrorKind::InvalidData, msg)
}

/// Write the file header (magic + version).
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[CODEC_VERSION])?;
    Ok(())
}

/// Read and validate the file header, returning the version.
pub fn read_header(reader: &mut impl Read) -> IoResult<u8> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(invalid(format!(
            "invalid magic bytes: expected {MAGIC:?}, got {magic:?}"
        )));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != CODEC_VERSION {
        return Err(invalid(format!(
            "unsupported codec version: {} (expected {CODEC_VERSION})",
            version[0]
        )));
    }
    Ok(version[0])
}

/// Writes a JSON metadata frame.
///
/// Format:
/// ```text
/// [length: 4 bytes LE][data: N bytes JSON][crc32: 4 bytes LE]
/// ```
pub fn write_meta<T: Serialize>(writer: &mut impl Write, value: &T) -> IoResult<()> {
    let data = serde_json::to_vec(value)
        .map_err(|e| invalid(format!("serialization failed: {e}")))?;
    let len = u32::try_from(data.len())
        .map_err(|_| invalid(format!("metadata frame of {} bytes is too large", data.len())))?;

    let mut hasher = Hasher::new();
    hasher.update(&data);

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&data)?;
    writer.write_all(&hasher.finalize().to_le_bytes())?;
    Ok(())
}

/// Reads a JSON metadata frame, verifying its checksum.
pub fn read_meta<T: DeserializeOwned>(reader: &mut impl Read) -> IoResult<T> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_META_SIZE {
        return Err(invalid(format!(
            "metadata size {len} exceeds maximum {MAX_META_SIZE}"
        )));
    }

    let mut data = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() != len {
        return Err(IoError::new(ErrorKind::UnexpectedEof, "truncated metadata frame"));
    }
    verify_crc(reader, |h| h.update(&data))?;

    serde_json::from_slice(&data).map_err(|e| invalid(format!("deserialization failed: {e}")))
}

/// Writes a float frame.
///
/// Format:
/// ```text
/// [count: 8 bytes LE][count × f32 LE][crc32: 4 bytes LE]
/// ```
pub fn write_floats(writer: &mut impl Write, values: &[f32]) -> IoResult<()> {
    writer.write_all(&(values.len() as u64).to_le_bytes())?;

    let mut hasher = Hasher::new();
    let mut buf = Vec::with_capacity(FLOAT_CHUNK.min(values.len()) * 4);
    for chunk in values.chunks(FLOAT_CHUNK) {
        buf.clear();
        for v in chunk {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        hasher.update(&buf);
        writer.write_all(&buf)?;
    }
    writer.write_all(&hasher.finalize().to_le_bytes())?;
    Ok(())
}

/// Reads a float frame that must hold exactly `expected` values.
///
/// `expected` comes from the file header and is not trusted: memory grows
/// one chunk at a time as data actually arrives, so a short file fails
/// with `UnexpectedEof` whatever size the header claims.
pub fn read_floats(reader: &mut impl Read, expected: usize) -> IoResult<Vec<f32>> {
    let mut count_bytes = [0u8; 8];
    reader.read_exact(&mut count_bytes)?;
    let count = u64::from_le_bytes(count_bytes);
    if count != expected as u64 {
        return Err(invalid(format!(
            "float frame holds {count} values, expected {expected}"
        )));
    }

    let mut hasher = Hasher::new();
    let mut out = Vec::with_capacity(expected.min(FLOAT_CHUNK));
    let mut buf = vec![0u8; expected.min(FLOAT_CHUNK) * 4];
    let mut remaining = expected;
    while remaining > 0 {
        let n = remaining.min(FLOAT_CHUNK);
        let bytes = &mut buf[..n * 4];
        reader.read_exact(bytes)?;
        hasher.update(bytes);
        out.extend(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        remaining -= n;
    }
    let computed = hasher.finalize();
    check_crc(reader, computed)?;
    Ok(out)
}

fn verify_crc(reader: &mut impl Read, feed: impl FnOnce(&mut Hasher)) -> IoResult<()> {
    let mut hasher = Hasher::new();
    feed(&mut hasher);
    check_crc(reader, hasher.finalize())
}

fn check_crc(reader: &mut impl Read, computed: u32) -> IoResult<()> {
    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes)?;
    let stored = u32::from_le_bytes(crc_bytes);
    if stored != computed {
        return Err(invalid(format!(
            "CRC mismatch: stored={stored:08x}, computed={computed:08x} (data corrupted)"
        )));
    }
    Ok(())
}
