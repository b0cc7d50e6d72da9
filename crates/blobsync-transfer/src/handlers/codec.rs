//! Payload codec: zlib streams and size validation.

use std::io::{Read, Write};

use blobsync_core::TransferError;
use flate2::Compression as ZlibLevel;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::config::Compression;

/// Decode a fetched payload for item `name`.
///
/// A zlib payload with a bad header or truncated stream is
/// [`TransferError::Corrupt`]. When `expected_size` is known, inflation
/// stops one byte past it.
pub fn decode(
    name: &str,
    compression: Compression,
    data: &[u8],
    expected_size: Option<u64>,
) -> Result<Vec<u8>, TransferError> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Zlib { .. } => inflate(name, data, expected_size),
    }
}

/// Encode a payload for upload.
pub fn encode(compression: Compression, data: &[u8]) -> Result<Vec<u8>, TransferError> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Zlib { level } => deflate(data, level),
    }
}

/// Inflate a zlib stream, reading at most `limit + 1` bytes of output when
/// a limit is given.
pub fn inflate(name: &str, data: &[u8], limit: Option<u64>) -> Result<Vec<u8>, TransferError> {
    let mut out = Vec::new();
    let mut decoder = ZlibDecoder::new(data);
    let read = match limit {
        Some(limit) => decoder
            .take(limit.saturating_add(1))
            .read_to_end(&mut out),
        None => decoder.read_to_end(&mut out),
    };
    read.map_err(|e| TransferError::corrupt(name, e.to_string()))?;
    if let Some(limit) = limit.filter(|limit| out.len() as u64 > *limit) {
        return Err(TransferError::corrupt(
            name,
            format!("inflates past the declared {limit} bytes"),
        ));
    }
    Ok(out)
}

pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>, TransferError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), ZlibLevel::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Fail unless `actual` matches the declared size (if any).
pub fn verify_size(name: &str, expected: Option<u64>, actual: u64) -> Result<(), TransferError> {
    match expected {
        Some(expected) if expected != actual => {
            Err(TransferError::size_mismatch(name, expected, actual))
        }
        _ => Ok(()),
    }
}
