//! Codec Module
//!
//! Value serialization, conditional zlib compression, and the on-disk record format.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheValue};
use crate::config::MAX_COMPRESSION_LEVEL;
use crate::error::{CacheError, Result};

// == Payload ==
/// An encoded value ready to be stored in either tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Serialized bytes, compressed when `compressed` is set
    pub bytes: Vec<u8>,
    /// Whether `bytes` went through zlib
    pub compressed: bool,
    /// Serialized length before compression
    pub raw_size: u64,
}

// == Encode ==
/// Serializes `value` and compresses it when worthwhile.
///
/// Compression is attempted only when the serialized size is at least
/// `threshold`, and the compressed form is kept only if it is strictly smaller.
pub fn encode(value: &CacheValue, threshold: usize, level: u32) -> Result<Payload> {
    let serialized = bincode::serialize(value)?;
    let raw_size = serialized.len() as u64;

    if serialized.len() >= threshold {
        let compressed = compress(&serialized, level)?;
        if compressed.len() < serialized.len() {
            return Ok(Payload {
                bytes: compressed,
                compressed: true,
                raw_size,
            });
        }
    }

    Ok(Payload {
        bytes: serialized,
        compressed: false,
        raw_size,
    })
}

// == Decode ==
/// Restores a value from its stored bytes.
///
/// Any failure means the stored bytes are unusable and is reported as
/// [`CacheError::Corrupt`].
pub fn decode(bytes: &[u8], compressed: bool) -> Result<CacheValue> {
    let decompressed;
    let raw = if compressed {
        decompressed = decompress(bytes)?;
        decompressed.as_slice()
    } else {
        bytes
    };

    bincode::deserialize(raw).map_err(|e| CacheError::Corrupt(format!("undecodable value: {e}")))
}

fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::new(level.min(MAX_COMPRESSION_LEVEL)),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Corrupt(format!("bad zlib stream: {e}")))?;
    Ok(out)
}

// == Disk Record ==
/// Contents of one `.cache` file.
///
/// The full cache key is stored next to the entry so a file whose name
/// matches but whose key does not is recognised as a collision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskRecord {
    pub key: String,
    pub entry: CacheEntry,
}

pub fn encode_record(key: &str, entry: &CacheEntry) -> Result<Vec<u8>> {
    #[derive(Serialize)]
    struct DiskRecordRef<'a> {
        key: &'a str,
        entry: &'a CacheEntry,
    }

    Ok(bincode::serialize(&DiskRecordRef { key, entry })?)
}

pub fn decode_record(bytes: &[u8]) -> Result<DiskRecord> {
    bincode::deserialize(bytes).map_err(|e| CacheError::Corrupt(format!("undecodable record: {e}")))
}
