//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cache::codec::Payload;

// == Cache Entry ==
/// Represents a single cache entry: the encoded payload plus its metadata.
///
/// The same record lives in the memory map and, wrapped in a
/// [`DiskRecord`](crate::cache::codec::DiskRecord), in the entry's disk file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Namespace the key was written under, used for selective clearing
    pub namespace: Option<String>,
    /// Serialized (possibly compressed) value
    pub payload: Vec<u8>,
    /// True if `payload` is zlib-compressed
    pub compressed: bool,
    /// Length of the serialized value before compression
    pub raw_size: u64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read (Unix milliseconds)
    pub last_access_at: u64,
    /// Number of successful reads
    pub access_count: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Recency tie-breaker within the memory tier, never persisted
    #[serde(skip)]
    pub access_seq: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry from an encoded payload.
    ///
    /// # Arguments
    /// * `namespace` - Namespace the key belongs to
    /// * `payload` - Encoded value
    /// * `ttl_seconds` - TTL in seconds; zero or negative never expires
    pub fn new(namespace: Option<String>, payload: Payload, ttl_seconds: i64) -> Self {
        let now = current_timestamp_ms();
        let expires_at = if ttl_seconds > 0 {
            Some(now.saturating_add((ttl_seconds as u64).saturating_mul(1000)))
        } else {
            None
        };

        Self {
            namespace,
            payload: payload.bytes,
            compressed: payload.compressed,
            raw_size: payload.raw_size,
            created_at: now,
            last_access_at: now,
            access_count: 0,
            expires_at,
            access_seq: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now` (Unix milliseconds).
    ///
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self) {
        self.last_access_at = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Stored Size ==
    /// Bytes the payload occupies in a tier. This is the accounting basis for
    /// the memory limit.
    pub fn stored_size(&self) -> u64 {
        self.payload.len() as u64
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms / 1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
