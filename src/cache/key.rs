//! Key Module
//!
//! Cache key construction and the mapping from keys to disk paths.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::cache::{CACHE_FILE_EXTENSION, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

// == Build Cache Key ==
/// Combines a caller key and optional namespace into the internal cache key.
///
/// Produces `"{namespace}:{key}"` (or `key` alone). Results longer than
/// [`MAX_KEY_LENGTH`] bytes collapse to their SHA-256 hex digest.
pub fn build_cache_key(key: &str, namespace: Option<&str>) -> Result<String> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }

    let full_key = match namespace {
        Some(ns) => format!("{ns}:{key}"),
        None => key.to_string(),
    };

    if full_key.len() > MAX_KEY_LENGTH {
        return Ok(digest_hex(&full_key));
    }

    Ok(full_key)
}

// == Disk Layout ==
/// File name stem for a cache key.
///
/// Keys made only of `[A-Za-z0-9_.-]` (and not starting with `.`) are used
/// as-is; anything else is replaced by its digest so it cannot escape the
/// cache directory or trip platform filename rules.
pub fn disk_file_stem(cache_key: &str) -> String {
    let safe = !cache_key.starts_with('.')
        && cache_key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));

    if safe {
        cache_key.to_string()
    } else {
        digest_hex(cache_key)
    }
}

/// Path of the file holding `cache_key`: `root/<2-char shard>/<stem>.cache`.
pub fn disk_path(root: &Path, cache_key: &str) -> PathBuf {
    let stem = disk_file_stem(cache_key);
    let shard: String = stem.chars().take(2).collect();
    root.join(shard)
        .join(format!("{stem}.{CACHE_FILE_EXTENSION}"))
}

fn digest_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
