//! Disk Tier Module
//!
//! Sharded directory of `.cache` files, one per key, with size accounting and
//! modification-time eviction.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::codec::{self, DiskRecord};
use crate::cache::key;
use crate::cache::{CacheEntry, CACHE_FILE_EXTENSION};
use crate::error::{CacheError, Result};

// == Disk File ==
/// A `.cache` file found while walking the tier.
#[derive(Debug, Clone)]
pub struct DiskFile {
    pub path: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

impl DiskFile {
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

// == Disk Tier ==
/// Durable tier rooted at a directory.
///
/// `size` is maintained incrementally on writes and removals and replaced by
/// the measured total whenever the directory is walked.
#[derive(Debug)]
pub struct DiskTier {
    root: PathBuf,
    size: u64,
}

impl DiskTier {
    // == Constructor ==
    /// Opens (creating if needed) the tier at `root` and measures its contents.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let mut tier = Self { root, size: 0 };
        tier.measure();
        Ok(tier)
    }

    pub fn path_for(&self, cache_key: &str) -> PathBuf {
        key::disk_path(&self.root, cache_key)
    }

    /// Tracked size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    // == Write ==
    /// Writes the entry for `cache_key`, replacing any existing file.
    ///
    /// The record is written to a temporary file in the shard directory and
    /// renamed into place so readers never observe a partial file.
    pub fn write(&mut self, cache_key: &str, entry: &CacheEntry) -> Result<()> {
        let bytes = codec::encode_record(cache_key, entry)?;
        let path = self.path_for(cache_key);
        let parent = path
            .parent()
            .ok_or_else(|| CacheError::Internal(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(parent)?;

        let previous_len = file_len(&path);

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;

        self.size = self
            .size
            .saturating_sub(previous_len)
            .saturating_add(bytes.len() as u64);
        Ok(())
    }

    // == Read ==
    /// Reads the record for `cache_key`.
    ///
    /// Returns `Ok(None)` when no file exists and [`CacheError::Corrupt`] when
    /// the file cannot be decoded.
    pub fn read(&self, cache_key: &str) -> Result<Option<DiskRecord>> {
        let path = self.path_for(cache_key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        codec::decode_record(&bytes).map(Some)
    }

    // == Remove ==
    /// Removes the file for `cache_key`. Returns whether a file was removed.
    pub fn remove(&mut self, cache_key: &str) -> Result<bool> {
        let path = self.path_for(cache_key);
        self.remove_path(&path)
    }

    fn remove_path(&mut self, path: &Path) -> Result<bool> {
        let len = file_len(path);
        match fs::remove_file(path) {
            Ok(()) => {
                self.size = self.size.saturating_sub(len);
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a file found by a scan, logging instead of failing.
    fn discard(&mut self, path: &Path, reason: &'static str) -> bool {
        match self.remove_path(path) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(path = %path.display(), reason, error = %err, "failed to remove cache file");
                false
            }
        }
    }

    // == Clear ==
    /// Deletes the whole subtree and recreates an empty root.
    pub fn clear(&mut self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        fs::create_dir_all(&self.root)?;
        self.size = 0;
        Ok(())
    }

    /// Deletes every file whose record was written under `namespace`.
    ///
    /// Unreadable files are left for the sweep. Returns the number removed.
    pub fn remove_namespace(&mut self, namespace: &str) -> usize {
        let mut removed = 0;
        for file in self.scan() {
            let belongs = fs::read(&file.path)
                .ok()
                .and_then(|bytes| codec::decode_record(&bytes).ok())
                .is_some_and(|record| record.entry.namespace.as_deref() == Some(namespace));

            if belongs && self.discard(&file.path, "namespace_clear") {
                removed += 1;
            }
        }
        removed
    }

    // == Sweep ==
    /// Drops expired and undecodable files, then resynchronises the size
    /// counter from the survivors. Returns the number of files removed.
    pub fn sweep(&mut self, now: u64) -> Result<usize> {
        fs::create_dir_all(&self.root)?;

        let mut removed = 0;
        let mut surviving = 0u64;
        for file in self.scan() {
            let record = match fs::read(&file.path) {
                Ok(bytes) => codec::decode_record(&bytes),
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => {
                    debug!(path = %file.path.display(), error = %err, "skipping unreadable cache file");
                    surviving += file.len;
                    continue;
                }
            };

            let reason = match &record {
                Err(_) => Some("corrupt"),
                Ok(record) if record.entry.is_expired_at(now) => Some("expired"),
                Ok(_) => None,
            };

            match reason {
                Some(reason) => {
                    if self.discard(&file.path, reason) {
                        removed += 1;
                    }
                }
                None => surviving += file.len,
            }
        }

        self.size = surviving;
        Ok(removed)
    }

    // == Evict ==
    /// Removes the least recently modified files until `size <= target`.
    /// Returns the number of files removed.
    pub fn evict_to(&mut self, target: u64) -> usize {
        let mut files = self.scan();
        self.size = files.iter().map(|f| f.len).sum();
        if self.size <= target {
            return 0;
        }

        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        let mut removed = 0;
        for file in files {
            if self.size <= target {
                break;
            }
            if self.discard(&file.path, "evicted") {
                removed += 1;
            }
        }
        removed
    }

    // == Measure ==
    /// Walks the tier, resynchronising the size counter. Returns the files found.
    pub fn measure(&mut self) -> Vec<DiskFile> {
        let files = self.scan();
        self.size = files.iter().map(|f| f.len).sum();
        files
    }

    /// Lists every `.cache` file under the root.
    pub fn scan(&self) -> Vec<DiskFile> {
        let mut files = Vec::new();
        for item in WalkDir::new(&self.root).follow_links(false) {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    let vanished = err
                        .io_error()
                        .is_some_and(|io| io.kind() == ErrorKind::NotFound);
                    if !vanished {
                        debug!(error = %err, "failed to walk cache directory");
                    }
                    continue;
                }
            };

            if !item.file_type().is_file()
                || item.path().extension().and_then(|e| e.to_str()) != Some(CACHE_FILE_EXTENSION)
            {
                continue;
            }

            let metadata = match item.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!(path = %item.path().display(), error = %err, "failed to stat cache file");
                    continue;
                }
            };

            files.push(DiskFile {
                path: item.into_path(),
                len: metadata.len(),
                modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            });
        }
        files
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
