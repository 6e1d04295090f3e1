//! Cache Store Module
//!
//! Main cache engine combining the memory and disk tiers with TTL expiration,
//! conditional compression and capacity-driven eviction.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::cache::codec;
use crate::cache::disk::DiskTier;
use crate::cache::entry::current_timestamp_ms;
use crate::cache::key::{build_cache_key, disk_file_stem};
use crate::cache::memory::MemoryTier;
use crate::cache::stats::{usage_percent, CacheStats, CacheStatsReport};
use crate::cache::{CacheEntry, CacheValue, EVICTION_TARGET_PERCENT};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Placement ==
/// Which tiers a write goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// Memory and disk
    #[default]
    Both,
    MemoryOnly,
    DiskOnly,
}

// == Set Options ==
/// Options for [`CacheStore::set_with`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL in seconds; `None` uses the configured default, zero or negative never expires
    pub ttl: Option<i64>,
    pub namespace: Option<String>,
    pub placement: Placement,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, seconds: i64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn memory_only(mut self) -> Self {
        self.placement = Placement::MemoryOnly;
        self
    }

    pub fn disk_only(mut self) -> Self {
        self.placement = Placement::DiskOnly;
        self
    }
}

// == Get Options ==
/// Options for [`CacheStore::get_with`].
#[derive(Debug, Clone)]
pub struct GetOptions {
    pub namespace: Option<String>,
    /// When false the read neither touches the entry nor counts as a hit or miss
    pub update_stats: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            update_stats: true,
        }
    }
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn without_stats(mut self) -> Self {
        self.update_stats = false;
        self
    }
}

// == Entry Info ==
/// Metadata about a stored entry, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub in_memory: bool,
    pub on_disk: bool,
    pub namespace: Option<String>,
    pub compressed: bool,
    pub raw_size: u64,
    pub stored_size: u64,
    pub access_count: u64,
    pub created_at: u64,
    pub expires_at: Option<u64>,
    pub expired: bool,
}

// == Cache Store ==
/// Two-tier cache handle.
///
/// Cloning is cheap and every clone shares the same tiers. A single mutex
/// serialises access to the memory map, the disk directory and the counters.
#[derive(Debug, Clone)]
pub struct CacheStore {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    config: Config,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    memory: MemoryTier,
    disk: DiskTier,
    stats: CacheStats,
}

/// Outcome of checking a stored entry.
enum Probe {
    Hit(CacheValue),
    Expired,
    Corrupt(CacheError),
}

fn probe(entry: &CacheEntry, now: u64) -> Probe {
    if entry.is_expired_at(now) {
        return Probe::Expired;
    }
    match codec::decode(&entry.payload, entry.compressed) {
        Ok(value) => Probe::Hit(value),
        Err(err) => Probe::Corrupt(err),
    }
}

/// Eviction stops once usage drops to this share of the limit.
fn eviction_target(limit: u64) -> u64 {
    (u128::from(limit) * u128::from(EVICTION_TARGET_PERCENT) / 100) as u64
}

impl CacheStore {
    // == Constructor ==
    /// Opens the cache described by `config`, creating the disk directory if needed.
    pub fn open(config: Config) -> Result<Self> {
        let disk = DiskTier::open(&config.cache_dir)?;
        info!(
            cache_dir = %config.cache_dir.display(),
            memory_limit = config.memory_limit,
            disk_limit = config.disk_limit,
            disk_size = disk.size(),
            "cache opened"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State {
                    memory: MemoryTier::new(),
                    disk,
                    stats: CacheStats::new(),
                }),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock()
    }

    // == Set ==
    /// Stores a value under `key` in both tiers with the default TTL.
    pub fn set(&self, key: &str, value: impl Into<CacheValue>) -> bool {
        self.set_with(key, value, &SetOptions::default())
    }

    /// Stores a value with explicit options.
    ///
    /// Returns false if the value could not be encoded or written; the failure
    /// is logged and the value should be treated as not cached.
    pub fn set_with(&self, key: &str, value: impl Into<CacheValue>, opts: &SetOptions) -> bool {
        match self.try_set(key, &value.into(), opts) {
            Ok(()) => true,
            Err(err) => {
                error!(key, error = %err, "failed to store cache entry");
                false
            }
        }
    }

    /// Fallible form of [`set_with`](Self::set_with).
    pub fn try_set(&self, key: &str, value: &CacheValue, opts: &SetOptions) -> Result<()> {
        let config = &self.shared.config;
        let cache_key = build_cache_key(key, opts.namespace.as_deref())?;
        let payload = codec::encode(
            value,
            config.compression_threshold,
            config.compression_level,
        )?;
        let entry = CacheEntry::new(
            opts.namespace.clone(),
            payload,
            opts.ttl.unwrap_or(config.default_ttl),
        );

        let mut state = self.lock();
        if let Err(err) = Self::place_locked(&mut state, &cache_key, entry, opts.placement) {
            // The previous value must not outlive a failed overwrite
            state.memory.remove(&cache_key);
            self.remove_disk_quietly(&mut state, &cache_key);
            return Err(err);
        }

        if state.memory.size() > config.memory_limit || state.disk.size() > config.disk_limit {
            match self.cleanup_locked(&mut state) {
                Ok(removed) => debug!(key, removed, "capacity cleanup after write"),
                Err(err) => warn!(key, error = %err, "capacity cleanup after write failed"),
            }
        }

        Ok(())
    }

    fn place_locked(
        state: &mut State,
        cache_key: &str,
        entry: CacheEntry,
        placement: Placement,
    ) -> Result<()> {
        match placement {
            Placement::Both => {
                state.disk.write(cache_key, &entry)?;
                state.memory.insert(cache_key.to_string(), entry);
            }
            Placement::MemoryOnly => {
                state.disk.remove(cache_key)?;
                state.memory.insert(cache_key.to_string(), entry);
            }
            Placement::DiskOnly => {
                state.memory.remove(cache_key);
                state.disk.write(cache_key, &entry)?;
            }
        }
        Ok(())
    }

    // == Get ==
    /// Retrieves the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        self.get_with(key, &GetOptions::default())
    }

    /// Retrieves a value with explicit options.
    ///
    /// The memory tier is consulted first. A disk hit is promoted into memory.
    /// Expired and undecodable entries are removed and reported as a miss.
    pub fn get_with(&self, key: &str, opts: &GetOptions) -> Option<CacheValue> {
        let cache_key = match build_cache_key(key, opts.namespace.as_deref()) {
            Ok(cache_key) => cache_key,
            Err(err) => {
                debug!(key, error = %err, "rejected cache lookup");
                return None;
            }
        };

        let mut state = self.lock();
        let found = self.lookup_locked(&mut state, &cache_key, opts.update_stats);

        if opts.update_stats {
            match found {
                Some(_) => state.stats.record_hit(),
                None => state.stats.record_miss(),
            }
        }
        found
    }

    fn lookup_locked(
        &self,
        state: &mut State,
        cache_key: &str,
        touch: bool,
    ) -> Option<CacheValue> {
        let now = current_timestamp_ms();

        // Memory tier
        match state.memory.get(cache_key).map(|entry| probe(entry, now)) {
            Some(Probe::Hit(value)) => {
                if touch {
                    state.memory.touch(cache_key);
                }
                return Some(value);
            }
            Some(Probe::Expired) => {
                state.memory.remove(cache_key);
                state.stats.record_expirations(1);
            }
            Some(Probe::Corrupt(err)) => {
                warn!(key = cache_key, error = %err, "dropping undecodable memory entry");
                state.memory.remove(cache_key);
            }
            None => {}
        }

        // Disk tier
        let record = match state.disk.read(cache_key) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err @ CacheError::Corrupt(_)) => {
                warn!(key = cache_key, error = %err, "removing corrupt cache file");
                self.remove_disk_quietly(state, cache_key);
                return None;
            }
            Err(err) => {
                warn!(key = cache_key, error = %err, "failed to read cache file");
                return None;
            }
        };

        if record.key != cache_key {
            debug!(key = cache_key, stored = %record.key, "cache file belongs to another key");
            return None;
        }

        match probe(&record.entry, now) {
            Probe::Hit(value) => {
                self.promote_locked(state, cache_key.to_string(), record.entry, touch);
                Some(value)
            }
            Probe::Expired => {
                self.remove_disk_quietly(state, cache_key);
                state.stats.record_expirations(1);
                None
            }
            Probe::Corrupt(err) => {
                warn!(key = cache_key, error = %err, "removing undecodable cache file");
                self.remove_disk_quietly(state, cache_key);
                None
            }
        }
    }

    /// Copies a disk hit into the memory tier, evicting there if it overflows.
    ///
    /// The promoted entry is always the most recent one in memory; `touch`
    /// additionally counts the access.
    fn promote_locked(
        &self,
        state: &mut State,
        cache_key: String,
        mut entry: CacheEntry,
        touch: bool,
    ) {
        let limit = self.shared.config.memory_limit;
        if touch {
            state.memory.insert(cache_key.clone(), entry);
            state.memory.touch(&cache_key);
        } else {
            entry.last_access_at = current_timestamp_ms();
            state.memory.insert(cache_key, entry);
        }

        if state.memory.size() > limit {
            let evicted = state.memory.evict_to(eviction_target(limit));
            state.stats.record_evictions(evicted.len());
        }
    }

    fn remove_disk_quietly(&self, state: &mut State, cache_key: &str) {
        if let Err(err) = state.disk.remove(cache_key) {
            warn!(key = cache_key, error = %err, "failed to remove cache file");
        }
    }

    // == Delete ==
    /// Removes `key` from both tiers.
    ///
    /// Returns false only if the disk file could not be removed.
    pub fn delete(&self, key: &str, namespace: Option<&str>) -> bool {
        match self.try_delete(key, namespace) {
            Ok(()) => true,
            Err(err) => {
                error!(key, error = %err, "failed to delete cache entry");
                false
            }
        }
    }

    pub fn try_delete(&self, key: &str, namespace: Option<&str>) -> Result<()> {
        let cache_key = build_cache_key(key, namespace)?;
        let mut state = self.lock();
        state.memory.remove(&cache_key);
        state.disk.remove(&cache_key)?;
        Ok(())
    }

    // == Clear ==
    /// Removes every entry written under `namespace`, or everything when `None`.
    pub fn clear(&self, namespace: Option<&str>) -> bool {
        match self.try_clear(namespace) {
            Ok(()) => true,
            Err(err) => {
                error!(namespace = ?namespace, error = %err, "failed to clear cache");
                false
            }
        }
    }

    pub fn try_clear(&self, namespace: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        match namespace {
            Some(namespace) => {
                let memory = state.memory.remove_namespace(namespace);
                let disk = state.disk.remove_namespace(namespace);
                info!(namespace, memory, disk, "cleared cache namespace");
            }
            None => {
                state.memory.clear();
                state.disk.clear()?;
                info!("cleared cache");
            }
        }
        Ok(())
    }

    // == Cleanup ==
    /// Removes expired entries and evicts down to 80% of any exceeded limit.
    ///
    /// Returns the number of entries removed across both tiers.
    pub fn cleanup(&self) -> usize {
        match self.try_cleanup() {
            Ok(removed) => removed,
            Err(err) => {
                error!(error = %err, "cache cleanup failed");
                0
            }
        }
    }

    /// Fallible form of [`cleanup`](Self::cleanup), used by the background task.
    pub fn try_cleanup(&self) -> Result<usize> {
        let mut state = self.lock();
        self.cleanup_locked(&mut state)
    }

    fn cleanup_locked(&self, state: &mut State) -> Result<usize> {
        let config = &self.shared.config;
        let now = current_timestamp_ms();

        let memory_expired = state.memory.remove_expired(now);
        let memory_evicted = if state.memory.size() > config.memory_limit {
            state
                .memory
                .evict_to(eviction_target(config.memory_limit))
                .len()
        } else {
            0
        };
        state.stats.record_expirations(memory_expired);
        state.stats.record_evictions(memory_evicted);

        let disk_swept = state.disk.sweep(now)?;
        let disk_evicted = if state.disk.size() > config.disk_limit {
            state.disk.evict_to(eviction_target(config.disk_limit))
        } else {
            0
        };
        state.stats.record_expirations(disk_swept);
        state.stats.record_evictions(disk_evicted);

        let removed = memory_expired + memory_evicted + disk_swept + disk_evicted;
        if removed > 0 {
            debug!(
                memory_expired,
                memory_evicted,
                disk_swept,
                disk_evicted,
                memory_size = state.memory.size(),
                disk_size = state.disk.size(),
                "cache cleanup"
            );
        }
        Ok(removed)
    }

    // == Stats ==
    /// Returns current statistics. Disk usage is measured by walking the directory.
    pub fn get_stats(&self) -> CacheStatsReport {
        let config = &self.shared.config;
        let mut state = self.lock();

        let files = state.disk.measure();
        let disk_size = state.disk.size();
        let memory_size = state.memory.size();

        let mut stems: HashSet<String> = state.memory.keys().map(|k| disk_file_stem(k)).collect();
        stems.extend(files.iter().filter_map(|f| f.stem()).map(str::to_string));

        CacheStatsReport {
            hits: state.stats.hits,
            misses: state.stats.misses,
            hit_rate: state.stats.hit_rate(),
            evictions: state.stats.evictions,
            expirations: state.stats.expirations,
            memory_size,
            disk_size,
            memory_limit: config.memory_limit,
            disk_limit: config.disk_limit,
            memory_usage_percent: usage_percent(memory_size, config.memory_limit),
            disk_usage_percent: usage_percent(disk_size, config.disk_limit),
            items_count: stems.len(),
            memory_items: state.memory.len(),
            disk_items: files.len(),
        }
    }

    // == Introspection ==
    /// Describes the stored entry for `key` without touching it or the counters.
    pub fn inspect(&self, key: &str, namespace: Option<&str>) -> Option<EntryInfo> {
        let cache_key = build_cache_key(key, namespace).ok()?;
        let state = self.lock();
        let on_disk = state.disk.path_for(&cache_key).is_file();

        let describe = |entry: &CacheEntry, in_memory: bool| EntryInfo {
            in_memory,
            on_disk,
            namespace: entry.namespace.clone(),
            compressed: entry.compressed,
            raw_size: entry.raw_size,
            stored_size: entry.stored_size(),
            access_count: entry.access_count,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            expired: entry.is_expired(),
        };

        if let Some(entry) = state.memory.get(&cache_key) {
            return Some(describe(entry, true));
        }

        match state.disk.read(&cache_key) {
            Ok(Some(record)) if record.key == cache_key => Some(describe(&record.entry, false)),
            _ => None,
        }
    }

    /// True if a live entry exists for `key`.
    pub fn contains(&self, key: &str, namespace: Option<&str>) -> bool {
        self.inspect(key, namespace)
            .is_some_and(|info| !info.expired)
    }

    /// Sorted snapshot of the keys currently held in the memory tier.
    pub fn memory_keys(&self) -> Vec<String> {
        let state = self.lock();
        let mut keys: Vec<String> = state.memory.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Path of the disk file that holds (or would hold) `key`.
    pub fn disk_path(&self, key: &str, namespace: Option<&str>) -> Option<PathBuf> {
        let cache_key = build_cache_key(key, namespace).ok()?;
        Some(self.lock().disk.path_for(&cache_key))
    }
}
