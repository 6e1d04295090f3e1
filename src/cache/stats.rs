//! Cache Statistics Module
//!
//! Tracks cache performance metrics and builds the report returned by `get_stats`.

use serde::Serialize;

// == Cache Stats ==
/// Running counters updated by cache operations.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (absent, expired, or corrupt)
    pub misses: u64,
    /// Number of entries removed to satisfy a capacity limit
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Stats Report ==
/// Point-in-time view of the cache returned by `get_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub expirations: u64,
    /// Stored bytes in the memory tier
    pub memory_size: u64,
    /// Bytes on disk, measured by walking the directory
    pub disk_size: u64,
    pub memory_limit: u64,
    pub disk_limit: u64,
    pub memory_usage_percent: f64,
    pub disk_usage_percent: f64,
    /// Distinct keys across both tiers
    pub items_count: usize,
    pub memory_items: usize,
    pub disk_items: usize,
}

/// Returns `used` as a percentage of `limit`, or 0 when the limit is 0.
pub fn usage_percent(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        used as f64 / limit as f64 * 100.0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_miss();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.25);
    }

    #[test]
    fn test_record_removals() {
        let mut stats = CacheStats::new();
        stats.record_evictions(3);
        stats.record_expirations(2);
        stats.record_evictions(0);
        assert_eq!(stats.evictions, 3);
        assert_eq!(stats.expirations, 2);
    }

    #[test]
    fn test_usage_percent() {
        assert_eq!(usage_percent(50, 200), 25.0);
        assert_eq!(usage_percent(10, 0), 0.0);
    }
}
