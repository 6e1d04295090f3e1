//! Cache Module
//!
//! Two-tier (memory + disk) caching with TTL expiration, conditional
//! compression and size-bounded eviction.

pub mod codec;
mod disk;
mod entry;
pub mod key;
mod memory;
mod stats;
mod store;
mod value;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use stats::{CacheStats, CacheStatsReport};
pub use store::{CacheStore, EntryInfo, GetOptions, Placement, SetOptions};
pub use value::CacheValue;

// == Public Constants ==
/// Combined `namespace:key` strings longer than this are replaced by a digest
pub const MAX_KEY_LENGTH: usize = 64;

/// Extension of entry files in the disk tier
pub const CACHE_FILE_EXTENSION: &str = "cache";

/// Eviction brings an over-limit tier down to this percentage of its limit
pub const EVICTION_TARGET_PERCENT: u64 = 80;
