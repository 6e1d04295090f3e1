//! Tiered Cache - a two-tier (memory + disk) cache with an HTTP front end
//!
//! Values are kept in a size-bounded memory tier backed by a size-bounded
//! directory of entry files, with TTL expiration, zlib compression of large
//! payloads and least-recently-used eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStatsReport, CacheStore, CacheValue, GetOptions, Placement, SetOptions};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_cleanup_task, CleanupTask};
