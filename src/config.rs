//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default memory tier limit (100 MiB)
pub const DEFAULT_MEMORY_LIMIT: u64 = 100 * 1024 * 1024;
/// Default disk tier limit (1 GiB)
pub const DEFAULT_DISK_LIMIT: u64 = 1024 * 1024 * 1024;
/// Highest zlib compression level
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Missing or unparsable values never prevent startup; the default applies.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the disk tier
    pub cache_dir: PathBuf,
    /// Memory tier capacity in bytes
    pub memory_limit: u64,
    /// Disk tier capacity in bytes
    pub disk_limit: u64,
    /// Default TTL in seconds; zero or negative means entries never expire
    pub default_ttl: i64,
    /// Serialized payloads at or above this size are candidates for compression
    pub compression_threshold: usize,
    /// zlib compression level (0-9)
    pub compression_level: u32,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Disk tier root (default: `cache`)
    /// - `CACHE_MEMORY_LIMIT` - Memory tier capacity in bytes (default: 100 MiB)
    /// - `CACHE_DISK_LIMIT` - Disk tier capacity in bytes (default: 1 GiB)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_COMPRESSION_THRESHOLD` - Compression threshold in bytes (default: 1024)
    /// - `CACHE_COMPRESSION_LEVEL` - zlib level, clamped to 9 (default: 6)
    /// - `CACHE_CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            memory_limit: env_or("CACHE_MEMORY_LIMIT", defaults.memory_limit),
            disk_limit: env_or("CACHE_DISK_LIMIT", defaults.disk_limit),
            default_ttl: env_or("CACHE_DEFAULT_TTL", defaults.default_ttl),
            compression_threshold: env_or(
                "CACHE_COMPRESSION_THRESHOLD",
                defaults.compression_threshold,
            ),
            compression_level: env_or("CACHE_COMPRESSION_LEVEL", defaults.compression_level)
                .min(MAX_COMPRESSION_LEVEL),
            cleanup_interval: env_or("CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Returns a copy of this config rooted at a different disk directory.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            memory_limit: DEFAULT_MEMORY_LIMIT,
            disk_limit: DEFAULT_DISK_LIMIT,
            default_ttl: 3600,
            compression_threshold: 1024,
            compression_level: 6,
            cleanup_interval: 300,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.memory_limit, 100 * 1024 * 1024);
        assert_eq!(config.disk_limit, 1024 * 1024 * 1024);
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.compression_threshold, 1024);
        assert_eq!(config.compression_level, 6);
        assert_eq!(config.cleanup_interval, 300);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("CACHE_DIR");
        env::remove_var("CACHE_MEMORY_LIMIT");
        env::remove_var("CACHE_DISK_LIMIT");
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("CACHE_COMPRESSION_THRESHOLD");
        env::remove_var("CACHE_CLEANUP_INTERVAL");
        env::remove_var("SERVER_PORT");

        env::set_var("CACHE_COMPRESSION_LEVEL", "42");
        env::set_var("CACHE_DEFAULT_TTL", "not-a-number");

        let config = Config::from_env();
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.memory_limit, DEFAULT_MEMORY_LIMIT);
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.compression_level, MAX_COMPRESSION_LEVEL);
        assert_eq!(config.cleanup_interval, 300);

        env::remove_var("CACHE_COMPRESSION_LEVEL");
        env::remove_var("CACHE_DEFAULT_TTL");
    }

    #[test]
    fn test_with_cache_dir() {
        let config = Config::default().with_cache_dir("/tmp/elsewhere");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.default_ttl, 3600);
    }
}
