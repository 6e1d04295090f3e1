//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::SetOptions;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (configured default if absent, never expires if <= 0)
/// - `namespace`: Optional namespace prefix
/// - `memory_only` / `disk_only`: Restrict the write to one tier
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub memory_only: bool,
    #[serde(default)]
    pub disk_only: bool,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.memory_only && self.disk_only {
            return Some("memory_only and disk_only are mutually exclusive".to_string());
        }
        None
    }

    /// Builds the engine options described by this request.
    pub fn options(&self) -> SetOptions {
        let mut opts = SetOptions::new();
        opts.ttl = self.ttl;
        opts.namespace = self.namespace.clone().filter(|ns| !ns.is_empty());
        if self.memory_only {
            opts = opts.memory_only();
        } else if self.disk_only {
            opts = opts.disk_only();
        }
        opts
    }
}

/// Optional `?namespace=` query parameter for get, delete and clear.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceQuery {
    #[serde(default)]
    pub namespace: Option<String>,
}

impl NamespaceQuery {
    /// The namespace, treating an empty string as absent.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}
