//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Cache operations
//! touch the filesystem, so each one runs on the blocking thread pool.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{CacheStatsReport, CacheStore, CacheValue, GetOptions};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CleanupResponse, ClearResponse, DeleteResponse, GetResponse, HealthResponse, NamespaceQuery,
    SetRequest, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache handle; clones refer to the same tiers
    pub cache: CacheStore,
}

impl AppState {
    /// Creates a new AppState with the given cache store.
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    /// Opens the cache described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheStore::open(config.clone())?))
    }
}

/// Runs `op` against the cache on the blocking pool.
async fn run_blocking<T, F>(cache: &CacheStore, op: F) -> Result<T>
where
    F: FnOnce(CacheStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let cache = cache.clone();
    tokio::task::spawn_blocking(move || op(cache))
        .await
        .map_err(|err| CacheError::Internal(err.to_string()))
}

/// Handler for PUT /set
///
/// Stores a JSON value under a key with optional TTL, namespace and tier.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let opts = req.options();
    let value = CacheValue::from(req.value);
    let key = req.key;

    let stored_key = key.clone();
    run_blocking(&state.cache, move |cache| {
        cache.try_set(&stored_key, &value, &opts)
    })
    .await??;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key, optionally scoped with `?namespace=`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<GetResponse>> {
    let mut opts = GetOptions::new();
    opts.namespace = query.namespace().map(str::to_string);

    let lookup_key = key.clone();
    let value = run_blocking(&state.cache, move |cache| cache.get_with(&lookup_key, &opts))
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value.to_json())))
}

/// Handler for DELETE /del/:key
///
/// Removes a key from both tiers. Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<DeleteResponse>> {
    let namespace = query.namespace().map(str::to_string);

    let target = key.clone();
    run_blocking(&state.cache, move |cache| {
        cache.try_delete(&target, namespace.as_deref())
    })
    .await??;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /clear
///
/// Clears one namespace when `?namespace=` is given, otherwise everything.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<ClearResponse>> {
    let namespace = query.namespace().map(str::to_string);

    let target = namespace.clone();
    run_blocking(&state.cache, move |cache| cache.try_clear(target.as_deref())).await??;

    Ok(Json(ClearResponse::new(namespace.as_deref())))
}

/// Handler for POST /cleanup
///
/// Runs an expiry and eviction pass immediately.
pub async fn cleanup_handler(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let removed = run_blocking(&state.cache, |cache| cache.try_cleanup()).await??;
    Ok(Json(CleanupResponse { removed }))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStatsReport>> {
    let report = run_blocking(&state.cache, |cache| cache.get_stats()).await?;
    Ok(Json(report))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
