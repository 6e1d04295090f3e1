//! Integration Tests for the Cache Engine
//!
//! Exercises the two-tier engine through its public API against a real
//! temporary directory.

use serde_json::json;
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;
use tiered_cache::{CacheStore, CacheValue, Config, GetOptions, SetOptions};

// == Helper Functions ==

fn open_store(dir: &TempDir) -> CacheStore {
    CacheStore::open(Config::default().with_cache_dir(dir.path())).unwrap()
}

fn open_with(dir: &TempDir, tweak: impl FnOnce(&mut Config)) -> CacheStore {
    let mut config = Config::default().with_cache_dir(dir.path());
    tweak(&mut config);
    CacheStore::open(config).unwrap()
}

/// Deterministic incompressible bytes (xorshift64).
fn noise(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

// == Round Trip ==

#[test]
fn test_round_trip_value_kinds() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let values = vec![
        CacheValue::Null,
        CacheValue::Bool(true),
        CacheValue::Int(-17),
        CacheValue::Float(2.5),
        CacheValue::from("plain text"),
        CacheValue::Bytes(vec![0, 1, 2, 255]),
        CacheValue::List(vec![CacheValue::Int(1), CacheValue::from("two")]),
        CacheValue::from(json!({"nested": {"list": [1, 2, 3]}, "flag": false})),
    ];

    for (i, value) in values.into_iter().enumerate() {
        let key = format!("value-{i}");
        assert!(store.set(&key, value.clone()));
        assert_eq!(store.get(&key), Some(value));
    }
}

// == TTL ==

#[test]
fn test_ttl_expiry() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.set_with("k", "v", &SetOptions::new().ttl(1));
    assert_eq!(store.get("k"), Some(CacheValue::from("v")));

    sleep(Duration::from_secs(2));

    assert_eq!(store.get("k"), None);
}

#[test]
fn test_negative_ttl_never_expires() {
    let dir = TempDir::new().unwrap();
    let store = open_with(&dir, |c| c.default_ttl = 1);

    store.set_with("forever", "v", &SetOptions::new().ttl(-1));
    store.set("default", "v");

    sleep(Duration::from_millis(1100));

    assert_eq!(store.get("forever"), Some(CacheValue::from("v")));
    assert_eq!(store.get("default"), None);
}

// == Namespaces ==

#[test]
fn test_namespace_isolation() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.set_with("a", 1i64, &SetOptions::new().namespace("x"));
    store.set_with("a", 2i64, &SetOptions::new().namespace("y"));

    assert_eq!(
        store.get_with("a", &GetOptions::new().namespace("x")),
        Some(CacheValue::Int(1))
    );
    assert_eq!(
        store.get_with("a", &GetOptions::new().namespace("y")),
        Some(CacheValue::Int(2))
    );
    assert_eq!(store.get("a"), None);
}

// == Delete ==

#[test]
fn test_delete_removes_from_both_tiers() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.set("k", "v");
    let path = store.disk_path("k", None).unwrap();
    assert!(path.is_file());

    assert!(store.delete("k", None));
    assert_eq!(store.get("k"), None);
    assert!(!path.exists());
}

// == Promotion ==

#[test]
fn test_disk_to_memory_promotion() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.set_with("k", "v", &SetOptions::new().disk_only());
    assert!(store.memory_keys().is_empty());

    assert_eq!(store.get("k"), Some(CacheValue::from("v")));
    assert_eq!(store.memory_keys(), vec!["k".to_string()]);
}

// == Eviction ==

#[test]
fn test_eviction_under_memory_pressure() {
    let dir = TempDir::new().unwrap();
    let store = open_with(&dir, |c| c.memory_limit = 1024);
    let value = |i: usize| CacheValue::from(format!("{i:0>188}"));
    let memory_only = SetOptions::new().memory_only();

    for i in 0..5 {
        store.set_with(&format!("k{i}"), value(i), &memory_only);
    }
    let entry_size = store.inspect("k0", None).unwrap().stored_size;
    assert_eq!(store.get_stats().memory_size, entry_size * 5);

    // k0 becomes the most recently used
    assert!(store.get("k0").is_some());

    store.set_with("k5", value(5), &memory_only);
    store.cleanup();

    let stats = store.get_stats();
    assert!(stats.memory_size <= 1024 * 80 / 100);
    assert_eq!(store.memory_keys(), vec!["k0", "k3", "k4", "k5"]);
    assert!(stats.evictions >= 2);
}

// == Compression ==

#[test]
fn test_compression_decisions() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let threshold = store.config().compression_threshold;

    let small = "a".repeat(threshold / 2);
    store.set("small", small.as_str());
    assert!(!store.inspect("small", None).unwrap().compressed);

    let repetitive = "a".repeat(threshold * 8);
    store.set("repetitive", repetitive.as_str());
    let info = store.inspect("repetitive", None).unwrap();
    assert!(info.compressed);
    assert!(info.stored_size < info.raw_size);
    assert_eq!(store.get("repetitive"), Some(CacheValue::from(repetitive)));

    let random = noise(threshold * 4);
    store.set("random", random.clone());
    assert!(!store.inspect("random", None).unwrap().compressed);
    assert_eq!(store.get("random"), Some(CacheValue::Bytes(random)));
}

// == Stats ==

#[test]
fn test_stats_consistency() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    assert_eq!(store.get_stats().hit_rate, 0.0);

    store.set("present", 1i64);
    for _ in 0..3 {
        store.get("present");
    }
    store.get("absent");

    let stats = store.get_stats();
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate, 0.75);
}

// == Concrete Scenario ==

#[test]
fn test_document_scenario() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let doc = CacheValue::from(json!({"title": "Report", "pages": 12}));

    assert!(store.set_with("doc:42", doc.clone(), &SetOptions::new().ttl(60)));
    assert_eq!(store.get("doc:42"), Some(doc));
    assert_eq!(store.get("doc:999"), None);

    assert!(store.clear(None));
    assert_eq!(store.get("doc:42"), None);
}

// == Concurrency ==

#[test]
fn test_clones_share_state_across_threads() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    std::thread::scope(|scope| {
        for t in 0..4 {
            let store = store.clone();
            scope.spawn(move || {
                for i in 0..25 {
                    assert!(store.set(&format!("t{t}-{i}"), i as i64));
                }
            });
        }
    });

    let stats = store.get_stats();
    assert_eq!(stats.items_count, 100);
    assert_eq!(store.get("t3-24"), Some(CacheValue::Int(24)));
}
