//! Memory Tier Module
//!
//! In-process map of cache entries with byte accounting and recency-based eviction.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Memory Tier ==
/// Hot tier holding encoded entries in a `HashMap`.
///
/// `size` is the sum of [`CacheEntry::stored_size`] over all entries and is
/// kept in step with every insert and removal.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: HashMap<String, CacheEntry>,
    size: u64,
    /// Monotonic counter stamped on entries at insert and on every touch
    next_seq: u64,
}

impl MemoryTier {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Stores an entry, replacing any previous entry under the same key.
    pub fn insert(&mut self, key: String, mut entry: CacheEntry) {
        entry.access_seq = self.bump_seq();
        self.size += entry.stored_size();
        if let Some(previous) = self.entries.insert(key, entry) {
            self.size -= previous.stored_size();
        }
    }

    // == Lookup ==
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Marks an entry as read and returns it.
    pub fn touch(&mut self, key: &str) -> Option<&CacheEntry> {
        let seq = self.bump_seq();
        let entry = self.entries.get_mut(key)?;
        entry.touch();
        entry.access_seq = seq;
        Some(entry)
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.size -= entry.stored_size();
        Some(entry)
    }

    /// Drops every entry written under `namespace`. Returns the number removed.
    pub fn remove_namespace(&mut self, namespace: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.namespace.as_deref() == Some(namespace))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            self.remove(key);
        }
        keys.len()
    }

    /// Drops every entry expired at `now`. Returns the number removed.
    pub fn remove_expired(&mut self, now: u64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    // == Evict ==
    /// Evicts least recently used entries until `size <= target`.
    ///
    /// Order is oldest `last_access_at` first; ties go to the entry with fewer
    /// reads, then to the one touched earlier. Returns the evicted keys.
    pub fn evict_to(&mut self, target: u64) -> Vec<String> {
        if self.size <= target {
            return Vec::new();
        }

        let mut candidates: Vec<(u64, u64, u64, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                (
                    entry.last_access_at,
                    entry.access_count,
                    entry.access_seq,
                    key.clone(),
                )
            })
            .collect();
        candidates.sort_unstable();

        let mut evicted = Vec::new();
        for (_, _, _, key) in candidates {
            if self.size <= target {
                break;
            }
            self.remove(&key);
            evicted.push(key);
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.size = 0;
    }

    // == Introspection ==
    /// Total stored bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec::Payload;

    fn entry_of(size: usize, ttl: i64) -> CacheEntry {
        CacheEntry::new(
            None,
            Payload {
                bytes: vec![0u8; size],
                compressed: false,
                raw_size: size as u64,
            },
            ttl,
        )
    }

    fn pinned(size: usize, last_access_at: u64, access_count: u64) -> CacheEntry {
        let mut entry = entry_of(size, 0);
        entry.last_access_at = last_access_at;
        entry.access_count = access_count;
        entry
    }

    #[test]
    fn test_insert_accounts_size() {
        let mut tier = MemoryTier::new();
        tier.insert("a".into(), entry_of(100, 0));
        tier.insert("b".into(), entry_of(50, 0));

        assert_eq!(tier.size(), 150);
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn test_overwrite_replaces_size() {
        let mut tier = MemoryTier::new();
        tier.insert("a".into(), entry_of(100, 0));
        tier.insert("a".into(), entry_of(30, 0));

        assert_eq!(tier.size(), 30);
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_remove_accounts_size() {
        let mut tier = MemoryTier::new();
        tier.insert("a".into(), entry_of(100, 0));

        assert!(tier.remove("a").is_some());
        assert!(tier.remove("a").is_none());
        assert_eq!(tier.size(), 0);
        assert_eq!(tier.len(), 0);
    }

    #[test]
    fn test_remove_expired() {
        let mut tier = MemoryTier::new();
        tier.insert("short".into(), entry_of(10, 1));
        tier.insert("forever".into(), entry_of(10, 0));

        let later = crate::cache::entry::current_timestamp_ms() + 2_000;
        assert_eq!(tier.remove_expired(later), 1);
        assert!(tier.get("forever").is_some());
        assert_eq!(tier.size(), 10);
    }

    #[test]
    fn test_remove_namespace() {
        let mut tier = MemoryTier::new();
        let mut scoped = entry_of(10, 0);
        scoped.namespace = Some("x".into());
        tier.insert("x:a".into(), scoped);
        tier.insert("y:a".into(), entry_of(10, 0));

        assert_eq!(tier.remove_namespace("x"), 1);
        assert!(tier.get("y:a").is_some());
        assert!(tier.get("x:a").is_none());
    }

    #[test]
    fn test_evict_oldest_access_first() {
        let mut tier = MemoryTier::new();
        tier.insert("old".into(), pinned(100, 1_000, 5));
        tier.insert("mid".into(), pinned(100, 2_000, 0));
        tier.insert("new".into(), pinned(100, 3_000, 0));

        let evicted = tier.evict_to(200);
        assert_eq!(evicted, vec!["old".to_string()]);
        assert_eq!(tier.size(), 200);
    }

    #[test]
    fn test_evict_tie_breaks_on_fewer_reads() {
        let mut tier = MemoryTier::new();
        tier.insert("popular".into(), pinned(100, 1_000, 9));
        tier.insert("unpopular".into(), pinned(100, 1_000, 1));

        let evicted = tier.evict_to(100);
        assert_eq!(evicted, vec!["unpopular".to_string()]);
    }

    #[test]
    fn test_evict_tie_breaks_on_insert_order() {
        let mut tier = MemoryTier::new();
        tier.insert("first".into(), pinned(100, 1_000, 0));
        tier.insert("second".into(), pinned(100, 1_000, 0));
        tier.insert("third".into(), pinned(100, 1_000, 0));

        let evicted = tier.evict_to(100);
        assert_eq!(evicted, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_touch_protects_from_eviction() {
        let mut tier = MemoryTier::new();
        tier.insert("a".into(), entry_of(100, 0));
        tier.insert("b".into(), entry_of(100, 0));

        let touched = tier.touch("a").unwrap();
        assert_eq!(touched.access_count, 1);

        let evicted = tier.evict_to(100);
        assert_eq!(evicted, vec!["b".to_string()]);
    }

    #[test]
    fn test_evict_under_target_is_noop() {
        let mut tier = MemoryTier::new();
        tier.insert("a".into(), entry_of(100, 0));
        assert!(tier.evict_to(100).is_empty());
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut tier = MemoryTier::new();
        tier.insert("a".into(), entry_of(100, 0));
        tier.clear();
        assert_eq!(tier.size(), 0);
        assert_eq!(tier.len(), 0);
    }
}
