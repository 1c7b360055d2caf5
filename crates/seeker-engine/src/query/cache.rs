use crate::types::SearchResult;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CacheEntry {
    results: Vec<SearchResult>,
    inserted: Instant,
}

/// TTL cache of final search results keyed by query and filters.
pub struct QueryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry, or `None`. An expired entry is evicted on the way out.
    pub fn get(&self, key: &str) -> Option<Vec<SearchResult>> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => {
                return Some(entry.results.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.inserted.elapsed() >= self.ttl);
        }
        None
    }

    pub fn insert(&self, key: String, results: Vec<SearchResult>) {
        self.entries.insert(
            key,
            CacheEntry {
                results,
                inserted: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, DocumentMetadata};
    use chrono::Utc;

    fn result(path: &str) -> SearchResult {
        SearchResult {
            path: path.to_string(),
            score: 0.9,
            metadata: DocumentMetadata {
                path: path.to_string(),
                file_type: Category::Text,
                size: 1,
                modified: Utc::now(),
                language: None,
                chunk: Some(0),
            },
        }
    }

    #[test]
    fn test_hit_returns_same_results() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let results = vec![result("/a"), result("/b")];
        cache.insert("q|".into(), results.clone());
        assert_eq!(cache.get("q|").unwrap(), results);
        assert!(cache.get("other|").is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = QueryCache::new(Duration::from_millis(20));
        cache.insert("q|".into(), vec![result("/a")]);
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("q|").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_and_clear() {
        let cache = QueryCache::new(Duration::from_millis(20));
        cache.insert("old|".into(), vec![]);
        std::thread::sleep(Duration::from_millis(40));
        cache.insert("new|".into(), vec![]);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
