//! Result cache for diagram, query and validation cells
//!
//! Entries are keyed by the SHA-256 digest of the cell type and source, and
//! remember the store version they were computed against. A lookup only
//! hits while the store is still at that version.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use crate::cell::{CellOutput, CellType, Diagnostic};
use crate::config::CacheConfig;

/// Cache key: hex SHA-256 of `cell_type`, a NUL byte, then the source
pub fn cache_key(cell_type: CellType, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cell_type.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub store_version: u64,
    pub success: bool,
    pub outputs: Vec<CellOutput>,
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CachedResult>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct ResultCache {
    enabled: bool,
    max_entries: usize,
    state: RwLock<CacheState>,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled && config.max_entries > 0,
            max_entries: config.max_entries,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Entry for `key` if it was computed at `store_version`
    ///
    /// A stale entry is dropped on lookup.
    pub fn get(&self, key: &str, store_version: u64) -> Option<CachedResult> {
        if !self.enabled {
            return None;
        }
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;
        let fresh = state
            .entries
            .get(key)
            .map(|entry| entry.store_version == store_version);
        match fresh {
            Some(true) => {
                state.hits += 1;
                state.entries.get(key).cloned()
            }
            Some(false) => {
                state.entries.remove(key);
                state.order.retain(|k| k != key);
                state.misses += 1;
                None
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    pub fn put(&self, key: String, result: CachedResult) {
        if !self.enabled {
            return;
        }
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;
        if state.entries.insert(key.clone(), result).is_none() {
            state.order.push_back(key);
        }
        while state.entries.len() > self.max_entries {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
        // hit/miss counters survive a clear
        state.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(version: u64) -> CachedResult {
        CachedResult {
            store_version: version,
            success: true,
            outputs: vec![CellOutput::text("c1", "graph TD")],
            diagnostics: Vec::new(),
            error: None,
        }
    }

    fn cache(max_entries: usize) -> ResultCache {
        ResultCache::new(&CacheConfig {
            enabled: true,
            max_entries,
        })
    }

    #[test]
    fn test_key_depends_on_type_and_source() {
        let a = cache_key(CellType::Diagram, "diagram");
        assert_eq!(a.len(), 64);
        assert_eq!(a, cache_key(CellType::Diagram, "diagram"));
        assert_ne!(a, cache_key(CellType::Validation, "diagram"));
        assert_ne!(a, cache_key(CellType::Diagram, "diagram d2"));
    }

    #[test]
    fn test_hit_only_at_same_version() {
        let cache = cache(8);
        cache.put("k".into(), entry(3));
        assert!(cache.get("k", 3).is_some());
        assert!(cache.get("k", 4).is_none());
        // The stale entry is gone
        assert!(cache.get("k", 3).is_none());
        let stats = cache.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (0, 1, 2));
    }

    #[test]
    fn test_oldest_entry_is_evicted() {
        let cache = cache(2);
        cache.put("a".into(), entry(1));
        cache.put("b".into(), entry(1));
        cache.put("c".into(), entry(1));
        assert!(cache.get("a", 1).is_none());
        assert!(cache.get("b", 1).is_some());
        assert!(cache.get("c", 1).is_some());
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ResultCache::new(&CacheConfig {
            enabled: false,
            max_entries: 8,
        });
        cache.put("k".into(), entry(1));
        assert!(cache.get("k", 1).is_none());
        assert_eq!(cache.stats().entries, 0);
    }
}
