use std::time::{Duration, Instant};

use agentcore_types::ToolObservation;
use dashmap::DashMap;

struct CacheEntry {
    observation: ToolObservation,
    inserted_at: Instant,
    ttl: Duration,
}

/// Bounded TTL cache keyed `(workspace_id, conversation_id, request_id,
/// tool)`, grounded on `tool_broker.py`'s "LRU cache + TTL" idempotency
/// layer and `test_idempotency_duplicate`'s cache-key shape.
pub struct IdempotencyCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
}

impl IdempotencyCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn key(workspace_id: &str, conversation_id: &str, request_id: &str, tool: &str) -> String {
        format!("{workspace_id}:{conversation_id}:{request_id}:{tool}")
    }

    pub fn get(&self, key: &str) -> Option<ToolObservation> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() >= entry.ttl {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.observation.clone())
    }

    pub fn insert(&self, key: String, observation: ToolObservation, ttl_seconds: u64) {
        if self.entries.len() >= self.max_entries {
            if let Some(oldest_key) = self.entries.iter().min_by_key(|e| e.inserted_at).map(|e| e.key().clone()) {
                self.entries.remove(&oldest_key);
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                observation,
                inserted_at: Instant::now(),
                ttl: Duration::from_secs(ttl_seconds),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::{SlotMap, ToolStatus};
    use chrono::Utc;

    fn observation() -> ToolObservation {
        ToolObservation {
            tool: "get_test".to_string(),
            args: SlotMap::new(),
            status: ToolStatus::Success,
            result: None,
            error: None,
            status_code: Some(200),
            execution_time_ms: 5,
            attempt: 1,
            from_cache: false,
            circuit_breaker_tripped: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn returns_cached_entry_before_ttl_expires() {
        let cache = IdempotencyCache::new(100);
        let key = IdempotencyCache::key("ws1", "conv1", "req1", "get_test");
        cache.insert(key.clone(), observation(), 60);
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache = IdempotencyCache::new(1);
        cache.insert("a".to_string(), observation(), 60);
        cache.insert("b".to_string(), observation(), 60);
        assert_eq!(cache.entries.len(), 1);
        assert!(cache.get("b").is_some());
    }
}
