use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A single short-term memory entry with access bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// The stored value.
    pub value: serde_json::Value,
    /// Arbitrary metadata attached at insert time.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// When the entry was created. TTL is measured from here.
    pub created_at: DateTime<Utc>,
    /// When the entry was last read. Eviction uses this, not `created_at`.
    pub accessed_at: DateTime<Utc>,
    /// Number of reads since creation.
    pub access_count: u64,
    /// Time to live in seconds. `None` means the entry never expires.
    pub ttl_seconds: Option<u64>,
}

impl MemoryEntry {
    /// Whether the TTL has elapsed relative to `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_seconds {
            None => false,
            Some(ttl) => (now - self.created_at).num_seconds() >= ttl as i64,
        }
    }

    fn touch(&mut self) {
        self.accessed_at = Utc::now();
        self.access_count += 1;
    }
}

/// Utilization statistics for a [`ShortTermMemory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Current number of entries.
    pub entries: usize,
    /// Configured capacity.
    pub max_entries: usize,
    /// `entries / max_entries`.
    pub utilization: f64,
}

/// In-memory storage for immediate task context.
///
/// Capacity-bounded: inserting past capacity evicts the entry with the
/// oldest access time. Expiry is lazy — an expired entry is removed on
/// the `get` that observes it; no background sweep is required for
/// correctness, but [`ShortTermMemory::cleanup_expired`] is available
/// for explicit compaction.
///
/// Safe to call from multiple concurrent subtasks without external
/// locking.
pub struct ShortTermMemory {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    max_entries: usize,
    default_ttl: u64,
}

impl ShortTermMemory {
    /// Create a cache with the default capacity (1000) and TTL (3600 s).
    pub fn new() -> Self {
        Self::with_limits(1000, 3600)
    }

    /// Create a cache with explicit capacity and default TTL in seconds.
    pub fn with_limits(max_entries: usize, default_ttl: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            default_ttl,
        }
    }

    /// Store a value under `key` with an optional TTL (seconds) and
    /// metadata. `ttl = None` applies the default TTL.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        ttl: Option<u64>,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) {
        let key = key.into();
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            evict_lru(&mut entries);
        }

        let now = Utc::now();
        entries.insert(
            key,
            MemoryEntry {
                value,
                metadata: metadata.unwrap_or_default(),
                created_at: now,
                accessed_at: now,
                access_count: 0,
                ttl_seconds: Some(ttl.unwrap_or(self.default_ttl)),
            },
        );
    }

    /// Retrieve a value, returning `None` if absent or expired.
    /// An expired entry observed here is deleted.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.write().await;
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.is_expired(Utc::now()),
        };

        if expired {
            entries.remove(key);
            return None;
        }

        entries.get_mut(key).map(|entry| {
            entry.touch();
            entry.value.clone()
        })
    }

    /// Remove a key. Returns whether it was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Remove all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Remove every expired entry. Returns the count removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Current utilization statistics.
    pub async fn stats(&self) -> MemoryStats {
        let entries = self.entries.read().await;
        MemoryStats {
            entries: entries.len(),
            max_entries: self.max_entries,
            utilization: entries.len() as f64 / self.max_entries as f64,
        }
    }

    /// Current number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    #[cfg(test)]
    async fn backdate_created(&self, key: &str, seconds: i64) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.created_at -= chrono::Duration::seconds(seconds);
        }
    }

    #[cfg(test)]
    async fn backdate_accessed(&self, key: &str, seconds: i64) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.accessed_at -= chrono::Duration::seconds(seconds);
        }
    }
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Evict the entry with the oldest access time.
fn evict_lru(entries: &mut HashMap<String, MemoryEntry>) {
    let oldest = entries
        .iter()
        .min_by_key(|(_, e)| e.accessed_at)
        .map(|(k, _)| k.clone());
    if let Some(key) = oldest {
        entries.remove(&key);
    }
}
