//! Cache backend abstraction and in-memory TTL implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{HistoryError, HistoryResult};

/// Key-value store with per-key TTL and hash groups.
///
/// Every write replaces the whole entry; readers never observe a partially
/// written value. Implementations report connectivity failures as
/// `CacheUnavailable` rather than as absent values.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a plain value.
    async fn get(&self, key: &str) -> HistoryResult<Option<String>>;

    /// Store a plain value, replacing any previous entry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> HistoryResult<()>;

    /// Get one field of a hash group.
    async fn hash_get_field(&self, group: &str, field: &str) -> HistoryResult<Option<String>>;

    /// Replace a hash group with the given fields. Clears any previous expiry.
    async fn hash_set_fields(&self, group: &str, fields: Vec<(String, String)>)
        -> HistoryResult<()>;

    /// Number of fields in a hash group, zero when absent.
    async fn hash_field_count(&self, group: &str) -> HistoryResult<usize>;

    /// Apply a TTL to a whole hash group. `None` removes the expiry.
    async fn set_group_expiry(&self, group: &str, ttl: Option<Duration>) -> HistoryResult<()>;
}

/// Shared cache backend.
pub type SharedCacheBackend = Arc<dyn CacheBackend>;

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Hash(HashMap<String, String>),
}

/// Stored entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: StoredValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_valid(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Thread-safe in-memory backend with lazy TTL expiry.
pub struct InMemoryBackend {
    entries: DashMap<String, CacheEntry>,
    available: AtomicBool,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Check whether a live entry exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.get(key).map_or(false, |e| e.is_valid())
    }

    /// Remaining TTL of a live entry, `None` when absent or without expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.entries.get(key)?;
        let at = entry.expires_at?;
        at.checked_duration_since(Instant::now())
    }

    /// Get the number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of live entries, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.is_valid())
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Remove every entry whose key starts with `prefix`. Returns the count removed.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Evict expired entries.
    pub fn evict_expired(&self) {
        self.entries.retain(|_, entry| entry.is_valid());
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.entries.len();
        let valid = self.entries.iter().filter(|e| e.is_valid()).count();

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
        }
    }

    fn check_available(&self) -> HistoryResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HistoryError::CacheUnavailable(
                "in-memory backend marked unavailable".to_string(),
            ))
        }
    }

    /// Clone out a live entry, dropping it if it has expired.
    fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?.clone();
        if entry.is_valid() {
            return Some(entry);
        }
        debug!(key, "Cache entry expired");
        self.entries.remove_if(key, |_, e| !e.is_valid());
        None
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_type(key: &str) -> HistoryError {
    HistoryError::CacheUnavailable(format!("wrong value type stored under {}", key))
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> HistoryResult<Option<String>> {
        self.check_available()?;
        match self.live_entry(key) {
            Some(CacheEntry {
                value: StoredValue::Text(text),
                ..
            }) => Ok(Some(text)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> HistoryResult<()> {
        self.check_available()?;
        self.entries
            .insert(key.to_string(), CacheEntry::new(StoredValue::Text(value), ttl));
        Ok(())
    }

    async fn hash_get_field(&self, group: &str, field: &str) -> HistoryResult<Option<String>> {
        self.check_available()?;
        match self.live_entry(group) {
            Some(CacheEntry {
                value: StoredValue::Hash(fields),
                ..
            }) => Ok(fields.get(field).cloned()),
            Some(_) => Err(wrong_type(group)),
            None => Ok(None),
        }
    }

    async fn hash_set_fields(
        &self,
        group: &str,
        fields: Vec<(String, String)>,
    ) -> HistoryResult<()> {
        self.check_available()?;
        let fields: HashMap<String, String> = fields.into_iter().collect();
        self.entries
            .insert(group.to_string(), CacheEntry::new(StoredValue::Hash(fields), None));
        Ok(())
    }

    async fn hash_field_count(&self, group: &str) -> HistoryResult<usize> {
        self.check_available()?;
        match self.live_entry(group) {
            Some(CacheEntry {
                value: StoredValue::Hash(fields),
                ..
            }) => Ok(fields.len()),
            Some(_) => Err(wrong_type(group)),
            None => Ok(0),
        }
    }

    async fn set_group_expiry(&self, group: &str, ttl: Option<Duration>) -> HistoryResult<()> {
        self.check_available()?;
        if let Some(mut entry) = self.entries.get_mut(group) {
            entry.expires_at = ttl.map(|ttl| Instant::now() + ttl);
        }
        Ok(())
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = InMemoryBackend::new();

        backend.set("a", "1".to_string(), None).await.unwrap();

        assert_eq!(backend.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(backend.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiry() {
        let backend = InMemoryBackend::new();
        backend
            .set("a", "1".to_string(), Some(Duration::from_millis(30)))
            .await
            .unwrap();

        assert!(backend.get("a").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(backend.get("a").await.unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_hash_group_replaced_whole() {
        let backend = InMemoryBackend::new();
        let fields = |n: usize| -> Vec<(String, String)> {
            (1..=n).map(|i| (i.to_string(), format!("v{}", i))).collect()
        };

        backend.hash_set_fields("g", fields(3)).await.unwrap();
        assert_eq!(backend.hash_field_count("g").await.unwrap(), 3);

        backend.hash_set_fields("g", fields(2)).await.unwrap();
        assert_eq!(backend.hash_field_count("g").await.unwrap(), 2);
        assert_eq!(backend.hash_get_field("g", "3").await.unwrap(), None);
        assert_eq!(
            backend.hash_get_field("g", "2").await.unwrap(),
            Some("v2".to_string())
        );
    }

    #[tokio::test]
    async fn test_group_expiry() {
        let backend = InMemoryBackend::new();
        backend
            .hash_set_fields("g", vec![("1".to_string(), "x".to_string())])
            .await
            .unwrap();
        backend
            .set_group_expiry("g", Some(Duration::from_millis(30)))
            .await
            .unwrap();
        assert!(backend.ttl("g").is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(backend.hash_field_count("g").await.unwrap(), 0);
        assert_eq!(backend.hash_get_field("g", "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_is_error_not_miss() {
        let backend = InMemoryBackend::new();
        backend.set("a", "1".to_string(), None).await.unwrap();
        backend.set_available(false);

        assert!(matches!(
            backend.get("a").await,
            Err(HistoryError::CacheUnavailable(_))
        ));
        assert!(matches!(
            backend.hash_field_count("g").await,
            Err(HistoryError::CacheUnavailable(_))
        ));

        backend.set_available(true);
        assert!(backend.get("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let backend = InMemoryBackend::new();
        backend.set("a", "1".to_string(), None).await.unwrap();

        assert!(backend.hash_get_field("a", "1").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_prefix() {
        let backend = InMemoryBackend::new();
        backend.set("p:USD:1", "1".to_string(), None).await.unwrap();
        backend.set("p:USD:2", "2".to_string(), None).await.unwrap();
        backend.set("p:EUR:1", "3".to_string(), None).await.unwrap();

        assert_eq!(backend.remove_prefix("p:USD:"), 2);
        assert_eq!(backend.keys(), vec!["p:EUR:1".to_string()]);

        backend.clear();
        assert_eq!(backend.len(), 0);
    }

    #[test]
    fn test_stats() {
        let backend = InMemoryBackend::new();
        backend.entries.insert(
            "live".to_string(),
            CacheEntry::new(StoredValue::Text("x".into()), None),
        );
        backend.entries.insert(
            "dead".to_string(),
            CacheEntry {
                value: StoredValue::Text("y".into()),
                expires_at: Some(Instant::now() - Duration::from_millis(1)),
            },
        );

        let stats = backend.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.expired_entries, 1);

        backend.evict_expired();
        assert_eq!(backend.len(), 1);
    }
}
