//! In-memory cache store for tests and single-process development.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::traits::{CacheEntry, CacheKind, CacheStore};

/// Data is lost on restart.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<(CacheKind, String), CacheEntry>>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Raw row regardless of expiry.
    pub fn peek(&self, kind: CacheKind, key: &str) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, kind: CacheKind, key: &str) -> Result<Option<CacheEntry>> {
        let now = Utc::now();
        Ok(self.peek(kind, key).filter(|entry| entry.is_live(now)))
    }

    async fn put(&self, kind: CacheKind, entry: &CacheEntry) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, entry.key.clone()), entry.clone());
        Ok(())
    }

    async fn invalidate(&self, kind: CacheKind, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(kind, key.to_string()))
            .is_some())
    }

    async fn purge_expired(&self, kind: CacheKind) -> Result<u64> {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(k, _), entry| *k != kind || entry.is_live(now));
        Ok((before - entries.len()) as u64)
    }

    async fn count(&self, kind: CacheKind) -> Result<u64> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(k, _)| *k == kind)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_entry_expired_one_second_ago_is_a_miss() {
        let store = MemoryCacheStore::new();
        let entry = CacheEntry::new("zilker", json!({"name": "Zilker"}), Duration::from_secs(60))
            .with_expires_at(Utc::now() - chrono::Duration::seconds(1));
        store.put(CacheKind::Communities, &entry).await.unwrap();

        assert!(store.get(CacheKind::Communities, "zilker").await.unwrap().is_none());
        assert!(store.peek(CacheKind::Communities, "zilker").is_some());
        assert_eq!(store.count(CacheKind::Communities).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites_and_kinds_are_separate() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store
            .put(CacheKind::MarketStats, &CacheEntry::new("zip:78704", json!(1), ttl))
            .await
            .unwrap();
        store
            .put(CacheKind::MarketStats, &CacheEntry::new("zip:78704", json!(2), ttl))
            .await
            .unwrap();

        let hit = store.get(CacheKind::MarketStats, "zip:78704").await.unwrap().unwrap();
        assert_eq!(hit.data, json!(2));
        assert!(store.get(CacheKind::Listings, "zip:78704").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_only_touches_expired_rows_of_kind() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        let past = Utc::now() - chrono::Duration::minutes(5);

        store
            .put(CacheKind::Listings, &CacheEntry::new("A1", json!({}), ttl).with_expires_at(past))
            .await
            .unwrap();
        store
            .put(CacheKind::Listings, &CacheEntry::new("A2", json!({}), ttl))
            .await
            .unwrap();
        store
            .put(CacheKind::Communities, &CacheEntry::new("old", json!({}), ttl).with_expires_at(past))
            .await
            .unwrap();

        assert_eq!(store.purge_expired(CacheKind::Listings).await.unwrap(), 1);
        assert_eq!(store.count(CacheKind::Listings).await.unwrap(), 1);
        assert_eq!(store.count(CacheKind::Communities).await.unwrap(), 1);
        assert!(store.invalidate(CacheKind::Listings, "A2").await.unwrap());
        assert!(!store.invalidate(CacheKind::Listings, "A2").await.unwrap());
    }
}
