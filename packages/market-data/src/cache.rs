//! Typed, best-effort access to a [`CacheStore`].
//!
//! Reads that fail or return undecodable payloads are misses. Writes never
//! fail the caller: errors are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{CacheTtls, CacheWriteMode};
use crate::traits::{CacheEntry, CacheKind, CacheStore};
use crate::types::{EnrichedCommunity, Listing, MarketStats};

#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    ttls: CacheTtls,
    writes: CacheWriteMode,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, ttls: CacheTtls, writes: CacheWriteMode) -> Self {
        Self { store, ttls, writes }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn ttl(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Listings => self.ttls.listings,
            CacheKind::Communities => self.ttls.communities,
            CacheKind::MarketStats => self.ttls.market_stats,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, kind: CacheKind, key: &str) -> Option<T> {
        let entry = match self.store.get(kind, key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(kind = %kind, key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(kind = %kind, key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_value(entry.data) {
            Ok(value) => {
                debug!(kind = %kind, key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(kind = %kind, key, error = %e, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, kind: CacheKind, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(data) => self.write(kind, CacheEntry::new(key, data, self.ttl(kind))).await,
            Err(e) => warn!(kind = %kind, key, error = %e, "Cache payload could not be serialized"),
        }
    }

    pub async fn community(&self, slug: &str) -> Option<EnrichedCommunity> {
        self.get(CacheKind::Communities, slug).await
    }

    /// Geometry goes to its own columns as well as inside the payload.
    pub async fn put_community(&self, enriched: &EnrichedCommunity) {
        let community = &enriched.community;
        let data = match serde_json::to_value(enriched) {
            Ok(data) => data,
            Err(e) => {
                warn!(slug = %community.slug, error = %e, "Community payload could not be serialized");
                return;
            }
        };

        let entry = CacheEntry::new(&community.slug, data, self.ttls.communities)
            .with_polygon(community.polygon.as_ref().and_then(|p| serde_json::to_value(p).ok()))
            .with_display_polygon(
                community
                    .display_polygon
                    .as_ref()
                    .and_then(|p| serde_json::to_value(p).ok()),
            );
        self.write(CacheKind::Communities, entry).await;
    }

    pub async fn listing(&self, mls_number: &str) -> Option<Listing> {
        self.get(CacheKind::Listings, mls_number).await
    }

    pub async fn put_listing(&self, listing: &Listing) {
        self.put(CacheKind::Listings, &listing.mls_number, listing).await;
    }

    pub async fn market_stats(&self, area_key: &str) -> Option<MarketStats> {
        self.get(CacheKind::MarketStats, area_key).await
    }

    pub async fn put_market_stats(&self, area_key: &str, stats: &MarketStats) {
        self.put(CacheKind::MarketStats, area_key, stats).await;
    }

    async fn write(&self, kind: CacheKind, entry: CacheEntry) {
        match self.writes {
            CacheWriteMode::Inline => write_logged(self.store.as_ref(), kind, &entry).await,
            CacheWriteMode::Detached => {
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    write_logged(store.as_ref(), kind, &entry).await;
                });
            }
        }
    }
}

async fn write_logged(store: &dyn CacheStore, kind: CacheKind, entry: &CacheEntry) {
    if let Err(e) = store.put(kind, entry).await {
        warn!(kind = %kind, key = %entry.key, error = %e, "Cache write failed");
    }
}
