//! TTL key/value storage.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;

/// One logical keyspace, physically one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Listings,
    Communities,
    MarketStats,
}

impl CacheKind {
    pub const ALL: [CacheKind; 3] = [CacheKind::Listings, CacheKind::Communities, CacheKind::MarketStats];

    pub fn table(self) -> &'static str {
        match self {
            CacheKind::Listings => "listings_cache",
            CacheKind::Communities => "communities_cache",
            CacheKind::MarketStats => "market_stats_cache",
        }
    }

    pub fn key_column(self) -> &'static str {
        match self {
            CacheKind::Listings => "mls_number",
            CacheKind::Communities => "slug",
            CacheKind::MarketStats => "area_key",
        }
    }

    pub fn data_column(self) -> &'static str {
        match self {
            CacheKind::Listings => "listing_data",
            CacheKind::Communities => "community_data",
            CacheKind::MarketStats => "stats_data",
        }
    }

    /// Geometry column, if the table has one.
    pub fn polygon_column(self) -> Option<&'static str> {
        match self {
            CacheKind::Listings => Some("polygon_data"),
            CacheKind::Communities => Some("polygon"),
            CacheKind::MarketStats => None,
        }
    }

    pub fn has_display_polygon(self) -> bool {
        self == CacheKind::Communities
    }
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CacheKind::Listings => "listings",
            CacheKind::Communities => "communities",
            CacheKind::MarketStats => "market-stats",
        })
    }
}

impl std::str::FromStr for CacheKind {
    type Err = crate::error::MarketDataError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "listings" => Ok(CacheKind::Listings),
            "communities" => Ok(CacheKind::Communities),
            "market-stats" | "market_stats" => Ok(CacheKind::MarketStats),
            other => Err(crate::error::MarketDataError::validation(format!("unknown cache kind {other:?}"))),
        }
    }
}

/// A stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub data: Value,
    pub polygon: Option<Value>,
    pub display_polygon: Option<Value>,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry written now that expires after `ttl`.
    pub fn new(key: impl Into<String>, data: Value, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            key: key.into(),
            data,
            polygon: None,
            display_polygon: None,
            last_updated: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn with_polygon(mut self, polygon: Option<Value>) -> Self {
        self.polygon = polygon;
        self
    }

    pub fn with_display_polygon(mut self, display_polygon: Option<Value>) -> Self {
        self.display_polygon = display_polygon;
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Live only while `expires_at` is strictly in the future.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Persistent TTL store.
///
/// Expiry is lazy: `get` never returns an expired row, but expired rows stay
/// in storage until `purge_expired` runs.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The live entry for `key`, or `None` if it is missing or expired.
    async fn get(&self, kind: CacheKind, key: &str) -> Result<Option<CacheEntry>>;

    /// Upsert. An existing row is overwritten wholesale.
    async fn put(&self, kind: CacheKind, entry: &CacheEntry) -> Result<()>;

    /// Remove `key`. Returns whether a row existed.
    async fn invalidate(&self, kind: CacheKind, key: &str) -> Result<bool>;

    /// Delete every expired row. Returns the number removed.
    async fn purge_expired(&self, kind: CacheKind) -> Result<u64>;

    /// Physical row count, expired rows included.
    async fn count(&self, kind: CacheKind) -> Result<u64>;
}
