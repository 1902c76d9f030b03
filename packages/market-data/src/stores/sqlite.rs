//! SQLite cache store.
//!
//! JSON payloads are stored as TEXT and timestamps as fixed-width RFC 3339
//! TEXT, so expiry comparisons can run in SQL.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

use super::schema;
use crate::error::{MarketDataError, Result};
use crate::traits::{CacheEntry, CacheKind, CacheStore};

pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    /// Connect and create the cache tables if needed.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - ephemeral
    /// - `sqlite://market-cache.db?mode=rwc` - file, created if missing
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Each in-memory connection is its own database, so the pool is pinned to one.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings_cache (
                mls_number TEXT PRIMARY KEY,
                listing_data TEXT NOT NULL,
                polygon_data TEXT,
                last_updated TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_listings_cache_expires_at ON listings_cache(expires_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS communities_cache (
                slug TEXT PRIMARY KEY,
                community_data TEXT NOT NULL,
                polygon TEXT,
                display_polygon TEXT,
                last_updated TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_communities_cache_expires_at ON communities_cache(expires_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_stats_cache (
                area_key TEXT PRIMARY KEY,
                stats_data TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_market_stats_cache_expires_at ON market_stats_cache(expires_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn positional(_: usize) -> String {
    "?".to_string()
}

#[derive(Debug, FromRow)]
struct CacheRow {
    cache_key: String,
    data: String,
    polygon: Option<String>,
    display_polygon: Option<String>,
    last_updated: String,
    expires_at: String,
}

impl TryFrom<CacheRow> for CacheEntry {
    type Error = MarketDataError;

    fn try_from(row: CacheRow) -> Result<Self> {
        fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| MarketDataError::Storage(format!("bad cache timestamp {raw:?}: {e}")))
        }

        Ok(CacheEntry {
            key: row.cache_key,
            data: serde_json::from_str(&row.data)?,
            polygon: row.polygon.as_deref().map(serde_json::from_str).transpose()?,
            display_polygon: row.display_polygon.as_deref().map(serde_json::from_str).transpose()?,
            last_updated: parse_time(&row.last_updated)?,
            expires_at: parse_time(&row.expires_at)?,
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, kind: CacheKind, key: &str) -> Result<Option<CacheEntry>> {
        let sql = schema::select_live(kind, "NULL", positional);
        let row: Option<CacheRow> = sqlx::query_as(&sql)
            .bind(key)
            .bind(timestamp(Utc::now()))
            .fetch_optional(&self.pool)
            .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    async fn put(&self, kind: CacheKind, entry: &CacheEntry) -> Result<()> {
        let sql = schema::upsert(kind, positional);
        let mut query = sqlx::query(&sql)
            .bind(&entry.key)
            .bind(entry.data.to_string());
        if kind.polygon_column().is_some() {
            query = query.bind(entry.polygon.as_ref().map(|v| v.to_string()));
        }
        if kind.has_display_polygon() {
            query = query.bind(entry.display_polygon.as_ref().map(|v| v.to_string()));
        }
        query
            .bind(timestamp(entry.last_updated))
            .bind(timestamp(entry.expires_at))
            .execute(&self.pool)
            .await?;

        debug!(kind = %kind, key = %entry.key, "Cache entry written");
        Ok(())
    }

    async fn invalidate(&self, kind: CacheKind, key: &str) -> Result<bool> {
        let result = sqlx::query(&schema::delete_key(kind, positional))
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, kind: CacheKind) -> Result<u64> {
        let result = sqlx::query(&schema::delete_expired(kind, positional))
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, kind: CacheKind) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&schema::count(kind))
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_get_ignores_expired_rows() {
        let store = SqliteCacheStore::in_memory().await.unwrap();
        let entry = CacheEntry::new("zip:78704", json!({"medianPrice": 650000}), Duration::from_secs(60))
            .with_expires_at(Utc::now() - chrono::Duration::seconds(1));
        store.put(CacheKind::MarketStats, &entry).await.unwrap();

        assert!(store.get(CacheKind::MarketStats, "zip:78704").await.unwrap().is_none());
        assert_eq!(store.count(CacheKind::MarketStats).await.unwrap(), 1);

        assert_eq!(store.purge_expired(CacheKind::MarketStats).await.unwrap(), 1);
        assert_eq!(store.count(CacheKind::MarketStats).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_payload_and_expiry() {
        let store = SqliteCacheStore::in_memory().await.unwrap();
        let polygon = json!([[-97.78, 30.26], [-97.76, 30.26], [-97.76, 30.27]]);

        let first = CacheEntry::new("zilker", json!({"v": 1}), Duration::from_secs(60))
            .with_polygon(Some(polygon.clone()));
        store.put(CacheKind::Communities, &first).await.unwrap();

        let second = CacheEntry::new("zilker", json!({"v": 2}), Duration::from_secs(3600));
        store.put(CacheKind::Communities, &second).await.unwrap();

        let hit = store.get(CacheKind::Communities, "zilker").await.unwrap().unwrap();
        assert_eq!(hit.data, json!({"v": 2}));
        assert_eq!(hit.polygon, None, "upsert replaces the whole row");
        assert!(hit.expires_at > first.expires_at);
        assert_eq!(store.count(CacheKind::Communities).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_geometry_round_trips() {
        let store = SqliteCacheStore::in_memory().await.unwrap();
        let polygon = json!([[-97.78, 30.26], [-97.76, 30.26], [-97.76, 30.27]]);
        let display = json!([[30.26, -97.78], [30.26, -97.76], [30.27, -97.76]]);

        let entry = CacheEntry::new("zilker", json!({}), Duration::from_secs(60))
            .with_polygon(Some(polygon.clone()))
            .with_display_polygon(Some(display.clone()));
        store.put(CacheKind::Communities, &entry).await.unwrap();

        let hit = store.get(CacheKind::Communities, "zilker").await.unwrap().unwrap();
        assert_eq!(hit.polygon, Some(polygon));
        assert_eq!(hit.display_polygon, Some(display));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let store = SqliteCacheStore::in_memory().await.unwrap();
        store
            .put(CacheKind::Listings, &CacheEntry::new("ACT123", json!({}), Duration::from_secs(60)))
            .await
            .unwrap();

        assert!(store.invalidate(CacheKind::Listings, "ACT123").await.unwrap());
        assert!(!store.invalidate(CacheKind::Listings, "ACT123").await.unwrap());
        assert!(store.get(CacheKind::Listings, "ACT123").await.unwrap().is_none());
    }
}
