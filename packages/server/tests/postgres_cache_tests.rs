//! Postgres cache store against a real database.
//!
//! Requires Docker. Run with: cargo test -p server --test postgres_cache_tests -- --ignored

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use market_data::{CacheEntry, CacheKind, CacheStore, PostgresCacheStore};
use serde_json::json;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// One container and one migration run shared by every test in this file.
struct SharedDb {
    db_url: String,
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_DB: OnceCell<SharedDb> = OnceCell::const_new();

impl SharedDb {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn store() -> PostgresCacheStore {
        let shared = SHARED_DB
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test database")
            })
            .await;
        PostgresCacheStore::new(&shared.db_url)
            .await
            .expect("Failed to connect cache store")
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_expired_rows_are_misses_until_swept() {
    let store = SharedDb::store().await;
    let entry = CacheEntry::new("zip:78745", json!({"medianPrice": 480000}), Duration::from_secs(60))
        .with_expires_at(Utc::now() - chrono::Duration::seconds(1));
    store.put(CacheKind::MarketStats, &entry).await.unwrap();

    assert!(store.get(CacheKind::MarketStats, "zip:78745").await.unwrap().is_none());
    assert!(store.count(CacheKind::MarketStats).await.unwrap() >= 1);

    assert!(store.purge_expired(CacheKind::MarketStats).await.unwrap() >= 1);
    assert!(!store.invalidate(CacheKind::MarketStats, "zip:78745").await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_upsert_keeps_geometry_columns() {
    let store = SharedDb::store().await;
    let polygon = json!([[-97.75, 30.30], [-97.73, 30.30], [-97.73, 30.32]]);
    let display = json!([[30.30, -97.75], [30.30, -97.73], [30.32, -97.73]]);

    let first = CacheEntry::new("hyde-park", json!({"v": 1}), Duration::from_secs(60));
    store.put(CacheKind::Communities, &first).await.unwrap();

    let second = CacheEntry::new("hyde-park", json!({"v": 2}), Duration::from_secs(3600))
        .with_polygon(Some(polygon.clone()))
        .with_display_polygon(Some(display.clone()));
    store.put(CacheKind::Communities, &second).await.unwrap();

    let hit = store.get(CacheKind::Communities, "hyde-park").await.unwrap().unwrap();
    assert_eq!(hit.data, json!({"v": 2}));
    assert_eq!(hit.polygon, Some(polygon));
    assert_eq!(hit.display_polygon, Some(display));
    assert!(hit.expires_at > first.expires_at);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_listing_invalidate() {
    let store = SharedDb::store().await;
    let entry = CacheEntry::new("ACT7001", json!({"mlsNumber": "ACT7001"}), Duration::from_secs(60));
    store.put(CacheKind::Listings, &entry).await.unwrap();

    assert!(store.get(CacheKind::Listings, "ACT7001").await.unwrap().is_some());
    assert!(store.invalidate(CacheKind::Listings, "ACT7001").await.unwrap());
    assert!(store.get(CacheKind::Listings, "ACT7001").await.unwrap().is_none());
}
