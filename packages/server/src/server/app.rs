//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use market_data::{
    CacheLayer, CacheStore, CommunityAggregator, CommunityDirectory, CommunitySource,
    FallbackPolicy, HttpCommunitySource, MarketDataConfig, MlsQueryClient, PostgresCacheStore,
    SearchOrchestrator, SqliteCacheStore, StaticCommunities,
};
use mls_client::MlsClient;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{is_postgres_url, Config};
use crate::server::routes::{
    enrich_communities_handler, get_community_handler, get_listing_handler, health_handler,
    list_communities_handler, market_stats_handler, search_handler, search_listings_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<CommunityAggregator>,
    pub orchestrator: Arc<SearchOrchestrator>,
    pub cache_store: Arc<dyn CacheStore>,
}

impl AppState {
    /// Wire the MLS client, community source, cache and services from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let market_config = MarketDataConfig::default().with_fallback(config.community_fallback);
        Self::with_market_config(config, market_config).await
    }

    pub async fn with_market_config(config: &Config, market_config: MarketDataConfig) -> Result<Self> {
        let mls = MlsClient::new(config.mls_base_url.as_str(), config.mls_api_key.as_str())
            .context("Failed to create MLS client")?;
        let provider = Arc::new(MlsQueryClient::new(mls));

        let mut community_source = HttpCommunitySource::new(&config.community_service_url)
            .context("Invalid COMMUNITY_SERVICE_URL")?;
        if let Some(secret) = &config.community_sync_secret {
            community_source = community_source.with_sync_secret(secret.clone());
        }
        let source: Arc<dyn CommunitySource> = Arc::new(community_source);

        let cache_store = open_cache_store(&config.cache_database_url).await?;
        let cache = CacheLayer::new(cache_store.clone(), market_config.ttls, market_config.cache_writes);

        let mut aggregator =
            CommunityAggregator::new(source.clone(), provider.clone(), cache, market_config.clone());
        if market_config.fallback == FallbackPolicy::StaticDataset {
            let dataset = StaticCommunities::bundled().context("Failed to load bundled communities")?;
            aggregator = aggregator.with_static_dataset(Arc::new(dataset));
        }

        let directory = Arc::new(
            CommunityDirectory::new(source, market_config.directory_ttl)
                .with_refresh_timeout(market_config.enrichment_timeout),
        );
        let orchestrator = SearchOrchestrator::new(provider.clone(), provider, directory, market_config)
            .context("Failed to create search orchestrator")?;

        Ok(Self {
            aggregator: Arc::new(aggregator),
            orchestrator: Arc::new(orchestrator),
            cache_store,
        })
    }
}

/// Open the cache backend named by `database_url`.
///
/// `postgres://` URLs get the Postgres store with this crate's migrations
/// applied; anything else is treated as a SQLite URL.
pub async fn open_cache_store(database_url: &str) -> Result<Arc<dyn CacheStore>> {
    if is_postgres_url(database_url) {
        tracing::info!("Connecting to Postgres cache...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to cache database")?;

        tracing::info!("Running cache migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        return Ok(Arc::new(PostgresCacheStore::from_pool(pool)));
    }

    tracing::info!("Opening SQLite cache...");
    let store = SqliteCacheStore::new(database_url)
        .await
        .context("Failed to open SQLite cache")?;
    Ok(Arc::new(store))
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/communities", get(list_communities_handler))
        .route("/communities/enrich", post(enrich_communities_handler))
        .route("/communities/:slug", get(get_community_handler))
        .route("/listings", get(search_listings_handler))
        .route("/listings/:mls_number", get(get_listing_handler))
        .route("/market-stats", get(market_stats_handler))
        .route("/search", post(search_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
