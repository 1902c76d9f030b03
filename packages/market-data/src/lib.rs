//! # Market Data
//!
//! Geospatial listing queries, community market statistics and TTL caching
//! over an upstream MLS provider.
//!
//! ## Layers
//!
//! - **Geometry** (`geo`): typed coordinate orders (`LatLng`, `LngLat`),
//!   rings, bounding boxes, point-in-polygon
//! - **Normalization** (`normalize`): provider records to canonical `Listing`
//! - **MLS queries** (`mls`): `SearchFilters` to provider requests, responses
//!   to `SearchResults`
//! - **Caching** (`stores`, `cache`): TTL store per cache kind with lazy expiry
//! - **Communities** (`communities`): enrichment with fallback tiers,
//!   bounded batch enrichment, single-flight per slug
//! - **Search** (`search`): free text to a reconciled listings query
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use market_data::{
//!     CacheLayer, CommunityAggregator, HttpCommunitySource, MarketDataConfig,
//!     MemoryCacheStore, MlsQueryClient,
//! };
//! use mls_client::MlsClient;
//!
//! let config = MarketDataConfig::default();
//! let provider = Arc::new(MlsQueryClient::new(MlsClient::new(mls_client::DEFAULT_BASE_URL, api_key)?));
//! let source = Arc::new(HttpCommunitySource::new("https://config.example.com")?);
//! let cache = CacheLayer::new(Arc::new(MemoryCacheStore::new()), config.ttls, config.cache_writes);
//!
//! let aggregator = CommunityAggregator::new(source, provider, cache, config);
//! let zilker = aggregator.get("zilker").await?;
//! println!("{}: median {}", zilker.community.name, zilker.stats.median_price);
//! ```
//!
//! ## Feature Flags
//!
//! - `sqlite` - SQLite cache store
//! - `postgres` - PostgreSQL cache store

pub mod cache;
pub mod communities;
pub mod config;
pub mod error;
pub mod geo;
pub mod mls;
pub mod normalize;
pub mod retry;
pub mod search;
pub mod single_flight;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use cache::CacheLayer;
pub use communities::{CommunityAggregator, CommunityDirectory, HttpCommunitySource, StaticCommunities};
pub use config::{CacheTtls, CacheWriteMode, FallbackPolicy, MarketDataConfig, RetryPolicy};
pub use error::{MarketDataError, Result, Service};
pub use geo::{parse_coordinate_string, BoundingBox, Coordinate, GeoPoint, LatLng, LngLat, Ring};
pub use mls::{ListingQuery, MlsQueryClient, QueryBody};
pub use normalize::{normalize_listing, NormalizeOptions};
pub use search::{CommunityIndex, QueryMatcher, SearchOrchestrator, SearchOutcome, SearchRequest};
pub use single_flight::SingleFlight;
pub use traits::{
    BoundaryLookup, CacheEntry, CacheKind, CacheStore, CommunitySource, ListingProvider, NlpParse, NlpParser,
    SyncReport,
};
pub use types::{
    Address, AreaKey, Community, CommunityKind, CommunityPage, CommunityQuery, EnrichedCommunity, Listing,
    ListingStatus, MarketStats, PriceBounds, PropertyType, SearchFilters, SearchResults, SearchSource, SortOrder,
    TransactionType,
};

pub use stores::MemoryCacheStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteCacheStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresCacheStore;
