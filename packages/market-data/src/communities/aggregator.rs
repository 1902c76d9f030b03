use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheLayer;
use crate::config::{FallbackPolicy, MarketDataConfig, RetryPolicy};
use crate::error::{MarketDataError, Result};
use crate::retry::with_retry;
use crate::single_flight::SingleFlight;
use crate::traits::{CommunitySource, ListingProvider};
use crate::types::filters::MAX_PAGE_SIZE;
use crate::types::{
    AreaKey, Community, CommunityPage, CommunityQuery, EnrichedCommunity, Listing, LocationFilter,
    MarketStats, SearchFilters, SearchResults, SearchSource,
};

/// Enriches community definitions with live market statistics, behind the
/// community, market-stats and listings caches.
pub struct CommunityAggregator {
    source: Arc<dyn CommunitySource>,
    static_dataset: Option<Arc<dyn CommunitySource>>,
    provider: Arc<dyn ListingProvider>,
    cache: CacheLayer,
    config: MarketDataConfig,
    communities_in_flight: SingleFlight<EnrichedCommunity>,
    stats_in_flight: SingleFlight<MarketStats>,
}

impl CommunityAggregator {
    pub fn new(
        source: Arc<dyn CommunitySource>,
        provider: Arc<dyn ListingProvider>,
        cache: CacheLayer,
        config: MarketDataConfig,
    ) -> Self {
        Self {
            source,
            static_dataset: None,
            provider,
            cache,
            config,
            communities_in_flight: SingleFlight::new(),
            stats_in_flight: SingleFlight::new(),
        }
    }

    /// Dataset served on configuration-service failure under
    /// [`FallbackPolicy::StaticDataset`].
    pub fn with_static_dataset(mut self, dataset: Arc<dyn CommunitySource>) -> Self {
        self.static_dataset = Some(dataset);
        self
    }

    pub fn config(&self) -> &MarketDataConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// One community with live stats: cache, then config lookup, then listings.
    #[instrument(skip(self))]
    pub async fn get(&self, slug: &str) -> Result<EnrichedCommunity> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(MarketDataError::validation("community slug must not be empty"));
        }

        if let Some(hit) = self.cache.community(slug).await {
            return Ok(hit);
        }

        self.communities_in_flight
            .run(slug, || async {
                let community = self
                    .definition(slug)
                    .await?
                    .ok_or_else(|| MarketDataError::not_found("community", slug))?;
                self.enrich_and_store(community).await
            })
            .await
    }

    /// Enrich every slug, at most `batch_concurrency` at a time. Output order
    /// matches input order; a failed slug yields a zero-stats placeholder.
    #[instrument(skip(self, slugs), fields(count = slugs.len()))]
    pub async fn batch_enrich(&self, slugs: &[String]) -> Vec<EnrichedCommunity> {
        let enriched: Vec<EnrichedCommunity> = stream::iter(slugs.iter().cloned())
            .map(|slug| async move {
                match self.get(&slug).await {
                    Ok(enriched) => enriched,
                    Err(e) => {
                        warn!(slug = %slug, error = %e, "Community enrichment failed, using placeholder");
                        EnrichedCommunity::placeholder(Community::from_slug(&slug))
                    }
                }
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let placeholders = enriched.iter().filter(|c| c.placeholder).count();
        info!(count = enriched.len(), placeholders, "Batch enrichment complete");
        enriched
    }

    /// One page of the community catalog, enriched.
    #[instrument(skip(self))]
    pub async fn list_page(&self, query: &CommunityQuery) -> Result<CommunityPage> {
        if query.page < 1 {
            return Err(MarketDataError::validation("page must be >= 1"));
        }
        if query.page_size == 0 || query.page_size > MAX_PAGE_SIZE {
            return Err(MarketDataError::validation(format!(
                "pageSize must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let all: Vec<Community> = self
            .definitions(query)
            .await?
            .into_iter()
            .filter(|c| query.matches(c))
            .collect();

        let total = all.len();
        let start = (query.page as usize - 1).saturating_mul(query.page_size as usize);
        let page: Vec<Community> = all
            .into_iter()
            .skip(start)
            .take(query.page_size as usize)
            .collect();

        let communities = stream::iter(page)
            .map(|community| self.enrich_known(community))
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        Ok(CommunityPage {
            communities,
            total,
            page: query.page,
            page_size: query.page_size,
            has_more: start + (query.page_size as usize) < total,
        })
    }

    /// Market statistics for an area, recomputed from listings on each miss.
    #[instrument(skip(self, area), fields(area = %area.cache_key()))]
    pub async fn market_stats(&self, area: &AreaKey) -> Result<MarketStats> {
        let filters = area.to_filters(self.config.stats_sample_size);
        if filters.primary_location().is_none() {
            return Err(MarketDataError::validation("market stats need a zip, city, area or polygon"));
        }

        let key = area.cache_key();
        if let Some(hit) = self.cache.market_stats(&key).await {
            return Ok(hit);
        }

        self.stats_in_flight
            .run(&key, || async {
                let results = self.fetch(&filters).await?;
                let stats = MarketStats::from_listings(&results.listings, results.total, results.price_bounds);
                self.cache.put_market_stats(&key, &stats).await;
                Ok(stats)
            })
            .await
    }

    /// A single listing through the listings cache.
    #[instrument(skip(self))]
    pub async fn get_listing(&self, mls_number: &str) -> Result<Listing> {
        let mls_number = mls_number.trim();
        if mls_number.is_empty() {
            return Err(MarketDataError::validation("MLS number must not be empty"));
        }

        if let Some(hit) = self.cache.listing(mls_number).await {
            return Ok(hit);
        }

        let listing = with_retry("listing detail", &self.config.listings_retry, || {
            self.provider.get_listing(mls_number)
        })
        .await?
        .ok_or_else(|| MarketDataError::not_found("listing", mls_number))?;

        self.cache.put_listing(&listing).await;
        Ok(listing)
    }

    /// Listings search with the listings retry budget. Not cached.
    pub async fn search(&self, filters: &SearchFilters) -> Result<SearchResults> {
        filters.validate()?;
        self.fetch(filters).await
    }

    async fn enrich_known(&self, community: Community) -> EnrichedCommunity {
        if let Some(hit) = self.cache.community(&community.slug).await {
            return hit;
        }

        let slug = community.slug.clone();
        let fallback = community.clone();
        match self
            .communities_in_flight
            .run(&slug, || self.enrich_and_store(community))
            .await
        {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!(slug = %slug, error = %e, "Community enrichment failed, using placeholder");
                EnrichedCommunity::placeholder(fallback)
            }
        }
    }

    async fn enrich_and_store(&self, community: Community) -> Result<EnrichedCommunity> {
        let enriched = self.enrich(community).await?;
        self.cache.put_community(&enriched).await;
        Ok(enriched)
    }

    /// Polygon query when a ring is known, falling back to the name/zip query
    /// on failure. Area-only communities go straight to the name/zip query.
    async fn enrich(&self, community: Community) -> Result<EnrichedCommunity> {
        let sample = self.config.stats_sample_size;

        if let Some(filters) = community.polygon_filters(sample) {
            match self.fetch(&filters).await {
                Ok(results) => return Ok(self.assemble(community, results, SearchSource::PolygonEnhanced, filters)),
                Err(e) => warn!(
                    slug = %community.slug,
                    error = %e,
                    "Polygon query failed, falling back to area query"
                ),
            }

            let filters = community.area_filters(sample);
            let results = self.fetch(&filters).await?;
            return Ok(self.assemble(community, results, SearchSource::StandardFallback, filters));
        }

        let filters = community.area_filters(sample);
        let results = self.fetch(&filters).await?;
        Ok(self.assemble(community, results, SearchSource::Standard, filters))
    }

    fn assemble(
        &self,
        mut community: Community,
        results: SearchResults,
        source: SearchSource,
        filters: SearchFilters,
    ) -> EnrichedCommunity {
        if community.display_polygon.is_none() {
            community.display_polygon = community.polygon.as_ref().map(|p| p.to_display());
        }

        let stats = MarketStats::from_listings(&results.listings, results.total, results.price_bounds);
        debug!(
            slug = %community.slug,
            source = ?source,
            sample = stats.sample_size,
            median = stats.median_price,
            "Community enriched"
        );

        EnrichedCommunity {
            community,
            stats,
            listings: results
                .listings
                .into_iter()
                .take(self.config.preview_listings)
                .collect(),
            source,
            filters,
            placeholder: false,
            enriched_at: chrono::Utc::now(),
        }
    }

    async fn fetch(&self, filters: &SearchFilters) -> Result<SearchResults> {
        let polygon = matches!(filters.primary_location(), Some(LocationFilter::Polygon(_)));
        let operation = if polygon { "polygon listings query" } else { "listings query" };
        with_retry(operation, &self.config.listings_retry, || self.provider.search_filters(filters)).await
    }

    fn lookup_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.enrichment_timeout, 0)
    }

    /// `Ok(None)` only when the service says the slug does not exist.
    async fn definition(&self, slug: &str) -> Result<Option<Community>> {
        match with_retry("community lookup", &self.lookup_policy(), || self.source.get(slug)).await {
            Ok(found) => Ok(found),
            Err(e) => match self.fallback_source(&e) {
                Some(dataset) => {
                    warn!(slug, error = %e, "Community service failed, serving static dataset");
                    dataset.get(slug).await
                }
                None => Err(e),
            },
        }
    }

    async fn definitions(&self, query: &CommunityQuery) -> Result<Vec<Community>> {
        match with_retry("community list", &self.lookup_policy(), || self.source.list(query)).await {
            Ok(found) => Ok(found),
            Err(e) => match self.fallback_source(&e) {
                Some(dataset) => {
                    warn!(error = %e, "Community service failed, serving static dataset");
                    dataset.list(query).await
                }
                None => Err(e),
            },
        }
    }

    fn fallback_source(&self, error: &MarketDataError) -> Option<&Arc<dyn CommunitySource>> {
        match self.config.fallback {
            FallbackPolicy::Rethrow => None,
            FallbackPolicy::StaticDataset => {
                if self.static_dataset.is_none() {
                    warn!(error = %error, "Static fallback requested but no dataset configured");
                }
                self.static_dataset.as_ref()
            }
        }
    }
}
