//! Testing utilities including mock implementations.
//!
//! These let applications exercise the aggregator and orchestrator without
//! talking to the MLS provider, the NLP endpoint or the configuration service.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{MarketDataError, Result};
use crate::mls::{ListingQuery, QueryBody};
use crate::traits::{
    CacheEntry, CacheKind, CacheStore, CommunitySource, ListingProvider, NlpParse, NlpParser, SyncReport,
};
use crate::types::{
    Address, Community, CommunityQuery, Listing, ListingStatus, PropertyType, SearchResults,
};

/// A listing with the given number and price and otherwise plausible defaults.
pub fn sample_listing(mls_number: &str, price: i64) -> Listing {
    Listing {
        mls_number: mls_number.to_string(),
        address: Address {
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip: Some("78704".into()),
            full: "Austin, TX 78704".into(),
            ..Address::default()
        },
        price,
        bedrooms: 3,
        bathrooms: 2.0,
        square_feet: 1_500,
        lot_size_acres: None,
        year_built: Some(1985),
        property_type: PropertyType::SingleFamily,
        status: ListingStatus::Active,
        days_on_market: 10,
        photos: Vec::new(),
        location: None,
        listed_at: Some(Utc::now()),
        updated_at: None,
    }
}

/// Record of a call made to [`MockListingProvider`].
#[derive(Debug, Clone)]
pub enum MockProviderCall {
    Search { query: ListingQuery },
    GetListing { mls_number: String },
}

/// A mock listings provider.
///
/// Returns the configured listings for every search, with optional failures
/// for polygon queries, for a given zip, or for the next `n` calls.
#[derive(Default)]
pub struct MockListingProvider {
    listings: Arc<RwLock<Vec<Listing>>>,
    total: Arc<RwLock<Option<u64>>>,
    polygon_error: Arc<RwLock<Option<MarketDataError>>>,
    zip_errors: Arc<RwLock<HashMap<String, MarketDataError>>>,
    transient_failures: Arc<RwLock<Vec<MarketDataError>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    calls: Arc<RwLock<Vec<MockProviderCall>>>,
}

impl MockListingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(self, listings: Vec<Listing>) -> Self {
        *self.listings.write().unwrap() = listings;
        self
    }

    /// Provider-reported total, independent of the listings returned.
    pub fn with_total(self, total: u64) -> Self {
        *self.total.write().unwrap() = Some(total);
        self
    }

    /// Fail every polygon (body-bearing) search.
    pub fn failing_polygon_queries(self, error: MarketDataError) -> Self {
        *self.polygon_error.write().unwrap() = Some(error);
        self
    }

    /// Fail every query-string search for `zip`.
    pub fn failing_zip(self, zip: impl Into<String>, error: MarketDataError) -> Self {
        self.zip_errors.write().unwrap().insert(zip.into(), error);
        self
    }

    /// Fail the next calls with these errors, in order.
    pub fn failing_next(self, errors: Vec<MarketDataError>) -> Self {
        *self.transient_failures.write().unwrap() = errors;
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<MockProviderCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<ListingQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockProviderCall::Search { query } => Some(query),
                MockProviderCall::GetListing { .. } => None,
            })
            .collect()
    }

    pub fn search_count(&self) -> usize {
        self.queries().len()
    }

    fn next_failure(&self) -> Option<MarketDataError> {
        let mut failures = self.transient_failures.write().unwrap();
        (!failures.is_empty()).then(|| failures.remove(0))
    }

    async fn pause(&self) {
        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ListingProvider for MockListingProvider {
    async fn search(&self, query: &ListingQuery) -> Result<SearchResults> {
        self.calls.write().unwrap().push(MockProviderCall::Search { query: query.clone() });
        self.pause().await;

        if let Some(error) = self.next_failure() {
            return Err(error);
        }
        if matches!(query.body(), Some(QueryBody::Polygon(_))) {
            if let Some(error) = self.polygon_error.read().unwrap().clone() {
                return Err(error);
            }
        }
        if let Some(zip) = query.get("zip") {
            if let Some(error) = self.zip_errors.read().unwrap().get(zip).cloned() {
                return Err(error);
            }
        }

        let listings = self.listings.read().unwrap().clone();
        let total = self.total.read().unwrap().unwrap_or(listings.len() as u64);
        let page_size = query.page_size();
        Ok(SearchResults {
            total,
            page: query.page(),
            page_size,
            total_pages: total.div_ceil(u64::from(page_size.max(1))) as u32,
            has_more: u64::from(query.page()) * u64::from(page_size) < total,
            price_bounds: None,
            listings,
        })
    }

    async fn get_listing(&self, mls_number: &str) -> Result<Option<Listing>> {
        self.calls.write().unwrap().push(MockProviderCall::GetListing {
            mls_number: mls_number.to_string(),
        });
        self.pause().await;

        if let Some(error) = self.next_failure() {
            return Err(error);
        }
        Ok(self
            .listings
            .read()
            .unwrap()
            .iter()
            .find(|l| l.mls_number == mls_number)
            .cloned())
    }
}

/// A mock NLP endpoint with a fixed response.
#[derive(Default)]
pub struct MockNlpParser {
    response: Arc<RwLock<Option<NlpParse>>>,
    failures: Arc<RwLock<Vec<MarketDataError>>>,
    calls: Arc<RwLock<Vec<(String, Option<String>)>>>,
}

impl MockNlpParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with a request rebuilt from a provider URL.
    pub fn with_url(self, url: &str, summary: Option<&str>) -> Self {
        let query = ListingQuery::from_provider_url(url, None).unwrap();
        *self.response.write().unwrap() = Some(NlpParse {
            query,
            summary: summary.map(str::to_string),
            nlp_id: Some("nlp-test-1".into()),
        });
        self
    }

    pub fn with_response(self, response: NlpParse) -> Self {
        *self.response.write().unwrap() = Some(response);
        self
    }

    /// Fail the next calls with these errors, in order.
    pub fn failing_next(self, errors: Vec<MarketDataError>) -> Self {
        *self.failures.write().unwrap() = errors;
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl NlpParser for MockNlpParser {
    async fn parse(&self, prompt: &str, nlp_id: Option<&str>) -> Result<NlpParse> {
        self.calls
            .write()
            .unwrap()
            .push((prompt.to_string(), nlp_id.map(str::to_string)));

        {
            let mut failures = self.failures.write().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        self.response
            .read()
            .unwrap()
            .clone()
            .ok_or(MarketDataError::NotRealEstateQuery)
    }
}

/// A mock configuration service over an in-memory list.
#[derive(Default)]
pub struct MockCommunitySource {
    communities: Arc<RwLock<Vec<Community>>>,
    error: Arc<RwLock<Option<MarketDataError>>>,
    list_calls: Arc<RwLock<usize>>,
    get_calls: Arc<RwLock<usize>>,
    synced: Arc<RwLock<Vec<Community>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockCommunitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_community(self, community: Community) -> Self {
        self.communities.write().unwrap().push(community);
        self
    }

    pub fn with_communities(self, communities: impl IntoIterator<Item = Community>) -> Self {
        self.communities.write().unwrap().extend(communities);
        self
    }

    /// Hold every `list` call for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap() = Some(delay);
        self
    }

    /// Fail every subsequent `list` and `get` with `error`.
    pub fn fail_with(&self, error: MarketDataError) {
        *self.error.write().unwrap() = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.read().unwrap()
    }

    pub fn get_calls(&self) -> usize {
        *self.get_calls.read().unwrap()
    }

    pub fn synced(&self) -> Vec<Community> {
        self.synced.read().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        match self.error.read().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CommunitySource for MockCommunitySource {
    async fn list(&self, query: &CommunityQuery) -> Result<Vec<Community>> {
        *self.list_calls.write().unwrap() += 1;
        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self
            .communities
            .read()
            .unwrap()
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect())
    }

    async fn get(&self, slug: &str) -> Result<Option<Community>> {
        *self.get_calls.write().unwrap() += 1;
        self.check()?;
        Ok(self
            .communities
            .read()
            .unwrap()
            .iter()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn sync(&self, communities: &[Community]) -> Result<SyncReport> {
        self.check()?;
        let mut existing = self.communities.write().unwrap();
        let mut report = SyncReport::default();
        for community in communities {
            match existing.iter_mut().find(|c| c.slug == community.slug) {
                Some(slot) => {
                    *slot = community.clone();
                    report.updated += 1;
                }
                None => {
                    existing.push(community.clone());
                    report.created += 1;
                }
            }
        }
        self.synced.write().unwrap().extend_from_slice(communities);
        Ok(report)
    }
}

/// A cache store whose every operation fails.
pub struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _kind: CacheKind, _key: &str) -> Result<Option<CacheEntry>> {
        Err(MarketDataError::Storage("cache unavailable".into()))
    }

    async fn put(&self, _kind: CacheKind, _entry: &CacheEntry) -> Result<()> {
        Err(MarketDataError::Storage("cache unavailable".into()))
    }

    async fn invalidate(&self, _kind: CacheKind, _key: &str) -> Result<bool> {
        Err(MarketDataError::Storage("cache unavailable".into()))
    }

    async fn purge_expired(&self, _kind: CacheKind) -> Result<u64> {
        Err(MarketDataError::Storage("cache unavailable".into()))
    }

    async fn count(&self, _kind: CacheKind) -> Result<u64> {
        Err(MarketDataError::Storage("cache unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchFilters;

    #[tokio::test]
    async fn test_mock_provider_tracks_queries() {
        let provider = MockListingProvider::new().with_listings(vec![sample_listing("A1", 500_000)]);

        let results = provider.search_filters(&SearchFilters::for_zip("78704")).await.unwrap();
        assert_eq!(results.listings.len(), 1);

        let queries = provider.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].get("zip"), Some("78704"));
    }

    #[tokio::test]
    async fn test_mock_source_sync_counts_created_and_updated() {
        let source = MockCommunitySource::new().with_community(Community::from_slug("zilker"));
        let report = source
            .sync(&[Community::from_slug("zilker"), Community::from_slug("mueller")])
            .await
            .unwrap();

        assert_eq!(report, SyncReport { created: 1, updated: 1 });
        assert_eq!(source.synced().len(), 2);
    }
}
