use async_trait::async_trait;

use crate::error::Result;
use crate::geo::{LngLat, Ring};
use crate::mls::ListingQuery;
use crate::types::{Listing, SearchFilters, SearchResults};

/// Listings search against the MLS provider.
///
/// Implementations never retry; callers wrap calls in their own retry policy.
#[async_trait]
pub trait ListingProvider: Send + Sync {
    /// Run a provider-native query and normalize the page it returns.
    async fn search(&self, query: &ListingQuery) -> Result<SearchResults>;

    /// Fetch one listing. `Ok(None)` when the provider has no such listing.
    async fn get_listing(&self, mls_number: &str) -> Result<Option<Listing>>;

    /// Build the provider query for `filters` and run it.
    async fn search_filters(&self, filters: &SearchFilters) -> Result<SearchResults> {
        let query = ListingQuery::from_filters(filters)?;
        self.search(&query).await
    }
}

/// Provider-native request recovered from free text.
#[derive(Debug, Clone, PartialEq)]
pub struct NlpParse {
    pub query: ListingQuery,
    pub summary: Option<String>,
    /// Conversation id to pass back on follow-up prompts.
    pub nlp_id: Option<String>,
}

#[async_trait]
pub trait NlpParser: Send + Sync {
    /// Fails with `NotRealEstateQuery` when the prompt is not a property search.
    async fn parse(&self, prompt: &str, nlp_id: Option<&str>) -> Result<NlpParse>;
}

#[async_trait]
pub trait BoundaryLookup: Send + Sync {
    /// Boundary of the named neighborhood, optionally narrowed to a city.
    async fn neighborhood_boundary(&self, name: &str, city: Option<&str>) -> Result<Option<Ring<LngLat>>>;
}
