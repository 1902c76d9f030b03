use async_trait::async_trait;
use tracing::{debug, info, warn};

use mls_client::{ListingsEnvelope, MlsClient, MlsError, NlpRequest};

use super::query::{ListingQuery, QueryBody};
use crate::error::{MarketDataError, Result, Service};
use crate::geo::{LngLat, Ring};
use crate::normalize::{normalize_listing, NormalizeOptions};
use crate::traits::{BoundaryLookup, ListingProvider, NlpParse, NlpParser};
use crate::types::{Listing, PriceBounds, SearchResults};

/// Upper bound on `/locations` pages walked per boundary lookup.
const MAX_LOCATION_PAGES: u32 = 10;
const LOCATIONS_PAGE_SIZE: u32 = 100;

/// Domain-level client over the MLS provider: builds requests, normalizes
/// responses and maps transport errors. Never retries.
#[derive(Debug, Clone)]
pub struct MlsQueryClient {
    client: MlsClient,
    normalize: NormalizeOptions,
}

impl MlsQueryClient {
    pub fn new(client: MlsClient) -> Self {
        Self {
            client,
            normalize: NormalizeOptions::default(),
        }
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    fn to_results(&self, envelope: ListingsEnvelope, query: &ListingQuery) -> SearchResults {
        let page = if envelope.page > 0 { envelope.page } else { query.page() };
        let page_size = if envelope.page_size > 0 {
            envelope.page_size
        } else {
            query.page_size()
        };

        let price_bounds = envelope
            .statistics
            .and_then(|s| s.list_price)
            .and_then(|range| match (range.min, range.max) {
                (Some(min), Some(max)) => Some(PriceBounds {
                    min: min.round() as i64,
                    max: max.round() as i64,
                }),
                _ => None,
            });

        let listings = envelope
            .listings
            .iter()
            .map(|raw| normalize_listing(raw, &self.normalize))
            .collect();

        SearchResults {
            listings,
            total: envelope.count,
            page,
            page_size,
            total_pages: envelope.num_pages,
            has_more: page < envelope.num_pages,
            price_bounds,
        }
    }
}

#[async_trait]
impl ListingProvider for MlsQueryClient {
    async fn search(&self, query: &ListingQuery) -> Result<SearchResults> {
        let envelope = match query.body() {
            Some(QueryBody::Polygon(body)) => self.client.post_listings(query.params(), body).await?,
            Some(QueryBody::Raw(body)) => self.client.post_listings(query.params(), body).await?,
            None => self.client.get_listings(query.params()).await?,
        };

        let results = self.to_results(envelope, query);
        debug!(
            total = results.total,
            page = results.page,
            total_pages = results.total_pages,
            returned = results.listings.len(),
            polygon = matches!(query.body(), Some(QueryBody::Polygon(_))),
            "Listings query complete"
        );
        Ok(results)
    }

    async fn get_listing(&self, mls_number: &str) -> Result<Option<Listing>> {
        match self.client.get_listing(mls_number).await {
            Ok(raw) => Ok(Some(normalize_listing(&raw, &self.normalize))),
            Err(MlsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl NlpParser for MlsQueryClient {
    async fn parse(&self, prompt: &str, nlp_id: Option<&str>) -> Result<NlpParse> {
        let request = NlpRequest {
            prompt: prompt.to_string(),
            nlp_id: nlp_id.map(str::to_string),
        };

        let response = self
            .client
            .nlp(&request)
            .await
            .map_err(|e| MarketDataError::from_mls(e, Service::Nlp))?;

        let query = ListingQuery::from_provider_url(&response.request.url, response.request.body)?;
        Ok(NlpParse {
            query,
            summary: response.request.summary.filter(|s| !s.trim().is_empty()),
            nlp_id: response.nlp_id,
        })
    }
}

#[async_trait]
impl BoundaryLookup for MlsQueryClient {
    async fn neighborhood_boundary(&self, name: &str, city: Option<&str>) -> Result<Option<Ring<LngLat>>> {
        let mut page = 1;

        loop {
            let mut params = vec![
                ("name".to_string(), name.to_string()),
                ("type".to_string(), "neighborhood".to_string()),
                ("pageNum".to_string(), page.to_string()),
                ("resultsPerPage".to_string(), LOCATIONS_PAGE_SIZE.to_string()),
            ];
            if let Some(city) = city {
                params.push(("city".to_string(), city.to_string()));
            }

            let envelope = self.client.locations(&params).await?;

            for location in &envelope.locations {
                if !location.name.trim().eq_ignore_ascii_case(name.trim()) {
                    continue;
                }
                let in_city = match (city, location.address.as_ref().and_then(|a| a.city.as_deref())) {
                    (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                    _ => true,
                };
                if !in_city {
                    continue;
                }

                let Some(outer) = location
                    .map
                    .as_ref()
                    .and_then(|m| m.boundary.as_ref())
                    .and_then(|rings| rings.first())
                else {
                    continue;
                };

                match Ring::new(outer.iter().copied().map(LngLat::from).collect()) {
                    Ok(ring) => {
                        info!(name, points = ring.len(), "Resolved neighborhood boundary");
                        return Ok(Some(ring));
                    }
                    Err(e) => warn!(name, error = %e, "Skipping degenerate boundary"),
                }
            }

            if page >= envelope.num_pages || page >= MAX_LOCATION_PAGES {
                return Ok(None);
            }
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use mls_client::{ListingStatistics, PriceRange, RawListing};

    use super::*;
    use crate::types::SearchFilters;

    fn client() -> MlsQueryClient {
        MlsQueryClient::new(MlsClient::new("https://mls.test", "key").unwrap())
    }

    fn envelope(page: u32, num_pages: u32, rows: usize) -> ListingsEnvelope {
        ListingsEnvelope {
            count: u64::from(num_pages) * 20,
            page,
            num_pages,
            page_size: 20,
            listings: (0..rows)
                .map(|i| RawListing {
                    mls_number: Some(format!("MLS{i}")),
                    ..RawListing::default()
                })
                .collect(),
            statistics: None,
        }
    }

    #[test]
    fn test_has_more_uses_total_pages_not_row_count() {
        let query = ListingQuery::from_filters(&SearchFilters::for_zip("78704")).unwrap();

        let last_full_page = client().to_results(envelope(3, 3, 20), &query);
        assert!(!last_full_page.has_more);
        assert_eq!(last_full_page.listings.len(), 20);

        let middle = client().to_results(envelope(2, 3, 20), &query);
        assert!(middle.has_more);
    }

    #[test]
    fn test_price_bounds_require_both_ends() {
        let query = ListingQuery::new();
        let mut env = envelope(1, 1, 0);
        env.statistics = Some(ListingStatistics {
            list_price: Some(PriceRange {
                min: Some(325_000.0),
                max: Some(1_250_000.4),
            }),
        });
        let results = client().to_results(env.clone(), &query);
        assert_eq!(
            results.price_bounds,
            Some(PriceBounds {
                min: 325_000,
                max: 1_250_000
            })
        );

        env.statistics = Some(ListingStatistics {
            list_price: Some(PriceRange {
                min: Some(325_000.0),
                max: None,
            }),
        });
        assert_eq!(client().to_results(env, &query).price_bounds, None);
    }

    #[test]
    fn test_missing_page_falls_back_to_query() {
        let filters = SearchFilters {
            page: 4,
            page_size: 10,
            ..SearchFilters::for_zip("78704")
        };
        let query = ListingQuery::from_filters(&filters).unwrap();
        let env = ListingsEnvelope {
            page: 0,
            page_size: 0,
            ..envelope(0, 5, 0)
        };

        let results = client().to_results(env, &query);
        assert_eq!((results.page, results.page_size), (4, 10));
        assert!(results.has_more);
    }
}
