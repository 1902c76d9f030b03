use serde_json::Value;
use url::Url;

use mls_client::MapBody;

use crate::error::{MarketDataError, Result};
use crate::geo::{LngLat, Ring};
use crate::types::{LocationFilter, SearchFilters};

/// A provider-native listings request: query-string parameters plus an
/// optional body. A body forces `POST`; everything else stays in the query string.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    params: Vec<(String, String)>,
    body: Option<QueryBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    /// `{ "map": [[[lng, lat], ...]] }`
    Polygon(MapBody),
    /// Body passed through verbatim from the NLP endpoint.
    Raw(Value),
}

impl ListingQuery {
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            body: None,
        }
    }

    /// Translate structured filters into a provider request, applying the
    /// active-only, sale-only and newest-first defaults.
    pub fn from_filters(filters: &SearchFilters) -> Result<Self> {
        filters.validate()?;

        let mut query = Self::new();
        query.push("pageNum", filters.page);
        query.push("resultsPerPage", filters.page_size);

        for status in filters.statuses() {
            query.push("status", status.provider_code());
        }
        query.push("type", filters.transaction_type().provider_value());
        query.push("sortBy", filters.sort_order().provider_key());

        if let Some(v) = filters.min_price {
            query.push("minPrice", v);
        }
        if let Some(v) = filters.max_price {
            query.push("maxPrice", v);
        }
        if let Some(v) = filters.min_beds {
            query.push("minBeds", v);
        }
        if let Some(v) = filters.max_beds {
            query.push("maxBeds", v);
        }
        if let Some(v) = filters.min_baths {
            query.push("minBaths", v);
        }
        if let Some(v) = filters.max_baths {
            query.push("maxBaths", v);
        }

        match filters.primary_location() {
            Some(LocationFilter::Polygon(ring)) => query = query.with_polygon(ring),
            Some(LocationFilter::Zip(zip)) => query.push("zip", zip),
            Some(LocationFilter::Area(area)) => query.push("area", area),
            Some(LocationFilter::City(city)) => query.push("city", city),
            None => {}
        }

        Ok(query)
    }

    /// Rebuild a request from the `url` + `body` pair returned by the NLP endpoint.
    pub fn from_provider_url(url: &str, body: Option<Value>) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| MarketDataError::Parse(format!("invalid NLP request url {url:?}: {e}")))?;

        let params = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            params,
            body: body.filter(|b| !b.is_null()).map(QueryBody::Raw),
        })
    }

    /// Scope the request to a polygon. The ring is closed before sending.
    pub fn with_polygon(mut self, ring: &Ring<LngLat>) -> Self {
        self.body = Some(QueryBody::Polygon(MapBody::single_ring(ring.closed().to_pairs())));
        self
    }

    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Replace every value of `key` with a single value.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.remove(key);
        self.push(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.params.retain(|(k, _)| k != key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn body(&self) -> Option<&QueryBody> {
        self.body.as_ref()
    }

    pub fn is_body_bearing(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn page(&self) -> u32 {
        self.get("pageNum").and_then(|v| v.parse().ok()).unwrap_or(1)
    }

    pub(crate) fn page_size(&self) -> u32 {
        self.get("resultsPerPage")
            .and_then(|v| v.parse().ok())
            .unwrap_or(crate::types::filters::DEFAULT_PAGE_SIZE)
    }
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ListingStatus, SortOrder, TransactionType};

    fn values<'a>(query: &'a ListingQuery, key: &str) -> Vec<&'a str> {
        query
            .params()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_zip_search_defaults_to_active_sale() {
        let query = ListingQuery::from_filters(&SearchFilters::for_zip("78704")).unwrap();

        assert_eq!(values(&query, "status"), vec!["A"]);
        assert_eq!(query.get("type"), Some("Sale"));
        assert_eq!(query.get("zip"), Some("78704"));
        assert_eq!(query.get("sortBy"), Some("createdOnDesc"));
        assert_eq!(query.get("pageNum"), Some("1"));
        assert!(!query.is_body_bearing());
    }

    #[test]
    fn test_explicit_status_list_overrides_default() {
        let filters = SearchFilters {
            status: vec![ListingStatus::Pending, ListingStatus::Sold],
            transaction: Some(TransactionType::Rental),
            sort: Some(SortOrder::PriceAsc),
            ..SearchFilters::for_zip("78704")
        };
        let query = ListingQuery::from_filters(&filters).unwrap();

        assert_eq!(values(&query, "status"), vec!["P", "S"]);
        assert_eq!(query.get("type"), Some("Lease"));
        assert_eq!(query.get("sortBy"), Some("listPriceAsc"));
    }

    #[test]
    fn test_polygon_forces_body_and_keeps_other_filters_in_query() {
        let ring = Ring::new(vec![
            LngLat::new(-97.7431, 30.2672),
            LngLat::new(-97.7440, 30.2680),
            LngLat::new(-97.7420, 30.2660),
        ])
        .unwrap();
        let filters = SearchFilters {
            min_beds: Some(3),
            max_price: Some(600_000),
            zip: Some("78704".into()),
            ..SearchFilters::for_polygon(ring)
        };

        let query = ListingQuery::from_filters(&filters).unwrap();

        assert!(query.is_body_bearing());
        assert_eq!(query.get("minBeds"), Some("3"));
        assert_eq!(query.get("maxPrice"), Some("600000"));
        assert_eq!(query.get("zip"), None, "polygon is the primary location");

        match query.body() {
            Some(QueryBody::Polygon(body)) => {
                assert_eq!(body.map[0].len(), 4);
                assert_eq!(body.map[0][0], body.map[0][3]);
                assert_eq!(body.map[0][0], [-97.7431, 30.2672]);
            }
            other => panic!("expected polygon body, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_filters_are_rejected_before_building() {
        let filters = SearchFilters {
            page_size: 0,
            ..SearchFilters::default()
        };
        assert!(matches!(
            ListingQuery::from_filters(&filters),
            Err(MarketDataError::Validation(_))
        ));
    }

    #[test]
    fn test_from_provider_url() {
        let query = ListingQuery::from_provider_url(
            "https://api.repliers.io/listings?minBeds=3&maxPrice=600000&area=Austin&status=A",
            None,
        )
        .unwrap();

        assert_eq!(query.get("minBeds"), Some("3"));
        assert_eq!(query.get("area"), Some("Austin"));
        assert!(!query.is_body_bearing());

        let with_body = ListingQuery::from_provider_url(
            "https://api.repliers.io/listings",
            Some(serde_json::json!({ "imageSearchItems": [] })),
        )
        .unwrap();
        assert!(with_body.is_body_bearing());

        assert!(ListingQuery::from_provider_url("not a url", None).is_err());
    }

    #[test]
    fn test_set_replaces_all_values() {
        let mut query = ListingQuery::new();
        query.push("status", "A");
        query.push("status", "U");
        query.set("status", "P");
        assert_eq!(values(&query, "status"), vec!["P"]);
    }
}
