use serde::{Deserialize, Serialize};

use super::listing::ListingStatus;
use crate::error::{MarketDataError, Result};
use crate::geo::{LngLat, Ring};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Structured listing search.
///
/// Several location fields may be set at once; [`SearchFilters::primary_location`]
/// decides which one is sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// 1-indexed.
    pub page: u32,
    pub page_size: u32,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_beds: Option<u32>,
    pub max_beds: Option<u32>,
    pub min_baths: Option<f64>,
    pub max_baths: Option<f64>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub area: Option<String>,
    pub polygon: Option<Ring<LngLat>>,
    /// Empty means active-only.
    pub status: Vec<ListingStatus>,
    /// `None` means newest first.
    pub sort: Option<SortOrder>,
    /// `None` means sale.
    pub transaction: Option<TransactionType>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            min_price: None,
            max_price: None,
            min_beds: None,
            max_beds: None,
            min_baths: None,
            max_baths: None,
            city: None,
            zip: None,
            area: None,
            polygon: None,
            status: Vec::new(),
            sort: None,
            transaction: None,
        }
    }
}

/// The single location constraint that wins at query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationFilter<'a> {
    Polygon(&'a Ring<LngLat>),
    Zip(&'a str),
    Area(&'a str),
    City(&'a str),
}

impl SearchFilters {
    pub fn for_zip(zip: impl Into<String>) -> Self {
        Self {
            zip: Some(zip.into()),
            ..Self::default()
        }
    }

    pub fn for_polygon(polygon: Ring<LngLat>) -> Self {
        Self {
            polygon: Some(polygon),
            ..Self::default()
        }
    }

    /// Precedence: polygon, then zip, then area, then city.
    pub fn primary_location(&self) -> Option<LocationFilter<'_>> {
        fn non_blank(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(ring) = &self.polygon {
            return Some(LocationFilter::Polygon(ring));
        }
        if let Some(zip) = non_blank(&self.zip) {
            return Some(LocationFilter::Zip(zip));
        }
        if let Some(area) = non_blank(&self.area) {
            return Some(LocationFilter::Area(area));
        }
        non_blank(&self.city).map(LocationFilter::City)
    }

    pub fn statuses(&self) -> Vec<ListingStatus> {
        if self.status.is_empty() {
            vec![ListingStatus::Active]
        } else {
            self.status.clone()
        }
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction.unwrap_or_default()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(MarketDataError::validation("page must be >= 1"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(MarketDataError::validation(format!(
                "pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(MarketDataError::validation("minPrice exceeds maxPrice"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_beds, self.max_beds) {
            if min > max {
                return Err(MarketDataError::validation("minBeds exceeds maxBeds"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_baths, self.max_baths) {
            if min > max {
                return Err(MarketDataError::validation("minBaths exceeds maxBaths"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    #[default]
    DateDesc,
    SqftDesc,
}

impl SortOrder {
    /// Fixed sort-key table used on outbound queries.
    pub fn provider_key(self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "listPriceAsc",
            SortOrder::PriceDesc => "listPriceDesc",
            SortOrder::DateDesc => "createdOnDesc",
            SortOrder::SqftDesc => "sqftDesc",
        }
    }

    /// Lenient parse of user-supplied sort names; anything unknown is newest first.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "price-asc" => SortOrder::PriceAsc,
            "price-desc" => SortOrder::PriceDesc,
            "sqft-desc" => SortOrder::SqftDesc,
            _ => SortOrder::DateDesc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    #[default]
    Sale,
    Rental,
}

impl TransactionType {
    pub fn provider_value(self) -> &'static str {
        match self {
            TransactionType::Sale => "Sale",
            TransactionType::Rental => "Lease",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Ring<LngLat> {
        Ring::new(vec![
            LngLat::new(-97.8, 30.2),
            LngLat::new(-97.7, 30.2),
            LngLat::new(-97.7, 30.3),
        ])
        .unwrap()
    }

    #[test]
    fn test_location_precedence() {
        let mut filters = SearchFilters {
            city: Some("Austin".into()),
            area: Some("Travis".into()),
            ..SearchFilters::default()
        };
        assert_eq!(filters.primary_location(), Some(LocationFilter::Area("Travis")));

        filters.zip = Some("78704".into());
        assert_eq!(filters.primary_location(), Some(LocationFilter::Zip("78704")));

        filters.polygon = Some(ring());
        assert!(matches!(
            filters.primary_location(),
            Some(LocationFilter::Polygon(_))
        ));
    }

    #[test]
    fn test_blank_location_fields_are_ignored() {
        let filters = SearchFilters {
            zip: Some("  ".into()),
            city: Some("Austin".into()),
            ..SearchFilters::default()
        };
        assert_eq!(filters.primary_location(), Some(LocationFilter::City("Austin")));
    }

    #[test]
    fn test_defaults() {
        let filters = SearchFilters::default();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.statuses(), vec![ListingStatus::Active]);
        assert_eq!(filters.transaction_type(), TransactionType::Sale);
        assert_eq!(filters.sort_order(), SortOrder::DateDesc);
        assert!(filters.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let zero_page = SearchFilters {
            page: 0,
            ..SearchFilters::default()
        };
        assert!(zero_page.validate().is_err());

        let inverted = SearchFilters {
            min_price: Some(900_000),
            max_price: Some(100_000),
            ..SearchFilters::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_sort_parse_defaults_to_newest() {
        assert_eq!(SortOrder::parse_lenient("price_asc"), SortOrder::PriceAsc);
        assert_eq!(SortOrder::parse_lenient("bogus"), SortOrder::DateDesc);
        assert_eq!(SortOrder::parse_lenient(""), SortOrder::DateDesc);
    }

    #[test]
    fn test_filters_deserialize_with_partial_fields() {
        let filters: SearchFilters =
            serde_json::from_str(r#"{"zip":"78704","sort":"price-desc"}"#).unwrap();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(filters.sort, Some(SortOrder::PriceDesc));
    }
}
