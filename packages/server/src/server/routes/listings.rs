use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use market_data::types::filters::DEFAULT_PAGE_SIZE;
use market_data::{
    parse_coordinate_string, Listing, ListingStatus, MarketDataError, Ring, SearchFilters,
    SearchResults, SortOrder, TransactionType,
};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Query-string form of [`SearchFilters`].
///
/// `polygon` is `lat,lng;lat,lng;...`; `status` is a comma-separated list of
/// `active`, `pending`, `sold` or `coming-soon` (provider codes also accepted).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingsParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_beds: Option<u32>,
    pub max_beds: Option<u32>,
    pub min_baths: Option<f64>,
    pub max_baths: Option<f64>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub area: Option<String>,
    pub polygon: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub transaction: Option<String>,
}

impl ListingsParams {
    pub fn into_filters(self) -> Result<SearchFilters, MarketDataError> {
        let polygon = match self.polygon.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let points = parse_coordinate_string(raw)?;
                Some(Ring::from_geo_points(&points)?.closed())
            }
            _ => None,
        };

        let status = self
            .status
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ListingStatus::from_provider)
                    .collect()
            })
            .unwrap_or_default();

        let transaction = self.transaction.as_deref().map(|raw| {
            match raw.trim().to_ascii_lowercase().as_str() {
                "rental" | "rent" | "lease" => TransactionType::Rental,
                _ => TransactionType::Sale,
            }
        });

        let filters = SearchFilters {
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            min_price: self.min_price,
            max_price: self.max_price,
            min_beds: self.min_beds,
            max_beds: self.max_beds,
            min_baths: self.min_baths,
            max_baths: self.max_baths,
            city: self.city,
            zip: self.zip,
            area: self.area,
            polygon,
            status,
            sort: self.sort.as_deref().map(SortOrder::parse_lenient),
            transaction,
        };
        filters.validate()?;
        Ok(filters)
    }
}

/// `GET /listings`
pub async fn search_listings_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<ListingsParams>,
) -> Result<Json<SearchResults>, ApiError> {
    let filters = params.into_filters()?;
    let results = state.aggregator.search(&filters).await?;
    Ok(Json(results))
}

/// `GET /listings/:mls_number`
pub async fn get_listing_handler(
    Extension(state): Extension<AppState>,
    Path(mls_number): Path<String>,
) -> Result<Json<Listing>, ApiError> {
    let listing = state.aggregator.get_listing(&mls_number).await?;
    Ok(Json(listing))
}
