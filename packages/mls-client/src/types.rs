//! Wire types for the MLS provider API.
//!
//! The provider is loose about field typing: numeric fields such as `sqft`,
//! `yearBuilt` or `listPrice` arrive either as JSON numbers or as numeric
//! strings depending on the board that supplied the record. Those fields are
//! kept as raw [`serde_json::Value`] here and coerced by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope for `GET/POST /listings`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingsEnvelope {
    pub count: u64,
    pub page: u32,
    pub num_pages: u32,
    pub page_size: u32,
    pub listings: Vec<RawListing>,
    pub statistics: Option<ListingStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingStatistics {
    pub list_price: Option<PriceRange>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// A single listing record as returned by the provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawListing {
    pub mls_number: Option<String>,
    pub list_price: Option<Value>,
    pub status: Option<String>,
    pub last_status: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    #[serde(rename = "class")]
    pub property_class: Option<String>,
    pub address: Option<RawAddress>,
    pub details: Option<RawDetails>,
    pub lot: Option<RawLot>,
    pub days_on_market: Option<Value>,
    pub images: Vec<String>,
    pub map: Option<RawMapPoint>,
    pub list_date: Option<String>,
    pub updated_on: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAddress {
    pub street_number: Option<Value>,
    pub street_name: Option<String>,
    pub street_suffix: Option<String>,
    pub unit_number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<Value>,
    pub neighborhood: Option<String>,
    pub area: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDetails {
    pub num_bedrooms: Option<Value>,
    pub num_bathrooms: Option<Value>,
    pub sqft: Option<Value>,
    pub year_built: Option<Value>,
    pub property_type: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawLot {
    pub acres: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawMapPoint {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
}

/// POST body for polygon searches: `{ "map": [[[lng, lat], ...]] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapBody {
    pub map: Vec<Vec<[f64; 2]>>,
}

impl MapBody {
    /// Wrap a single `[lng, lat]` ring.
    pub fn single_ring(ring: Vec<[f64; 2]>) -> Self {
        Self { map: vec![ring] }
    }
}

/// Input for `POST /nlp`.
#[derive(Debug, Clone, Serialize)]
pub struct NlpRequest {
    pub prompt: String,
    #[serde(rename = "nlpId", skip_serializing_if = "Option::is_none")]
    pub nlp_id: Option<String>,
}

/// Output of `POST /nlp`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NlpResponse {
    pub request: NlpListingRequest,
    #[serde(rename = "nlpId", default)]
    pub nlp_id: Option<String>,
}

/// The provider-native listings request the NLP endpoint derived from a prompt.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NlpListingRequest {
    pub url: String,
    pub body: Option<Value>,
    pub summary: Option<String>,
}

/// Response envelope for `GET /locations`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationsEnvelope {
    pub page: u32,
    pub num_pages: u32,
    pub locations: Vec<RawLocation>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawLocation {
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub map: Option<RawLocationMap>,
    pub address: Option<RawLocationAddress>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawLocationMap {
    /// Boundary rings in `[lng, lat]` order.
    pub boundary: Option<Vec<Vec<[f64; 2]>>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawLocationAddress {
    pub city: Option<String>,
    pub state: Option<String>,
    pub area: Option<String>,
}
