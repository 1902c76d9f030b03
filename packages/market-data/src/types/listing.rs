use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// A single MLS listing in canonical shape.
///
/// Listings mirror live MLS state and are only ever cached, never persisted
/// as a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub mls_number: String,
    pub address: Address,
    /// Whole currency units.
    pub price: i64,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub square_feet: u32,
    pub lot_size_acres: Option<f64>,
    pub year_built: Option<i32>,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub days_on_market: u32,
    pub photos: Vec<String>,
    pub location: Option<GeoPoint>,
    pub listed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn price_per_sqft(&self) -> Option<f64> {
        (self.square_feet > 0 && self.price > 0).then(|| self.price as f64 / self.square_feet as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub street_suffix: Option<String>,
    pub unit: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub neighborhood: Option<String>,
    /// Precomputed single-line form, see [`crate::normalize::full_address`].
    pub full: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    SingleFamily,
    Condo,
    Townhouse,
    MultiFamily,
    Land,
}

impl PropertyType {
    /// Map the provider's free-form property type / class text onto the closed set.
    /// Unrecognized text is treated as single family.
    pub fn from_provider(raw: &str) -> Self {
        let raw = raw.to_ascii_lowercase();
        if raw.contains("condo") || raw.contains("apartment") {
            PropertyType::Condo
        } else if raw.contains("town") || raw.contains("row house") {
            PropertyType::Townhouse
        } else if ["multi", "duplex", "triplex", "fourplex", "quadruplex"]
            .iter()
            .any(|k| raw.contains(k))
        {
            PropertyType::MultiFamily
        } else if ["land", "lot", "acreage", "farm", "ranch"]
            .iter()
            .any(|k| raw.contains(k))
        {
            PropertyType::Land
        } else {
            PropertyType::SingleFamily
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingStatus {
    Active,
    Pending,
    Sold,
    ComingSoon,
}

impl ListingStatus {
    /// Fixed status-code table used on outbound queries.
    pub fn provider_code(self) -> &'static str {
        match self {
            ListingStatus::Active => "A",
            ListingStatus::Pending => "P",
            ListingStatus::Sold => "S",
            ListingStatus::ComingSoon => "C",
        }
    }

    /// Map raw provider status text (single-letter codes or words) onto the closed set.
    /// Unrecognized codes are treated as active.
    pub fn from_provider(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "p" | "u" | "pnd" | "pending" | "undercontract" | "contingent" | "sc" => {
                ListingStatus::Pending
            }
            "s" | "sld" | "sold" | "closed" => ListingStatus::Sold,
            "c" | "cs" | "comingsoon" => ListingStatus::ComingSoon,
            _ => ListingStatus::Active,
        }
    }
}
