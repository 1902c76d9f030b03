//! Raw provider record → canonical [`Listing`].
//!
//! Pure and infallible: fields that fail to coerce fall back to zero (numeric
//! counts) or `None` (optional attributes) instead of raising.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use mls_client::{RawAddress, RawListing};

use crate::geo::GeoPoint;
use crate::types::{Address, Listing, ListingStatus, PropertyType};

/// Knobs for the normalizer that depend on the deployment, not the record.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Prefix for relative photo paths. Absolute URLs pass through unchanged.
    pub image_base_url: Option<String>,
}

impl NormalizeOptions {
    pub fn with_image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = Some(url.into());
        self
    }
}

pub fn normalize_listing(raw: &RawListing, options: &NormalizeOptions) -> Listing {
    let details = raw.details.clone().unwrap_or_default();
    let address = normalize_address(raw.address.as_ref());

    let property_type = details
        .property_type
        .as_deref()
        .or(raw.property_class.as_deref())
        .map(PropertyType::from_provider)
        .unwrap_or(PropertyType::SingleFamily);

    Listing {
        mls_number: raw.mls_number.clone().unwrap_or_default(),
        address,
        price: coerce_f64(raw.list_price.as_ref())
            .map(|p| p.max(0.0).round() as i64)
            .unwrap_or(0),
        bedrooms: coerce_count(details.num_bedrooms.as_ref()),
        bathrooms: coerce_f64(details.num_bathrooms.as_ref())
            .map(|b| b.max(0.0))
            .unwrap_or(0.0),
        square_feet: coerce_count(details.sqft.as_ref()),
        lot_size_acres: raw
            .lot
            .as_ref()
            .and_then(|lot| coerce_f64(lot.acres.as_ref()))
            .filter(|acres| *acres > 0.0),
        year_built: coerce_f64(details.year_built.as_ref())
            .map(|y| y as i32)
            .filter(|y| *y > 0),
        property_type,
        status: normalize_status(raw.status.as_deref(), raw.last_status.as_deref()),
        days_on_market: coerce_count(raw.days_on_market.as_ref()),
        photos: raw
            .images
            .iter()
            .filter(|img| !img.trim().is_empty())
            .map(|img| photo_url(img, options.image_base_url.as_deref()))
            .collect(),
        location: raw.map.as_ref().and_then(|m| {
            let lat = coerce_f64(m.latitude.as_ref())?;
            let lng = coerce_f64(m.longitude.as_ref())?;
            (lat != 0.0 || lng != 0.0).then_some(GeoPoint::new(lat, lng))
        }),
        listed_at: raw.list_date.as_deref().and_then(parse_timestamp),
        updated_at: raw.updated_on.as_deref().and_then(parse_timestamp),
    }
}

/// `status` "U" (unavailable) defers to `lastStatus`, which says why.
fn normalize_status(status: Option<&str>, last_status: Option<&str>) -> ListingStatus {
    let code = match (status, last_status) {
        (Some(s), Some(last)) if s.trim().eq_ignore_ascii_case("u") => last,
        (Some(s), _) => s,
        (None, Some(last)) => last,
        (None, None) => return ListingStatus::Active,
    };
    ListingStatus::from_provider(code)
}

fn normalize_address(raw: Option<&RawAddress>) -> Address {
    let Some(raw) = raw else {
        return Address::default();
    };

    let mut address = Address {
        street_number: coerce_string(raw.street_number.as_ref()),
        street_name: clean(raw.street_name.as_deref()),
        street_suffix: clean(raw.street_suffix.as_deref()),
        unit: clean(raw.unit_number.as_deref()),
        city: clean(raw.city.as_deref()),
        state: clean(raw.state.as_deref()),
        zip: coerce_string(raw.zip.as_ref()),
        neighborhood: clean(raw.neighborhood.as_deref()).or_else(|| clean(raw.area.as_deref())),
        full: String::new(),
    };
    address.full = full_address(&address);
    address
}

/// Canonical single-line address:
/// `"{number} {name} {suffix} #{unit}, {city}, {state} {zip}"` with empty parts dropped.
pub fn full_address(address: &Address) -> String {
    let mut street = [
        address.street_number.as_deref(),
        address.street_name.as_deref(),
        address.street_suffix.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    if let Some(unit) = address.unit.as_deref() {
        let unit = unit.trim_start_matches('#').trim();
        if !unit.is_empty() {
            if !street.is_empty() {
                street.push(' ');
            }
            street.push('#');
            street.push_str(unit);
        }
    }

    let state_zip = [address.state.as_deref(), address.zip.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    [Some(street), address.city.clone(), Some(state_zip)]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn photo_url(image: &str, base: Option<&str>) -> String {
    let image = image.trim();
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }
    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), image.trim_start_matches('/')),
        None => image.to_string(),
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Numbers or numeric strings (`"1,450"`, `"$350000"`) as `f64`.
fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| !matches!(c, ',' | '$')).collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Non-negative whole count; zero when missing or unparseable.
fn coerce_count(value: Option<&Value>) -> u32 {
    coerce_f64(value)
        .map(|v| v.max(0.0).round().min(u32::MAX as f64) as u32)
        .unwrap_or(0)
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => clean(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawListing {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalizes_full_record() {
        let record = raw(json!({
            "mlsNumber": "ACT1234567",
            "listPrice": "599000.00",
            "status": "A",
            "class": "ResidentialProperty",
            "address": {
                "streetNumber": 1604,
                "streetName": "Barton Springs",
                "streetSuffix": "Rd",
                "unitNumber": "#12",
                "city": "Austin",
                "state": "TX",
                "zip": "78704",
                "neighborhood": "Zilker"
            },
            "details": {
                "numBedrooms": 3,
                "numBathrooms": "2.5",
                "sqft": "1,850",
                "yearBuilt": "1962",
                "propertyType": "Condominium"
            },
            "lot": { "acres": 0.12 },
            "daysOnMarket": "14",
            "images": ["area/IMG-ACT1234567_1.jpg", "https://cdn.example.com/x.jpg"],
            "map": { "latitude": "30.2641", "longitude": -97.7664 },
            "listDate": "2026-09-01T14:30:00.000Z",
            "updatedOn": "2026-09-15 08:00:00"
        }));

        let options = NormalizeOptions::default().with_image_base_url("https://img.example.com/");
        let listing = normalize_listing(&record, &options);

        assert_eq!(listing.mls_number, "ACT1234567");
        assert_eq!(listing.price, 599_000);
        assert_eq!(listing.bedrooms, 3);
        assert_eq!(listing.bathrooms, 2.5);
        assert_eq!(listing.square_feet, 1850);
        assert_eq!(listing.year_built, Some(1962));
        assert_eq!(listing.lot_size_acres, Some(0.12));
        assert_eq!(listing.property_type, PropertyType::Condo);
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.days_on_market, 14);
        assert_eq!(
            listing.photos,
            vec![
                "https://img.example.com/area/IMG-ACT1234567_1.jpg".to_string(),
                "https://cdn.example.com/x.jpg".to_string(),
            ]
        );
        assert_eq!(listing.location, Some(GeoPoint::new(30.2641, -97.7664)));
        assert_eq!(
            listing.address.full,
            "1604 Barton Springs Rd #12, Austin, TX 78704"
        );
        assert_eq!(listing.address.neighborhood.as_deref(), Some("Zilker"));
        assert!(listing.listed_at.is_some());
        assert!(listing.updated_at.is_some());
    }

    #[test]
    fn test_unparseable_numbers_default_instead_of_failing() {
        let record = raw(json!({
            "mlsNumber": "X1",
            "listPrice": "call for price",
            "details": { "sqft": "n/a", "yearBuilt": "unknown", "numBedrooms": null },
            "daysOnMarket": { "nested": true }
        }));

        let listing = normalize_listing(&record, &NormalizeOptions::default());
        assert_eq!(listing.price, 0);
        assert_eq!(listing.square_feet, 0);
        assert_eq!(listing.year_built, None);
        assert_eq!(listing.bedrooms, 0);
        assert_eq!(listing.days_on_market, 0);
        assert_eq!(listing.location, None);
    }

    #[test]
    fn test_negative_square_footage_clamps_to_zero() {
        let record = raw(json!({ "details": { "sqft": -40 } }));
        assert_eq!(normalize_listing(&record, &NormalizeOptions::default()).square_feet, 0);
    }

    #[test]
    fn test_unavailable_status_defers_to_last_status() {
        let sold = raw(json!({ "status": "U", "lastStatus": "Sld" }));
        let pending = raw(json!({ "status": "U", "lastStatus": "Pnd" }));
        let bare = raw(json!({}));

        let opts = NormalizeOptions::default();
        assert_eq!(normalize_listing(&sold, &opts).status, ListingStatus::Sold);
        assert_eq!(normalize_listing(&pending, &opts).status, ListingStatus::Pending);
        assert_eq!(normalize_listing(&bare, &opts).status, ListingStatus::Active);
    }

    #[test]
    fn test_full_address_join_order() {
        let address = Address {
            street_number: Some("700".into()),
            street_name: Some("Congress".into()),
            street_suffix: Some("Ave".into()),
            unit: None,
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip: Some("78701".into()),
            neighborhood: None,
            full: String::new(),
        };
        assert_eq!(full_address(&address), "700 Congress Ave, Austin, TX 78701");

        let partial = Address {
            city: Some("Austin".into()),
            zip: Some("78701".into()),
            ..Address::default()
        };
        assert_eq!(full_address(&partial), "Austin, 78701");
        assert_eq!(full_address(&Address::default()), "");
    }

    #[test]
    fn test_zip_as_number() {
        let record = raw(json!({ "address": { "zip": 78704, "city": "Austin" } }));
        let listing = normalize_listing(&record, &NormalizeOptions::default());
        assert_eq!(listing.address.zip.as_deref(), Some("78704"));
    }
}
