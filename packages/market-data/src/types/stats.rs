use serde::{Deserialize, Serialize};

use super::filters::SearchFilters;
use super::listing::Listing;
use super::results::PriceBounds;
use crate::geo::{LngLat, Ring};

/// Aggregate market figures for an area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    /// Provider-reported total, not the sample size.
    pub total_listings: u64,
    pub sample_size: u32,
    pub median_price: i64,
    pub average_price: i64,
    pub min_price: i64,
    pub max_price: i64,
    pub avg_days_on_market: f64,
    pub avg_price_per_sqft: f64,
}

impl MarketStats {
    /// Compute stats over a listing sample.
    ///
    /// The median is the lower-middle element of the price-ascending sort,
    /// without interpolation. Price-per-square-foot only counts listings with
    /// a known area. Provider-reported bounds win over the sample's extrema.
    pub fn from_listings(listings: &[Listing], total: u64, bounds: Option<PriceBounds>) -> Self {
        if listings.is_empty() {
            return Self {
                total_listings: total,
                min_price: bounds.map(|b| b.min).unwrap_or_default(),
                max_price: bounds.map(|b| b.max).unwrap_or_default(),
                ..Self::default()
            };
        }

        let mut prices: Vec<i64> = listings.iter().map(|l| l.price).collect();
        prices.sort_unstable();

        let n = prices.len();
        let median_price = prices[(n - 1) / 2];
        let average_price = (prices.iter().map(|&p| p as f64).sum::<f64>() / n as f64).round() as i64;

        let avg_days_on_market = round_to(
            listings.iter().map(|l| l.days_on_market as f64).sum::<f64>() / n as f64,
            1,
        );

        let per_sqft: Vec<f64> = listings.iter().filter_map(Listing::price_per_sqft).collect();
        let avg_price_per_sqft = if per_sqft.is_empty() {
            0.0
        } else {
            round_to(per_sqft.iter().sum::<f64>() / per_sqft.len() as f64, 2)
        };

        let (min_price, max_price) = match bounds {
            Some(b) => (b.min, b.max),
            None => (prices[0], prices[n - 1]),
        };

        Self {
            total_listings: total.max(n as u64),
            sample_size: n as u32,
            median_price,
            average_price,
            min_price,
            max_price,
            avg_days_on_market,
            avg_price_per_sqft,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Composite key identifying the area a [`MarketStats`] entry describes.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaKey {
    Zip(String),
    City(String),
    Area(String),
    Polygon(Ring<LngLat>),
}

impl AreaKey {
    /// Cache key such as `zip:78704`, `city:austin` or `polygon:<sha256>`.
    pub fn cache_key(&self) -> String {
        fn slugged(v: &str) -> String {
            v.trim()
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-")
        }

        match self {
            AreaKey::Zip(zip) => format!("zip:{}", zip.trim()),
            AreaKey::City(city) => format!("city:{}", slugged(city)),
            AreaKey::Area(area) => format!("area:{}", slugged(area)),
            AreaKey::Polygon(ring) => format!("polygon:{}", ring.fingerprint()),
        }
    }

    /// Filters that select the listings this key describes.
    pub fn to_filters(&self, page_size: u32) -> SearchFilters {
        let mut filters = SearchFilters {
            page_size,
            ..SearchFilters::default()
        };
        match self {
            AreaKey::Zip(zip) => filters.zip = Some(zip.clone()),
            AreaKey::City(city) => filters.city = Some(city.clone()),
            AreaKey::Area(area) => filters.area = Some(area.clone()),
            AreaKey::Polygon(ring) => filters.polygon = Some(ring.clone()),
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::{Address, ListingStatus, PropertyType};

    fn listing(price: i64, sqft: u32, dom: u32) -> Listing {
        Listing {
            mls_number: format!("MLS{price}"),
            address: Address::default(),
            price,
            bedrooms: 3,
            bathrooms: 2.0,
            square_feet: sqft,
            lot_size_acres: None,
            year_built: None,
            property_type: PropertyType::SingleFamily,
            status: ListingStatus::Active,
            days_on_market: dom,
            photos: vec![],
            location: None,
            listed_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_median_uses_lower_middle_on_even_input() {
        let listings = vec![
            listing(400_000, 1000, 10),
            listing(100_000, 1000, 10),
            listing(300_000, 1000, 10),
            listing(200_000, 1000, 10),
        ];
        let stats = MarketStats::from_listings(&listings, 4, None);
        assert_eq!(stats.median_price, 200_000);
        assert_eq!(stats.average_price, 250_000);
        assert_eq!(stats.min_price, 100_000);
        assert_eq!(stats.max_price, 400_000);
    }

    #[test]
    fn test_median_odd_input() {
        let listings = vec![
            listing(500_000, 0, 5),
            listing(100_000, 0, 5),
            listing(300_000, 0, 5),
        ];
        let stats = MarketStats::from_listings(&listings, 3, None);
        assert_eq!(stats.median_price, 300_000);
    }

    #[test]
    fn test_price_per_sqft_skips_unknown_area() {
        let listings = vec![listing(300_000, 1500, 20), listing(500_000, 0, 40)];
        let stats = MarketStats::from_listings(&listings, 90, None);
        assert_eq!(stats.avg_price_per_sqft, 200.0);
        assert_eq!(stats.avg_days_on_market, 30.0);
        assert_eq!(stats.total_listings, 90);
        assert_eq!(stats.sample_size, 2);
    }

    #[test]
    fn test_empty_sample_is_zeroed() {
        let stats = MarketStats::from_listings(&[], 0, None);
        assert_eq!(stats, MarketStats::default());
    }

    #[test]
    fn test_provider_bounds_win() {
        let listings = vec![listing(300_000, 1500, 20)];
        let stats = MarketStats::from_listings(
            &listings,
            50,
            Some(PriceBounds {
                min: 150_000,
                max: 2_000_000,
            }),
        );
        assert_eq!(stats.min_price, 150_000);
        assert_eq!(stats.max_price, 2_000_000);
    }

    #[test]
    fn test_area_cache_keys() {
        assert_eq!(AreaKey::Zip(" 78704 ".into()).cache_key(), "zip:78704");
        assert_eq!(AreaKey::City("Round  Rock".into()).cache_key(), "city:round-rock");
        assert_eq!(AreaKey::Area("Travis County".into()).cache_key(), "area:travis-county");

        let ring = Ring::new(vec![
            LngLat::new(-97.8, 30.2),
            LngLat::new(-97.7, 30.2),
            LngLat::new(-97.7, 30.3),
        ])
        .unwrap();
        assert!(AreaKey::Polygon(ring).cache_key().starts_with("polygon:"));
    }
}
