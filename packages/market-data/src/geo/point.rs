use serde::{Deserialize, Serialize};

use crate::error::{MarketDataError, Result};

/// Read access shared by every point representation.
pub trait Coordinate: Copy {
    fn lat(&self) -> f64;
    fn lng(&self) -> f64;

    fn to_geo_point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat(),
            lng: self.lng(),
        }
    }
}

/// Object-form point: `{ "lat": 30.26, "lng": -97.74 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Rendering-order tuple: serializes as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Provider-order tuple: serializes as `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn to_pair(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl Coordinate for GeoPoint {
    fn lat(&self) -> f64 {
        self.lat
    }
    fn lng(&self) -> f64 {
        self.lng
    }
}

impl Coordinate for LatLng {
    fn lat(&self) -> f64 {
        self.lat
    }
    fn lng(&self) -> f64 {
        self.lng
    }
}

impl Coordinate for LngLat {
    fn lat(&self) -> f64 {
        self.lat
    }
    fn lng(&self) -> f64 {
        self.lng
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(p: LatLng) -> Self {
        [p.lat, p.lng]
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

impl From<GeoPoint> for LatLng {
    fn from(p: GeoPoint) -> Self {
        Self::new(p.lat, p.lng)
    }
}

impl From<GeoPoint> for LngLat {
    fn from(p: GeoPoint) -> Self {
        Self::new(p.lng, p.lat)
    }
}

impl From<LatLng> for LngLat {
    fn from(p: LatLng) -> Self {
        Self::new(p.lng, p.lat)
    }
}

impl From<LngLat> for LatLng {
    fn from(p: LngLat) -> Self {
        Self::new(p.lat, p.lng)
    }
}

impl From<LatLng> for GeoPoint {
    fn from(p: LatLng) -> Self {
        Self::new(p.lat, p.lng)
    }
}

impl From<LngLat> for GeoPoint {
    fn from(p: LngLat) -> Self {
        Self::new(p.lat, p.lng)
    }
}

/// Parse `"lat,lng;lat,lng;..."` into points, preserving order.
///
/// Whitespace around numbers is ignored and a trailing `;` is tolerated.
/// Anything else that is not a finite `lat,lng` pair is a validation error.
pub fn parse_coordinate_string(input: &str) -> Result<Vec<GeoPoint>> {
    let mut points = Vec::new();

    for (idx, segment) in input.split(';').enumerate() {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let mut parts = segment.split(',');
        let (lat, lng) = match (parts.next(), parts.next(), parts.next()) {
            (Some(lat), Some(lng), None) => (lat.trim(), lng.trim()),
            _ => {
                return Err(MarketDataError::validation(format!(
                    "coordinate #{} is not a lat,lng pair: {:?}",
                    idx + 1,
                    segment
                )))
            }
        };

        let lat = parse_component(lat, idx)?;
        let lng = parse_component(lng, idx)?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(MarketDataError::validation(format!(
                "coordinate #{} out of range: {},{}",
                idx + 1,
                lat,
                lng
            )));
        }

        points.push(GeoPoint::new(lat, lng));
    }

    if points.is_empty() {
        return Err(MarketDataError::validation("coordinate string is empty"));
    }

    Ok(points)
}

fn parse_component(raw: &str, idx: usize) -> Result<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            MarketDataError::validation(format!(
                "coordinate #{} has a non-numeric component: {:?}",
                idx + 1,
                raw
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate_string() {
        let points =
            parse_coordinate_string("30.2672,-97.7431;30.2680,-97.7440;30.2660,-97.7420").unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0], GeoPoint::new(30.2672, -97.7431));
        assert_eq!(points[2], GeoPoint::new(30.2660, -97.7420));
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_trailing_separator() {
        let points = parse_coordinate_string(" 30.1, -97.1 ; 30.2,-97.2; ").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], GeoPoint::new(30.2, -97.2));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for bad in ["", ";", "30.1", "30.1,-97.1,5", "abc,-97.1", "30.1,NaN", "95.0,-97.0"] {
            let err = parse_coordinate_string(bad).unwrap_err();
            assert!(
                matches!(err, MarketDataError::Validation(_)),
                "expected validation error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_tuple_serialization_order() {
        let display = LatLng::new(30.2672, -97.7431);
        let provider = LngLat::from(display);

        assert_eq!(serde_json::to_string(&display).unwrap(), "[30.2672,-97.7431]");
        assert_eq!(serde_json::to_string(&provider).unwrap(), "[-97.7431,30.2672]");

        let back: LngLat = serde_json::from_str("[-97.7431,30.2672]").unwrap();
        assert_eq!(back, provider);
        assert_eq!(LatLng::from(back), display);
    }

    #[test]
    fn test_object_form_round_trip_through_provider_order() {
        let original = vec![
            GeoPoint::new(30.2672, -97.7431),
            GeoPoint::new(30.2680, -97.7440),
            GeoPoint::new(30.2660, -97.7420),
        ];

        let provider: Vec<LngLat> = original.iter().copied().map(LngLat::from).collect();
        let restored: Vec<GeoPoint> = provider.into_iter().map(GeoPoint::from).collect();

        assert_eq!(restored, original);
    }
}
