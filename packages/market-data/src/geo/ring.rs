use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::point::{Coordinate, GeoPoint, LatLng, LngLat};
use crate::error::{MarketDataError, Result};

/// Rings with fewer points than this are invalid and must be rejected before querying.
pub const MIN_RING_POINTS: usize = 3;

/// An ordered polygon boundary in a single coordinate order.
///
/// Construction enforces [`MIN_RING_POINTS`]; a ring is never padded.
/// Closing is explicit via [`Ring::closed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<P>", into = "Vec<P>")]
#[serde(bound(
    serialize = "P: Serialize + Clone",
    deserialize = "P: Deserialize<'de> + Coordinate"
))]
pub struct Ring<P> {
    points: Vec<P>,
}

impl<P: Coordinate> Ring<P> {
    pub fn new(points: Vec<P>) -> Result<Self> {
        if points.len() < MIN_RING_POINTS {
            return Err(MarketDataError::validation(format!(
                "polygon needs at least {} points, got {}",
                MIN_RING_POINTS,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<P> {
        self.points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        // Non-empty by construction.
        bounding_box(&self.points).unwrap_or_default()
    }

    pub fn contains(&self, point: impl Coordinate) -> bool {
        point_in_polygon(&self.points, point)
    }

    fn map_points<Q: Coordinate>(&self, f: impl Fn(P) -> Q) -> Ring<Q> {
        Ring {
            points: self.points.iter().copied().map(f).collect(),
        }
    }
}

impl<P: Coordinate + PartialEq> Ring<P> {
    pub fn is_closed(&self) -> bool {
        self.points.first() == self.points.last()
    }

    /// The ring with its first point appended when not already closed.
    pub fn closed(&self) -> Self {
        Self {
            points: close_ring(&self.points),
        }
    }
}

impl Ring<LngLat> {
    /// Build a provider-order ring from object-form points.
    pub fn from_geo_points(points: &[GeoPoint]) -> Result<Self> {
        Self::new(points.iter().copied().map(LngLat::from).collect())
    }

    /// Rendering-order copy of this ring.
    pub fn to_display(&self) -> Ring<LatLng> {
        self.map_points(LatLng::from)
    }

    /// `[[lng, lat], ...]` pairs for a provider `map` body.
    pub fn to_pairs(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| p.to_pair()).collect()
    }

    /// Stable content hash, used to key cached stats for ad-hoc polygons.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for p in &self.points {
            hasher.update(p.lng.to_le_bytes());
            hasher.update(p.lat.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl Ring<LatLng> {
    /// Provider-order copy of this ring.
    pub fn to_provider(&self) -> Ring<LngLat> {
        self.map_points(LngLat::from)
    }
}

impl<P: Coordinate> TryFrom<Vec<P>> for Ring<P> {
    type Error = MarketDataError;

    fn try_from(points: Vec<P>) -> Result<Self> {
        Self::new(points)
    }
}

impl<P> From<Ring<P>> for Vec<P> {
    fn from(ring: Ring<P>) -> Self {
        ring.points
    }
}

/// Axis-aligned extent of a set of points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: impl Coordinate) -> bool {
        (self.south..=self.north).contains(&point.lat())
            && (self.west..=self.east).contains(&point.lng())
    }
}

/// Append the first point when the last one differs from it.
///
/// Equality is exact numeric equality; there is no epsilon.
pub fn close_ring<P: Copy + PartialEq>(points: &[P]) -> Vec<P> {
    let mut closed = points.to_vec();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        if first != last {
            closed.push(*first);
        }
    }
    closed
}

/// North/south/east/west extrema, or `None` for an empty slice.
pub fn bounding_box<P: Coordinate>(points: &[P]) -> Option<BoundingBox> {
    let first = points.first()?;
    let init = BoundingBox {
        north: first.lat(),
        south: first.lat(),
        east: first.lng(),
        west: first.lng(),
    };

    Some(points.iter().skip(1).fold(init, |bb, p| BoundingBox {
        north: bb.north.max(p.lat()),
        south: bb.south.min(p.lat()),
        east: bb.east.max(p.lng()),
        west: bb.west.min(p.lng()),
    }))
}

/// Even-odd ray casting test. Points exactly on an edge or vertex may land
/// on either side.
pub fn point_in_polygon<P: Coordinate>(ring: &[P], point: impl Coordinate) -> bool {
    let (x, y) = (point.lng(), point.lat());
    let n = ring.len();
    if n < MIN_RING_POINTS {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].lng(), ring[i].lat());
        let (xj, yj) = (ring[j].lng(), ring[j].lat());

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::parse_coordinate_string;

    fn square() -> Ring<LngLat> {
        Ring::new(vec![
            LngLat::new(-97.80, 30.20),
            LngLat::new(-97.70, 30.20),
            LngLat::new(-97.70, 30.30),
            LngLat::new(-97.80, 30.30),
        ])
        .unwrap()
    }

    #[test]
    fn test_scenario_parse_convert_close() {
        let points =
            parse_coordinate_string("30.2672,-97.7431;30.2680,-97.7440;30.2660,-97.7420").unwrap();
        let ring = Ring::from_geo_points(&points).unwrap();

        assert_eq!(
            ring.to_pairs(),
            vec![[-97.7431, 30.2672], [-97.7440, 30.2680], [-97.7420, 30.2660]]
        );

        let closed = ring.closed();
        assert_eq!(closed.len(), 4);
        assert_eq!(closed.to_pairs()[3], [-97.7431, 30.2672]);
    }

    #[test]
    fn test_closing_is_idempotent() {
        let once = square().closed();
        let twice = once.closed();
        assert_eq!(once, twice);
        assert!(once.is_closed());
        assert!(!square().is_closed());
    }

    #[test]
    fn test_close_uses_exact_equality() {
        let nearly = vec![
            LngLat::new(-97.0, 30.0),
            LngLat::new(-97.1, 30.1),
            LngLat::new(-97.0, 30.000000001),
        ];
        assert_eq!(close_ring(&nearly).len(), 4);
    }

    #[test]
    fn test_short_rings_are_rejected() {
        let err = Ring::new(vec![LngLat::new(-97.0, 30.0), LngLat::new(-97.1, 30.1)]).unwrap_err();
        assert!(matches!(err, MarketDataError::Validation(_)));

        let err = serde_json::from_str::<Ring<LngLat>>("[[-97.0,30.0]]").unwrap_err();
        assert!(err.to_string().contains("at least 3"));
    }

    #[test]
    fn test_bounding_box() {
        let bb = square().bounding_box();
        assert_eq!(bb.north, 30.30);
        assert_eq!(bb.south, 30.20);
        assert_eq!(bb.east, -97.70);
        assert_eq!(bb.west, -97.80);
        assert!(bb.contains(GeoPoint::new(30.25, -97.75)));
        assert!(bounding_box::<LngLat>(&[]).is_none());
    }

    #[test]
    fn test_point_in_polygon() {
        let ring = square();
        assert!(ring.contains(GeoPoint::new(30.25, -97.75)));
        assert!(!ring.contains(GeoPoint::new(30.35, -97.75)));
        assert!(!ring.contains(LatLng::new(30.25, -97.65)));

        // Closing the ring does not change containment.
        assert!(ring.closed().contains(GeoPoint::new(30.25, -97.75)));
    }

    #[test]
    fn test_display_and_provider_rings_round_trip() {
        let provider = square();
        let display = provider.to_display();

        assert_eq!(display.points()[0], LatLng::new(30.20, -97.80));
        assert_eq!(display.to_provider(), provider);
        assert_eq!(
            serde_json::to_value(&display).unwrap()[0],
            serde_json::json!([30.20, -97.80])
        );
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = square();
        let mut reversed = a.clone().into_points();
        reversed.reverse();
        let b = Ring::new(reversed).unwrap();

        assert_eq!(a.fingerprint(), square().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
