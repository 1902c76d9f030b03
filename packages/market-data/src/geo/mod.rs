//! Coordinate and polygon utilities.
//!
//! Three point shapes circulate through the system and must not be mixed up:
//!
//! - [`GeoPoint`]: `{ "lat": .., "lng": .. }` object form, used on listings.
//! - [`LatLng`]: `[lat, lng]` tuple, the rendering order (`displayPolygon`).
//! - [`LngLat`]: `[lng, lat]` tuple, the provider order (`polygon`, `map` bodies).
//!
//! Each is its own type, so a provider ring cannot be passed where a display
//! ring is expected. All functions here are pure.

mod point;
mod ring;

pub use point::{parse_coordinate_string, Coordinate, GeoPoint, LatLng, LngLat};
pub use ring::{bounding_box, close_ring, point_in_polygon, BoundingBox, Ring, MIN_RING_POINTS};
