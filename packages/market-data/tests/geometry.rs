//! Coordinate handling through the public API.

use market_data::{parse_coordinate_string, LatLng, LngLat, Ring, SearchFilters, ListingQuery, QueryBody};

#[test]
fn coordinate_string_to_closed_provider_ring() {
    let points = parse_coordinate_string("30.2672,-97.7431;30.2680,-97.7440;30.2660,-97.7420").unwrap();
    assert_eq!(points.len(), 3);

    let ring = Ring::<LngLat>::from_geo_points(&points).unwrap();
    assert_eq!(
        ring.to_pairs(),
        vec![[-97.7431, 30.2672], [-97.7440, 30.2680], [-97.7420, 30.2660]]
    );

    let closed = ring.closed();
    assert_eq!(closed.len(), 4);
    assert_eq!(closed.to_pairs()[3], [-97.7431, 30.2672]);
    assert_eq!(closed.closed(), closed);
}

#[test]
fn display_and_provider_orders_round_trip() {
    let display = Ring::new(vec![
        LatLng::new(30.2672, -97.7431),
        LatLng::new(30.2680, -97.7440),
        LatLng::new(30.2660, -97.7420),
    ])
    .unwrap();

    let provider = display.to_provider();
    assert_eq!(provider.to_display(), display);
}

#[test]
fn polygon_filters_become_a_closed_map_body() {
    let points = parse_coordinate_string("30.2672,-97.7431;30.2680,-97.7440;30.2660,-97.7420").unwrap();
    let ring = Ring::<LngLat>::from_geo_points(&points).unwrap();

    let query = ListingQuery::from_filters(&SearchFilters::for_polygon(ring)).unwrap();
    let Some(QueryBody::Polygon(body)) = query.body() else {
        panic!("polygon search must carry a body");
    };

    let json = serde_json::to_value(body).unwrap();
    assert_eq!(json["map"][0].as_array().unwrap().len(), 4);
    assert_eq!(json["map"][0][0], serde_json::json!([-97.7431, 30.2672]));
}

#[test]
fn two_point_ring_is_rejected() {
    let points = parse_coordinate_string("30.2672,-97.7431;30.2680,-97.7440").unwrap();
    assert!(Ring::<LngLat>::from_geo_points(&points).is_err());
}
