//! Tests for geographic primitives

use signalmatch::GeoPoint;
use signalmatch::geo_utils::{
    bounds_overlap, compute_bounds, compute_center, distance_to_segment, haversine_distance,
    is_within_corridor, meters_to_degrees, offset_meters, project_onto_segment,
    wrap_longitude_delta,
};

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} within {} of {}",
        actual,
        tolerance,
        expected
    );
}

// ============================================================================
// Distance
// ============================================================================

#[test]
fn test_haversine_known_distance() {
    // London to Paris is ~343.5km
    let london = GeoPoint::new(51.5074, -0.1278);
    let paris = GeoPoint::new(48.8566, 2.3522);
    assert_close(haversine_distance(&london, &paris), 343_500.0, 1_500.0);
}

#[test]
fn test_haversine_zero_for_same_point() {
    let p = GeoPoint::new(40.7128, -74.0060);
    assert_eq!(haversine_distance(&p, &p), 0.0);
}

#[test]
fn test_haversine_symmetric() {
    let a = GeoPoint::new(-33.8688, 151.2093);
    let b = GeoPoint::new(35.6762, 139.6503);
    assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
}

#[test]
fn test_haversine_triangle_inequality() {
    let a = GeoPoint::new(47.37, 8.55);
    let b = GeoPoint::new(47.40, 8.60);
    let c = GeoPoint::new(47.35, 8.70);
    let ab = haversine_distance(&a, &b);
    let bc = haversine_distance(&b, &c);
    let ac = haversine_distance(&a, &c);
    assert!(ac <= ab + bc + 1e-6);
}

#[test]
fn test_haversine_across_antimeridian() {
    let west = GeoPoint::new(0.0, 179.999);
    let east = GeoPoint::new(0.0, -179.999);
    // 0.002 degrees at the equator, ~222m
    assert_close(haversine_distance(&west, &east), 222.4, 1.0);
}

#[test]
fn test_meters_to_degrees_widens_with_latitude() {
    let at_equator = meters_to_degrees(1000.0, 0.0);
    let at_60 = meters_to_degrees(1000.0, 60.0);
    assert_close(at_60, at_equator * 2.0, 1e-6);
    assert_eq!(meters_to_degrees(1000.0, 90.0), 360.0);
}

#[test]
fn test_wrap_longitude_delta() {
    assert_close(wrap_longitude_delta(359.0), -1.0, 1e-9);
    assert_close(wrap_longitude_delta(-359.0), 1.0, 1e-9);
    assert_close(wrap_longitude_delta(10.0), 10.0, 1e-9);
}

// ============================================================================
// Corridor
// ============================================================================

#[test]
fn test_perpendicular_distance_to_segment() {
    let start = GeoPoint::new(47.0, 8.0);
    let end = offset_meters(&start, 1000.0, 0.0);
    let mid = offset_meters(&start, 500.0, 0.0);
    let beside = offset_meters(&mid, 0.0, 30.0);

    let projection = project_onto_segment(&beside, &start, &end);
    assert_close(projection.distance, 30.0, 0.5);
    assert_close(projection.fraction, 0.5, 0.01);
}

#[test]
fn test_corridor_is_clamped_at_endpoints() {
    let start = GeoPoint::new(47.0, 8.0);
    let end = offset_meters(&start, 200.0, 0.0);

    // On the extension of the segment, 40m past its end
    let beyond = offset_meters(&end, 40.0, 0.0);
    let projection = project_onto_segment(&beyond, &start, &end);
    assert_eq!(projection.fraction, 1.0);
    assert_eq!(projection.foot, end);
    assert_close(projection.distance, 40.0, 0.5);

    assert!(is_within_corridor(&beyond, &start, &end, 50.0));
    assert!(!is_within_corridor(&beyond, &start, &end, 30.0));

    // 100m past the start on the line extension is outside a 50m corridor
    let before = offset_meters(&start, -100.0, 0.0);
    assert!(!is_within_corridor(&before, &start, &end, 50.0));
}

#[test]
fn test_degenerate_segment_is_a_point() {
    let p = GeoPoint::new(10.0, 10.0);
    let q = offset_meters(&p, 0.0, 25.0);
    assert_close(distance_to_segment(&q, &p, &p), haversine_distance(&q, &p), 1e-6);
}

#[test]
fn test_corridor_on_point_is_zero() {
    let start = GeoPoint::new(-33.0, 151.0);
    let end = GeoPoint::new(-33.001, 151.001);
    assert!(distance_to_segment(&start, &start, &end) < 1e-6);
    assert!(distance_to_segment(&end, &start, &end) < 1e-6);
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn test_compute_bounds_and_center() {
    let points = vec![
        GeoPoint::new(1.0, 2.0),
        GeoPoint::new(3.0, -1.0),
        GeoPoint::new(2.0, 5.0),
    ];
    let bounds = compute_bounds(&points);
    assert_eq!(bounds.min_lat, 1.0);
    assert_eq!(bounds.max_lat, 3.0);
    assert_eq!(bounds.min_lng, -1.0);
    assert_eq!(bounds.max_lng, 5.0);

    let center = compute_center(&points);
    assert_close(center.latitude, 2.0, 1e-9);
    assert_close(center.longitude, 2.0, 1e-9);

    assert_eq!(compute_center(&[]), GeoPoint::new(0.0, 0.0));
}

#[test]
fn test_center_across_antimeridian() {
    let points = vec![GeoPoint::new(-1.0, 179.9), GeoPoint::new(1.0, -179.7)];
    let center = compute_center(&points);
    assert_close(center.latitude, 0.0, 1e-9);
    assert_close(center.longitude, -179.9, 1e-9);
}

#[test]
fn test_bounds_overlap_with_buffer() {
    let a = compute_bounds(&[GeoPoint::new(0.0, 0.0), GeoPoint::new(0.01, 0.01)]);
    let b = compute_bounds(&[GeoPoint::new(0.0, 0.02), GeoPoint::new(0.01, 0.03)]);
    // ~1.1km gap
    assert!(!bounds_overlap(&a, &b, 100.0, 0.0));
    assert!(bounds_overlap(&a, &b, 1000.0, 0.0));
}
