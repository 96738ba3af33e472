//! Geographic primitives shared by matching and zoning.
//!
//! Distances are great-circle (haversine) distances in meters. Corridor
//! membership projects onto a segment in a local equirectangular frame,
//! clamps to the segment's endpoints, then measures the great-circle
//! distance to the projected foot.

use crate::{Bounds, GeoPoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude (approximately constant).
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Great-circle distance between two points in meters.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Convert a distance in meters to degrees of longitude at `latitude`.
///
/// At the equator this is also the latitude span. Near the poles the
/// result is capped at 360 degrees.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let cos_lat = latitude.to_radians().cos().abs();
    if cos_lat < 1e-9 {
        return 360.0;
    }
    (meters / (METERS_PER_DEG_LAT * cos_lat)).min(360.0)
}

/// Convert a distance in meters to degrees of latitude.
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

/// Wrap a longitude difference into `[-180, 180)`.
pub fn wrap_longitude_delta(delta: f64) -> f64 {
    if (-180.0..180.0).contains(&delta) {
        return delta;
    }
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Result of projecting a point onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Great-circle distance from the point to its clamped foot, in meters.
    pub distance: f64,
    /// Position of the foot along the segment: 0.0 at the start, 1.0 at the end.
    pub fraction: f64,
    /// The clamped foot itself.
    pub foot: GeoPoint,
}

/// Project `point` onto the segment `start -> end`, clamped to the endpoints.
pub fn project_onto_segment(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> SegmentProjection {
    let ref_lat = (start.latitude + end.latitude) / 2.0;
    let kx = METERS_PER_DEG_LAT * ref_lat.to_radians().cos();
    let ky = METERS_PER_DEG_LAT;

    let seg_dlng = wrap_longitude_delta(end.longitude - start.longitude);
    let bx = seg_dlng * kx;
    let by = (end.latitude - start.latitude) * ky;
    let px = wrap_longitude_delta(point.longitude - start.longitude) * kx;
    let py = (point.latitude - start.latitude) * ky;

    let len_sq = bx * bx + by * by;
    let fraction = if len_sq < 1e-12 {
        0.0
    } else {
        ((px * bx + py * by) / len_sq).clamp(0.0, 1.0)
    };

    let foot = if fraction == 0.0 {
        *start
    } else if fraction == 1.0 {
        *end
    } else {
        GeoPoint::new(
            start.latitude + fraction * (end.latitude - start.latitude),
            wrap_longitude_delta(start.longitude + fraction * seg_dlng),
        )
    };

    SegmentProjection {
        distance: haversine_distance(point, &foot),
        fraction,
        foot,
    }
}

/// Distance in meters from `point` to the segment, clamped to its endpoints.
pub fn distance_to_segment(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> f64 {
    project_onto_segment(point, start, end).distance
}

/// True if `point` lies within `radius_meters` of the segment `start -> end`.
///
/// The corridor ends at the segment's endpoints (rounded caps), so a point
/// near the extension of the segment beyond an endpoint is only inside when
/// it is within the radius of that endpoint.
pub fn is_within_corridor(
    point: &GeoPoint,
    segment_start: &GeoPoint,
    segment_end: &GeoPoint,
    radius_meters: f64,
) -> bool {
    distance_to_segment(point, segment_start, segment_end) <= radius_meters
}

/// Compute the bounding box of a set of points.
///
/// Returns a zeroed box for an empty slice.
pub fn compute_bounds(points: &[GeoPoint]) -> Bounds {
    Bounds::from_points(points).unwrap_or(Bounds {
        min_lat: 0.0,
        max_lat: 0.0,
        min_lng: 0.0,
        max_lng: 0.0,
    })
}

/// Mean of a set of points; `(0, 0)` when empty.
///
/// Longitudes are averaged as offsets from the first point, so points on
/// both sides of the antimeridian average to a longitude near 180.
pub fn compute_center(points: &[GeoPoint]) -> GeoPoint {
    let Some(first) = points.first() else {
        return GeoPoint::new(0.0, 0.0);
    };
    let n = points.len() as f64;
    let (sum_lat, sum_dlng) = points.iter().fold((0.0, 0.0), |(lat, dlng), p| {
        (
            lat + p.latitude,
            dlng + wrap_longitude_delta(p.longitude - first.longitude),
        )
    });
    GeoPoint::new(
        sum_lat / n,
        wrap_longitude_delta(first.longitude + sum_dlng / n),
    )
}

/// Check whether two boxes overlap once each is grown by `buffer_meters`.
pub fn bounds_overlap(a: &Bounds, b: &Bounds, buffer_meters: f64, ref_lat: f64) -> bool {
    let lat_buffer = meters_to_lat_degrees(buffer_meters);
    let lng_buffer = meters_to_degrees(buffer_meters, ref_lat);

    a.min_lat - lat_buffer <= b.max_lat + lat_buffer
        && b.min_lat - lat_buffer <= a.max_lat + lat_buffer
        && a.min_lng - lng_buffer <= b.max_lng + lng_buffer
        && b.min_lng - lng_buffer <= a.max_lng + lng_buffer
}

/// Offset a point by the given north/east distances in meters.
pub fn offset_meters(origin: &GeoPoint, north_meters: f64, east_meters: f64) -> GeoPoint {
    GeoPoint::new(
        origin.latitude + meters_to_lat_degrees(north_meters),
        origin.longitude + meters_to_degrees(east_meters, origin.latitude),
    )
}
