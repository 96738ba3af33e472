//! # Patrol Zone Clustering
//!
//! Partitions the signal catalog into spatially compact zones, each small
//! enough for one officer to patrol.
//!
//! ## Algorithm
//! 1. Sort signals by latitude, longitude, then id so input order never matters
//! 2. Seed greedily: a signal joins the nearest zone whose running centroid is
//!    within the target radius, otherwise it starts a new zone
//! 3. Recompute every centroid as the mean of its members
//! 4. Relax: reassign every signal to its nearest centroid, drop emptied zones,
//!    recompute centroids; stop when nothing moves or the iteration cap is hit
//! 5. Number the zones 1..N by ascending centroid latitude, then longitude
//!
//! The zone count comes from density, not from a fixed k. Every step is
//! deterministic, so an unchanged catalog always yields the same partition
//! and the same indices.

pub mod index;

pub use index::ZoneIndex;

use std::cmp::Ordering;

use log::{info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::Result;
use crate::geo_utils::{EARTH_RADIUS_METERS, haversine_distance, wrap_longitude_delta};
use crate::{Bounds, GeoPoint, SignalRecord, Zone, ZoneConfig};

/// Zones plus how the relaxation ended.
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    pub zones: Vec<Zone>,
    /// Relaxation rounds actually run
    pub iterations: u32,
    /// False when the iteration cap stopped relaxation early
    pub converged: bool,
}

/// Running sum used while seeding and recomputing centroids.
///
/// Longitudes are summed as offsets from the first member's longitude so a
/// zone straddling the antimeridian averages across it, not around the globe.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum_lat: f64,
    ref_lng: f64,
    sum_dlng: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, point: &GeoPoint) {
        if self.count == 0 {
            self.ref_lng = point.longitude;
        }
        self.sum_lat += point.latitude;
        self.sum_dlng += wrap_longitude_delta(point.longitude - self.ref_lng);
        self.count += 1;
    }

    fn centroid(&self) -> GeoPoint {
        let n = self.count.max(1) as f64;
        GeoPoint::new(
            self.sum_lat / n,
            wrap_longitude_delta(self.ref_lng + self.sum_dlng / n),
        )
    }
}

/// Partition `catalog` into zones.
///
/// An empty catalog yields no zones. A non-positive radius fails with
/// `InvalidParameter`.
pub fn cluster_signals(catalog: &[SignalRecord], config: &ZoneConfig) -> Result<Vec<Zone>> {
    cluster_signals_detailed(catalog, config).map(|outcome| outcome.zones)
}

/// Like [`cluster_signals`], also reporting iteration count and convergence.
pub fn cluster_signals_detailed(
    catalog: &[SignalRecord],
    config: &ZoneConfig,
) -> Result<ClusteringOutcome> {
    config.validate()?;
    if catalog.is_empty() {
        return Ok(ClusteringOutcome {
            zones: Vec::new(),
            iterations: 0,
            converged: true,
        });
    }

    let mut ordered: Vec<&SignalRecord> = catalog.iter().collect();
    ordered.sort_by(|a, b| compare_signals(a, b));
    let points: Vec<GeoPoint> = ordered.iter().map(|s| s.location).collect();

    let mut assignment = seed_zones(&points, config.target_radius_meters);
    let mut centroids = compute_centroids(&points, &assignment);

    let mut iterations = 0;
    let mut converged = false;
    while iterations < config.max_iterations {
        iterations += 1;
        let next = assign_nearest(&points, &centroids);
        let moved = next
            .iter()
            .zip(assignment.iter())
            .filter(|(a, b)| a != b)
            .count();

        assignment = compact_assignment(next);
        centroids = compute_centroids(&points, &assignment);

        if moved == 0 {
            converged = true;
            break;
        }
    }

    if !converged && config.max_iterations > 0 {
        warn!(
            "Zone relaxation hit its cap of {} iterations; using the last partition",
            config.max_iterations
        );
    }

    let zones = build_zones(&ordered, &assignment, &centroids);

    info!(
        "Clustered {} signals into {} zones ({} iterations, converged: {})",
        catalog.len(),
        zones.len(),
        iterations,
        converged
    );

    Ok(ClusteringOutcome {
        zones,
        iterations,
        converged,
    })
}

/// Stable ordering key: latitude, longitude, then id.
fn compare_signals(a: &SignalRecord, b: &SignalRecord) -> Ordering {
    a.location
        .latitude
        .total_cmp(&b.location.latitude)
        .then(a.location.longitude.total_cmp(&b.location.longitude))
        .then_with(|| a.id.cmp(&b.id))
}

/// Greedy seeding pass. Returns the zone id of every point.
fn seed_zones(points: &[GeoPoint], radius_meters: f64) -> Vec<usize> {
    let mut zones: Vec<Accumulator> = Vec::new();
    let mut assignment = Vec::with_capacity(points.len());

    for point in points {
        let mut nearest: Option<(usize, f64)> = None;
        for (zone_id, acc) in zones.iter().enumerate() {
            let centroid = acc.centroid();
            // Meridional distance is a lower bound on great-circle distance.
            let lower_bound =
                EARTH_RADIUS_METERS * (point.latitude - centroid.latitude).to_radians().abs();
            if lower_bound > radius_meters {
                continue;
            }
            let dist = haversine_distance(point, &centroid);
            if dist <= radius_meters && nearest.is_none_or(|(_, best)| dist < best) {
                nearest = Some((zone_id, dist));
            }
        }

        let zone_id = match nearest {
            Some((zone_id, _)) => zone_id,
            None => {
                zones.push(Accumulator::default());
                zones.len() - 1
            }
        };
        zones[zone_id].add(point);
        assignment.push(zone_id);
    }

    assignment
}

/// Mean coordinate per zone id. Assumes ids are dense from 0.
fn compute_centroids(points: &[GeoPoint], assignment: &[usize]) -> Vec<GeoPoint> {
    let zone_count = assignment.iter().max().map_or(0, |m| m + 1);
    let mut accs = vec![Accumulator::default(); zone_count];
    for (point, &zone_id) in points.iter().zip(assignment) {
        accs[zone_id].add(point);
    }
    accs.iter().map(Accumulator::centroid).collect()
}

fn nearest_centroid(point: &GeoPoint, centroids: &[GeoPoint]) -> usize {
    let mut best_id = 0;
    let mut best_dist = f64::INFINITY;
    for (zone_id, centroid) in centroids.iter().enumerate() {
        let lower_bound =
            EARTH_RADIUS_METERS * (point.latitude - centroid.latitude).to_radians().abs();
        if lower_bound >= best_dist {
            continue;
        }
        let dist = haversine_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_id = zone_id;
        }
    }
    best_id
}

#[cfg(feature = "parallel")]
fn assign_nearest(points: &[GeoPoint], centroids: &[GeoPoint]) -> Vec<usize> {
    points
        .par_iter()
        .map(|p| nearest_centroid(p, centroids))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn assign_nearest(points: &[GeoPoint], centroids: &[GeoPoint]) -> Vec<usize> {
    points
        .iter()
        .map(|p| nearest_centroid(p, centroids))
        .collect()
}

/// Drop zone ids with no members, renumbering the rest densely in id order.
fn compact_assignment(assignment: Vec<usize>) -> Vec<usize> {
    let zone_count = assignment.iter().max().map_or(0, |m| m + 1);
    let mut used = vec![false; zone_count];
    for &zone_id in &assignment {
        used[zone_id] = true;
    }
    let mut remap = vec![0; zone_count];
    let mut next = 0;
    for (zone_id, is_used) in used.iter().enumerate() {
        if *is_used {
            remap[zone_id] = next;
            next += 1;
        }
    }
    assignment.into_iter().map(|z| remap[z]).collect()
}

/// Materialize zones and number them by centroid position.
fn build_zones(
    ordered: &[&SignalRecord],
    assignment: &[usize],
    centroids: &[GeoPoint],
) -> Vec<Zone> {
    let mut members: Vec<Vec<SignalRecord>> = vec![Vec::new(); centroids.len()];
    for (signal, &zone_id) in ordered.iter().zip(assignment) {
        members[zone_id].push((*signal).clone());
    }

    let mut zones: Vec<Zone> = members
        .into_iter()
        .zip(centroids.iter())
        .filter(|(m, _)| !m.is_empty())
        .map(|(members, centroid)| {
            let points: Vec<GeoPoint> = members.iter().map(|s| s.location).collect();
            let radius_meters = points
                .iter()
                .map(|p| haversine_distance(p, centroid))
                .fold(0.0, f64::max);
            let bounds = Bounds::from_points(&points).unwrap_or(Bounds {
                min_lat: centroid.latitude,
                max_lat: centroid.latitude,
                min_lng: centroid.longitude,
                max_lng: centroid.longitude,
            });
            Zone {
                index: 0,
                members,
                centroid: *centroid,
                bounds,
                radius_meters,
            }
        })
        .collect();

    zones.sort_by(|a, b| {
        a.centroid
            .latitude
            .total_cmp(&b.centroid.latitude)
            .then(a.centroid.longitude.total_cmp(&b.centroid.longitude))
            .then_with(|| a.members[0].id.cmp(&b.members[0].id))
    });

    for (i, zone) in zones.iter_mut().enumerate() {
        zone.index = (i + 1) as u32;
    }

    zones
}
