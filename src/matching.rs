//! Route-to-signal proximity matching.
//!
//! Given a planned route and the signal catalog, finds the signals lying
//! inside the corridor around the route:
//! - Each segment probes the [`SignalGrid`] for nearby candidates
//! - A signal near several segments keeps only its closest match
//! - Results follow the direction of travel (route index, then distance)
//!
//! Matching is a pure function over immutable inputs, so concurrent calls
//! need no coordination.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Result, SignalMatchError};
use crate::geo_utils::{haversine_distance, project_onto_segment};
use crate::grid::SignalGrid;
use crate::{GeoPoint, MatchConfig, SignalMatch, SignalRecord};

/// Closest corridor hit seen so far for one signal.
#[derive(Debug, Clone, Copy)]
struct Hit {
    route_index: usize,
    distance: f64,
}

/// Match a route against a catalog, building a grid for this call only.
///
/// Prefer [`match_route_indexed`] when the same catalog serves many routes.
///
/// # Errors
/// - `InvalidRoute` for an empty route or one with out-of-range points
/// - `InvalidParameter` for a non-positive corridor radius
/// - `Timeout` when `deadline_ms` is exceeded
pub fn match_route(
    route: &[GeoPoint],
    catalog: &[SignalRecord],
    config: &MatchConfig,
) -> Result<Vec<SignalMatch>> {
    validate_request(route, config)?;
    if catalog.is_empty() {
        return Ok(Vec::new());
    }
    let grid = SignalGrid::build(catalog.to_vec(), config.corridor_radius_meters)?;
    match_route_indexed(route, &grid, config)
}

/// Match a route against a prebuilt grid.
///
/// A single-point route degenerates to a circle of the corridor radius
/// around that point.
pub fn match_route_indexed(
    route: &[GeoPoint],
    grid: &SignalGrid,
    config: &MatchConfig,
) -> Result<Vec<SignalMatch>> {
    validate_request(route, config)?;
    if grid.is_empty() {
        return Ok(Vec::new());
    }

    let started = Instant::now();
    let deadline = config.deadline_ms.map(Duration::from_millis);
    let radius = config.corridor_radius_meters;

    let segments: Vec<(usize, &GeoPoint, &GeoPoint)> = if route.len() == 1 {
        vec![(0, &route[0], &route[0])]
    } else {
        route
            .windows(2)
            .enumerate()
            .map(|(i, w)| (i, &w[0], &w[1]))
            .collect()
    };

    let signals = grid.signals();
    let mut best: HashMap<usize, Hit> = HashMap::new();
    let mut probed = 0usize;

    for (seg_idx, start, end) in segments {
        check_deadline(started, deadline)?;

        let candidates = grid.candidates_near_segment(start, end, radius);
        probed += candidates.len();

        for idx in candidates {
            let projection = project_onto_segment(&signals[idx].location, start, end);
            if projection.distance > radius {
                continue;
            }
            // Attribute the hit to whichever segment endpoint the foot is nearer.
            let route_index = if projection.fraction <= 0.5 {
                seg_idx
            } else {
                seg_idx + 1
            };
            let hit = Hit {
                route_index,
                distance: projection.distance,
            };

            match best.entry(idx) {
                Entry::Occupied(mut e) => {
                    // Strict: on equal distance the earlier segment wins.
                    if hit.distance < e.get().distance {
                        e.insert(hit);
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(hit);
                }
            }
        }
    }

    let mut results: Vec<SignalMatch> = best
        .into_iter()
        .map(|(idx, hit)| {
            let signal = signals[idx].clone();
            let route_point_distance = haversine_distance(&signal.location, &route[hit.route_index]);
            SignalMatch {
                signal,
                route_index: hit.route_index,
                distance: hit.distance,
                route_point_distance,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        a.route_index
            .cmp(&b.route_index)
            .then(a.distance.total_cmp(&b.distance))
            .then_with(|| a.signal.id.cmp(&b.signal.id))
    });

    if config.max_results > 0 {
        results.truncate(config.max_results);
    }

    debug!(
        "Matched {} signals along {} route points ({} candidates probed of {} signals, {:?})",
        results.len(),
        route.len(),
        probed,
        grid.len(),
        started.elapsed()
    );

    Ok(results)
}

/// Match several routes one after another against the same grid.
pub fn match_routes(
    routes: &[Vec<GeoPoint>],
    grid: &SignalGrid,
    config: &MatchConfig,
) -> Vec<Result<Vec<SignalMatch>>> {
    routes
        .iter()
        .map(|route| match_route_indexed(route, grid, config))
        .collect()
}

/// Match several routes in parallel against the same grid.
///
/// Same output as [`match_routes`], in the same order.
#[cfg(feature = "parallel")]
pub fn match_routes_parallel(
    routes: &[Vec<GeoPoint>],
    grid: &SignalGrid,
    config: &MatchConfig,
) -> Vec<Result<Vec<SignalMatch>>> {
    use rayon::prelude::*;

    routes
        .par_iter()
        .map(|route| match_route_indexed(route, grid, config))
        .collect()
}

/// Strip ids and distances, keeping only matched coordinates in result order.
pub fn matched_coordinates(matches: &[SignalMatch]) -> Vec<GeoPoint> {
    matches.iter().map(|m| m.signal.location).collect()
}

fn validate_request(route: &[GeoPoint], config: &MatchConfig) -> Result<()> {
    if route.is_empty() {
        return Err(SignalMatchError::invalid_route("route has no points"));
    }
    if let Some(pos) = route.iter().position(|p| !p.is_valid()) {
        return Err(SignalMatchError::invalid_route(format!(
            "point {} is out of range: ({}, {})",
            pos, route[pos].latitude, route[pos].longitude
        )));
    }
    config.validate()
}

fn check_deadline(started: Instant, deadline: Option<Duration>) -> Result<()> {
    if let Some(deadline) = deadline {
        let elapsed = started.elapsed();
        if elapsed >= deadline {
            return Err(SignalMatchError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                deadline_ms: deadline.as_millis() as u64,
            });
        }
    }
    Ok(())
}
