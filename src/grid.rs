//! Spatial grid buckets over the signal catalog.
//!
//! Signals are bucketed into square cells keyed by floored latitude and
//! longitude. A route segment then only probes the cells covering its
//! bounding box grown by the corridor radius, instead of testing every
//! signal in the catalog.

use std::collections::HashMap;

use log::debug;

use crate::error::{Result, ensure_positive};
use crate::geo_utils::{meters_to_degrees, meters_to_lat_degrees};
use crate::{GeoPoint, SignalRecord};

/// Growth factor applied to the probe radius.
const PROBE_MARGIN: f64 = 1.01;

/// Smallest cell edge; finer cells would overflow the integer cell keys.
const MIN_CELL_SIZE_METERS: f64 = 1.0;

/// Geographic grid cell for spatial partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GridCell {
    lat_idx: i64,
    lng_idx: i64,
}

impl GridCell {
    fn from_point(lat: f64, lng: f64, cell_degrees: f64) -> Self {
        Self {
            lat_idx: (lat / cell_degrees).floor() as i64,
            lng_idx: (lng / cell_degrees).floor() as i64,
        }
    }

    /// Get this cell and all 8 adjacent cells.
    #[cfg(test)]
    fn with_neighbors(&self) -> Vec<GridCell> {
        let mut cells = Vec::with_capacity(9);
        for dlat in -1..=1 {
            for dlng in -1..=1 {
                cells.push(GridCell {
                    lat_idx: self.lat_idx + dlat,
                    lng_idx: self.lng_idx + dlng,
                });
            }
        }
        cells
    }
}

/// Catalog bucketed into grid cells, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct SignalGrid {
    signals: Vec<SignalRecord>,
    cells: HashMap<GridCell, Vec<usize>>,
    cell_size_meters: f64,
    cell_degrees: f64,
}

impl SignalGrid {
    /// Bucket `signals` into cells of roughly `cell_size_meters`.
    ///
    /// A cell size close to the corridor radius keeps each probe small.
    /// Sizes below one meter are raised to one meter.
    pub fn build(signals: Vec<SignalRecord>, cell_size_meters: f64) -> Result<Self> {
        ensure_positive("cell_size_meters", cell_size_meters)?;
        let cell_size_meters = cell_size_meters.max(MIN_CELL_SIZE_METERS);
        let cell_degrees = meters_to_lat_degrees(cell_size_meters);

        let mut cells: HashMap<GridCell, Vec<usize>> = HashMap::new();
        for (idx, signal) in signals.iter().enumerate() {
            let cell = GridCell::from_point(
                signal.location.latitude,
                signal.location.longitude,
                cell_degrees,
            );
            cells.entry(cell).or_default().push(idx);
        }

        debug!(
            "Built signal grid: {} signals in {} cells ({:.0}m cells)",
            signals.len(),
            cells.len(),
            cell_size_meters
        );

        Ok(Self {
            signals,
            cells,
            cell_size_meters,
            cell_degrees,
        })
    }

    pub fn signals(&self) -> &[SignalRecord] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_size_meters(&self) -> f64 {
        self.cell_size_meters
    }

    /// Indices (into [`signals`](Self::signals)) of every signal that could
    /// lie within `radius_meters` of the segment `start -> end`.
    ///
    /// The result is a superset of the true corridor members, sorted
    /// ascending. Segments crossing the antimeridian or reaching the poles
    /// fall back to the whole catalog.
    pub fn candidates_near_segment(
        &self,
        start: &GeoPoint,
        end: &GeoPoint,
        radius_meters: f64,
    ) -> Vec<usize> {
        if self.signals.is_empty() {
            return Vec::new();
        }

        // Degree conversions assume a longer degree than the haversine sphere.
        let radius_meters = radius_meters * PROBE_MARGIN;
        let lat_pad = meters_to_lat_degrees(radius_meters);
        let min_lat = start.latitude.min(end.latitude) - lat_pad;
        let max_lat = start.latitude.max(end.latitude) + lat_pad;

        // Longitude padding is widest at the most poleward latitude.
        let poleward = min_lat.abs().max(max_lat.abs());
        let crosses_antimeridian = (end.longitude - start.longitude).abs() > 180.0;
        if poleward >= 90.0 || crosses_antimeridian {
            return self.all_indices();
        }
        let lng_pad = meters_to_degrees(radius_meters, poleward);
        let min_lng = start.longitude.min(end.longitude) - lng_pad;
        let max_lng = start.longitude.max(end.longitude) + lng_pad;
        if min_lng < -180.0 || max_lng > 180.0 {
            return self.all_indices();
        }

        let lo = GridCell::from_point(min_lat, min_lng, self.cell_degrees);
        let hi = GridCell::from_point(max_lat, max_lng, self.cell_degrees);
        let rows = hi.lat_idx.saturating_sub(lo.lat_idx).saturating_add(1) as u128;
        let cols = hi.lng_idx.saturating_sub(lo.lng_idx).saturating_add(1) as u128;
        let span = rows.saturating_mul(cols);

        let mut found: Vec<usize> = Vec::new();
        if span > self.cells.len() as u128 {
            // Probe rectangle is larger than the populated grid: walk the
            // populated cells instead.
            for (cell, members) in &self.cells {
                if (lo.lat_idx..=hi.lat_idx).contains(&cell.lat_idx)
                    && (lo.lng_idx..=hi.lng_idx).contains(&cell.lng_idx)
                {
                    found.extend_from_slice(members);
                }
            }
        } else {
            for lat_idx in lo.lat_idx..=hi.lat_idx {
                for lng_idx in lo.lng_idx..=hi.lng_idx {
                    if let Some(members) = self.cells.get(&GridCell { lat_idx, lng_idx }) {
                        found.extend_from_slice(members);
                    }
                }
            }
        }

        found.sort_unstable();
        found
    }

    /// Indices of every signal that could lie within `radius_meters` of `point`.
    pub fn candidates_near_point(&self, point: &GeoPoint, radius_meters: f64) -> Vec<usize> {
        self.candidates_near_segment(point, point, radius_meters)
    }

    fn all_indices(&self) -> Vec<usize> {
        (0..self.signals.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_cell() {
        let cell = GridCell::from_point(46.23, 7.36, 0.05);
        let neighbors = cell.with_neighbors();
        assert_eq!(neighbors.len(), 9);
        assert!(neighbors.contains(&cell));
    }

    #[test]
    fn test_negative_coordinates_floor() {
        let cell = GridCell::from_point(-0.01, -0.01, 0.05);
        assert_eq!(cell.lat_idx, -1);
        assert_eq!(cell.lng_idx, -1);
    }

    #[test]
    fn test_probe_skips_distant_cells() {
        let signals = vec![
            SignalRecord::new("near", 51.5000, -0.1000),
            SignalRecord::new("far", 51.6000, -0.1000),
        ];
        let grid = SignalGrid::build(signals, 50.0).unwrap();
        let start = GeoPoint::new(51.4995, -0.1000);
        let end = GeoPoint::new(51.5005, -0.1000);

        let found = grid.candidates_near_segment(&start, &end, 50.0);
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn test_tiny_cell_size_is_raised() {
        let signals = vec![SignalRecord::new("equator", 0.0, 10.0)];
        let grid = SignalGrid::build(signals, 1e-15).unwrap();
        assert_eq!(grid.cell_size_meters(), MIN_CELL_SIZE_METERS);

        let found = grid.candidates_near_segment(
            &GeoPoint::new(-45.0, 10.0),
            &GeoPoint::new(45.0, 10.0),
            1e-15,
        );
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn test_antimeridian_falls_back_to_full_scan() {
        let signals = vec![
            SignalRecord::new("east", 0.0, 179.9999),
            SignalRecord::new("west", 0.0, -179.9999),
        ];
        let grid = SignalGrid::build(signals, 50.0).unwrap();
        let found = grid.candidates_near_segment(
            &GeoPoint::new(0.0, 179.9995),
            &GeoPoint::new(0.0, -179.9995),
            50.0,
        );
        assert_eq!(found, vec![0, 1]);
    }
}
