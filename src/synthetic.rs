//! Synthetic signal catalogs and routes for stress testing and benchmarking.
//!
//! Generates a street grid with signals at (most) intersections and routes
//! that drive along the streets, so the expected corridor matches are known.
//!
//! Feature-gated behind `synthetic`; not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use signalmatch::synthetic::SyntheticCity;
//!
//! let city = SyntheticCity::standard();
//! let dataset = city.generate(10);
//! assert_eq!(dataset.routes.len(), 10);
//! assert!(!dataset.signals.is_empty());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo_utils::offset_meters;
use crate::{GeoPoint, SignalRecord};

/// Spacing between consecutive route points (meters).
const ROUTE_POINT_SPACING: f64 = 25.0;

/// Zurich, used as the default origin.
pub const ZURICH: GeoPoint = GeoPoint {
    latitude: 47.37,
    longitude: 8.55,
};

/// Street-grid city layout.
#[derive(Debug, Clone)]
pub struct SyntheticCity {
    /// South-west corner of the grid.
    pub origin: GeoPoint,
    /// Number of east-west streets.
    pub streets_north: usize,
    /// Number of north-south streets.
    pub streets_east: usize,
    /// Distance between parallel streets in meters.
    pub block_meters: f64,
    /// Probability that an intersection carries a signal (0.0-1.0).
    pub signal_probability: f64,
    /// Maximum random offset of a signal from its intersection in meters.
    pub jitter_meters: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

/// Statistics about a generated dataset.
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    pub signal_count: usize,
    pub route_count: usize,
    /// Total route points across all routes.
    pub total_route_points: usize,
}

/// A generated catalog plus routes over it.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub signals: Vec<SignalRecord>,
    pub routes: Vec<Vec<GeoPoint>>,
    pub metadata: DatasetMetadata,
}

impl SyntheticCity {
    /// 20x20 streets, 200m blocks, signals at ~80% of the 400 intersections.
    pub fn standard() -> Self {
        Self {
            origin: ZURICH,
            streets_north: 20,
            streets_east: 20,
            block_meters: 200.0,
            signal_probability: 0.8,
            jitter_meters: 5.0,
            seed: 42,
        }
    }

    /// 150x150 streets, roughly 18,000 signals.
    pub fn large() -> Self {
        Self {
            streets_north: 150,
            streets_east: 150,
            seed: 7,
            ..Self::standard()
        }
    }

    fn intersection(&self, row: usize, col: usize) -> GeoPoint {
        offset_meters(
            &self.origin,
            row as f64 * self.block_meters,
            col as f64 * self.block_meters,
        )
    }

    /// Generate the catalog and `route_count` routes.
    pub fn generate(&self, route_count: usize) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut signals = Vec::new();
        for row in 0..self.streets_north {
            for col in 0..self.streets_east {
                if !rng.gen_bool(self.signal_probability.clamp(0.0, 1.0)) {
                    continue;
                }
                let base = self.intersection(row, col);
                let location = if self.jitter_meters > 0.0 {
                    offset_meters(
                        &base,
                        rng.gen_range(-self.jitter_meters..self.jitter_meters),
                        rng.gen_range(-self.jitter_meters..self.jitter_meters),
                    )
                } else {
                    base
                };
                signals.push(SignalRecord {
                    id: format!("signal_{:03}_{:03}", row, col),
                    location,
                });
            }
        }

        let routes: Vec<Vec<GeoPoint>> = (0..route_count)
            .map(|_| self.generate_route(&mut rng))
            .collect();

        let total_route_points = routes.iter().map(Vec::len).sum();
        SyntheticDataset {
            metadata: DatasetMetadata {
                signal_count: signals.len(),
                route_count: routes.len(),
                total_route_points,
            },
            signals,
            routes,
        }
    }

    /// Drive from a random intersection, turning at random intersections.
    fn generate_route(&self, rng: &mut StdRng) -> Vec<GeoPoint> {
        let rows = self.streets_north.max(1);
        let cols = self.streets_east.max(1);
        let mut row = rng.gen_range(0..rows);
        let mut col = rng.gen_range(0..cols);
        let legs = rng.gen_range(2..6);

        let mut points = vec![self.intersection(row, col)];
        let steps_per_block = (self.block_meters / ROUTE_POINT_SPACING).ceil().max(1.0) as usize;

        for leg in 0..legs {
            // Alternate between north-south and east-west legs.
            let (target_row, target_col) = if leg % 2 == 0 {
                (rng.gen_range(0..rows), col)
            } else {
                (row, rng.gen_range(0..cols))
            };
            let from = self.intersection(row, col);
            let to = self.intersection(target_row, target_col);
            let blocks = row.abs_diff(target_row) + col.abs_diff(target_col);
            let steps = blocks * steps_per_block;
            for step in 1..=steps {
                let t = step as f64 / steps as f64;
                points.push(GeoPoint::new(
                    from.latitude + t * (to.latitude - from.latitude),
                    from.longitude + t * (to.longitude - from.longitude),
                ));
            }
            row = target_row;
            col = target_col;
        }

        points
    }
}

/// Tight groups of signals separated by a large gap.
///
/// Produces `group_count` groups of `group_size` signals each, spaced
/// `member_spacing_meters` apart inside a group and `group_spacing_meters`
/// apart between groups, laid out west to east from `origin`.
pub fn grouped_signals(
    origin: &GeoPoint,
    group_count: usize,
    group_size: usize,
    member_spacing_meters: f64,
    group_spacing_meters: f64,
) -> Vec<SignalRecord> {
    let mut signals = Vec::with_capacity(group_count * group_size);
    for g in 0..group_count {
        let group_origin = offset_meters(origin, 0.0, g as f64 * group_spacing_meters);
        for m in 0..group_size {
            let location = offset_meters(&group_origin, m as f64 * member_spacing_meters, 0.0);
            signals.push(SignalRecord {
                id: format!("group{}_signal{}", g, m),
                location,
            });
        }
    }
    signals
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_generation() {
        let dataset = SyntheticCity::standard().generate(5);

        assert_eq!(dataset.routes.len(), 5);
        // ~80% of 400 intersections
        assert!(
            dataset.signals.len() > 250 && dataset.signals.len() < 380,
            "Expected ~320 signals, got {}",
            dataset.signals.len()
        );
        assert!(dataset.routes.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn test_deterministic_generation() {
        let a = SyntheticCity::standard().generate(3);
        let b = SyntheticCity::standard().generate(3);

        assert_eq!(a.signals, b.signals);
        assert_eq!(a.routes, b.routes);
    }

    #[test]
    fn test_grouped_signals_layout() {
        let signals = grouped_signals(&ZURICH, 3, 4, 10.0, 5000.0);
        assert_eq!(signals.len(), 12);
        assert_eq!(signals[0].id, "group0_signal0");
        assert_eq!(signals[11].id, "group2_signal3");
    }
}
