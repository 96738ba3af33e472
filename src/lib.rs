//! # Signal Match
//!
//! Traffic-signal proximity matching and patrol zone clustering for
//! emergency-vehicle routing.
//!
//! This library provides:
//! - Corridor matching of a planned route against a signal catalog, backed
//!   by a spatial grid so each route segment only probes nearby cells
//! - Deterministic density clustering of the catalog into patrol zones with
//!   stable 1-based indices
//! - A read-only zone index for registration lookups
//! - An engine that swaps whole snapshots atomically on reload
//!
//! ## Features
//!
//! - **`parallel`** - Parallel batch matching and zone relaxation with rayon
//! - **`synthetic`** - Seeded synthetic catalogs and routes for tests and benches
//!
//! ## Quick Start
//!
//! ```rust
//! use signalmatch::{GeoPoint, MatchConfig, SignalRecord, match_route};
//!
//! let route = vec![
//!     GeoPoint::new(51.5074, -0.1278),
//!     GeoPoint::new(51.5083, -0.1278),
//!     GeoPoint::new(51.5092, -0.1278),
//! ];
//! let catalog = vec![
//!     SignalRecord::new("junction-1", 51.5080, -0.12775),
//!     SignalRecord::new("far-away", 51.6000, -0.2000),
//! ];
//!
//! let matches = match_route(&route, &catalog, &MatchConfig::default()).unwrap();
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].signal.id, "junction-1");
//! ```

use std::path::Path;

use geo::{ConvexHull, MultiPoint, Point};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, SignalMatchError};

// Geographic utilities (distance, corridor membership, bounds)
pub mod geo_utils;

// Signal catalog loading and normalization
pub mod catalog;
pub use catalog::{CatalogSource, JsonFileSource, SignalCatalog, SignalDocument, StaticSource};

// Spatial grid buckets for corridor probing
pub mod grid;
pub use grid::SignalGrid;

// Route-to-signal proximity matching
pub mod matching;
#[cfg(feature = "parallel")]
pub use matching::match_routes_parallel;
pub use matching::{match_route, match_route_indexed};

// Zone clustering and the zone index
pub mod zones;
pub use zones::{ZoneIndex, cluster_signals};

// Snapshot-swapping engine
pub mod engine;
pub use engine::{DispatchEngine, EngineSnapshot, EngineStats};

// Synthetic catalogs and routes for tests and benchmarks
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in degrees.
///
/// # Example
/// ```
/// use signalmatch::GeoPoint;
/// let point = GeoPoint::new(51.5074, -0.1278); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from points.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// One physical traffic signal.
///
/// The `id` is stable across catalog reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: String,
    pub location: GeoPoint,
}

impl SignalRecord {
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            location: GeoPoint::new(latitude, longitude),
        }
    }
}

/// A signal found inside the corridor of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMatch {
    pub signal: SignalRecord,
    /// Index of the route point nearest to where the signal is closest to the route
    pub route_index: usize,
    /// Perpendicular, endpoint-clamped distance to the closest route segment in meters
    pub distance: f64,
    /// Great-circle distance from the signal to the route point at `route_index`
    pub route_point_distance: f64,
}

/// A patrol zone: a spatially compact group of signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    /// Stable 1-based index referenced by officer registrations
    pub index: u32,
    /// Members ordered by latitude, then longitude, then id
    pub members: Vec<SignalRecord>,
    /// Mean coordinate of the members
    pub centroid: GeoPoint,
    pub bounds: Bounds,
    /// Largest centroid-to-member distance in meters
    pub radius_meters: f64,
}

impl Zone {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains_signal(&self, signal_id: &str) -> bool {
        self.members.iter().any(|s| s.id == signal_id)
    }

    /// Member coordinates in member order.
    pub fn member_points(&self) -> Vec<GeoPoint> {
        self.members.iter().map(|s| s.location).collect()
    }

    /// Convex hull of the member locations as a closed ring.
    pub fn boundary(&self) -> Vec<GeoPoint> {
        let points: MultiPoint<f64> = self
            .members
            .iter()
            .map(|s| Point::new(s.location.longitude, s.location.latitude))
            .collect();
        points
            .convex_hull()
            .exterior()
            .coords()
            .map(|c| GeoPoint::new(c.y, c.x))
            .collect()
    }

    /// Coordinates-only view handed to external callers.
    pub fn summary(&self) -> ZoneSummary {
        ZoneSummary {
            index: self.index,
            members: self.member_points(),
        }
    }
}

/// External view of a zone: its index and member coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub index: u32,
    pub members: Vec<GeoPoint>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for corridor matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Corridor half-width around each route segment.
    /// Default: 50.0 meters
    pub corridor_radius_meters: f64,

    /// Maximum number of results; 0 means unlimited.
    /// Default: 0
    pub max_results: usize,

    /// Overall time budget for one match in milliseconds. None means unbounded.
    /// Default: None
    pub deadline_ms: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            corridor_radius_meters: 50.0,
            max_results: 0,
            deadline_ms: None,
        }
    }
}

impl MatchConfig {
    pub fn with_radius(corridor_radius_meters: f64) -> Self {
        Self {
            corridor_radius_meters,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        error::ensure_positive("corridor_radius_meters", self.corridor_radius_meters)
    }
}

/// Configuration for zone clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Seed radius: a signal joins an existing zone only if it lies within
    /// this distance of the zone's centroid.
    /// Default: 1000.0 meters
    pub target_radius_meters: f64,

    /// Cap on reassign/recompute rounds after seeding.
    /// Default: 20
    pub max_iterations: u32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            target_radius_meters: 1000.0,
            max_iterations: 20,
        }
    }
}

impl ZoneConfig {
    pub fn with_radius(target_radius_meters: f64) -> Self {
        Self {
            target_radius_meters,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        error::ensure_positive("target_radius_meters", self.target_radius_meters)
    }
}

/// Engine-wide configuration, loadable from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matching: MatchConfig,
    pub zones: ZoneConfig,
}

impl EngineConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| SignalMatchError::InvalidConfig {
                reason: format!("{}: {}", path.display(), e),
            })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| SignalMatchError::InvalidConfig {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.zones.validate()
    }
}
