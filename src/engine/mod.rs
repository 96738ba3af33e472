//! # Dispatch Engine
//!
//! Owns the current signal catalog, its spatial grid and its zone index as
//! one immutable, versioned snapshot.
//!
//! ## Architecture
//!
//! - `SnapshotCell` - atomic swap of whole snapshots
//! - `SignalGrid` - prebuilt corridor probe index over the catalog
//! - `ZoneIndex` - zones of the latest clustering run
//!
//! Loading or re-clustering builds a complete new snapshot off to the side
//! and swaps it in. Matching requests and zone lookups read whichever
//! snapshot is current when they start. Until the first successful load
//! every operation fails with `CatalogUnavailable`; a failed reload leaves
//! the previous snapshot in place.

pub mod snapshot;

pub use snapshot::SnapshotCell;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::info;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::catalog::{CatalogSource, SignalCatalog};
use crate::error::{OptionExt, Result, SignalMatchError};
use crate::grid::SignalGrid;
use crate::matching::{match_route_indexed, matched_coordinates};
use crate::zones::{ZoneIndex, cluster_signals};
use crate::{
    EngineConfig, GeoPoint, MatchConfig, SignalMatch, SignalRecord, Zone, ZoneConfig, ZoneSummary,
};

/// Everything derived from one catalog load.
#[derive(Debug)]
pub struct EngineSnapshot {
    pub version: u64,
    pub grid: SignalGrid,
    pub zones: ZoneIndex,
    pub zone_config: ZoneConfig,
    /// Documents dropped while normalizing the catalog
    pub rejected_count: usize,
}

/// Summary counters for the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub version: u64,
    pub signal_count: usize,
    pub rejected_count: usize,
    pub zone_count: usize,
    pub grid_cells: usize,
}

/// Matching and zoning over an atomically replaced catalog snapshot.
#[derive(Debug)]
pub struct DispatchEngine {
    config: EngineConfig,
    current: SnapshotCell<EngineSnapshot>,
    versions: AtomicU64,
    // Serializes rebuilds so versions are swapped in order.
    rebuild: Mutex<()>,
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchEngine {
    /// Create an engine with default configuration and no catalog.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            current: SnapshotCell::empty(),
            versions: AtomicU64::new(0),
            rebuild: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load the catalog from `source`, cluster it and swap the result in.
    ///
    /// Returns the new snapshot version.
    pub fn load(&self, source: &dyn CatalogSource) -> Result<u64> {
        let _guard = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let catalog = SignalCatalog::load(source)?;
        let rejected = catalog.rejected_count();
        self.install(catalog.into_signals(), self.config.zones.clone(), rejected)
    }

    /// Re-read the catalog after it changed. Same as [`load`](Self::load).
    pub fn reload(&self, source: &dyn CatalogSource) -> Result<u64> {
        self.load(source)
    }

    /// Install already-normalized records.
    pub fn load_records(&self, records: Vec<SignalRecord>) -> Result<u64> {
        let _guard = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let catalog = SignalCatalog::from_records(records);
        if catalog.is_empty() {
            return Err(SignalMatchError::catalog_unavailable("no usable signal records"));
        }
        let rejected = catalog.rejected_count();
        self.install(catalog.into_signals(), self.config.zones.clone(), rejected)
    }

    /// Re-cluster the current catalog with a different zone configuration.
    pub fn recluster(&self, zone_config: ZoneConfig) -> Result<u64> {
        let _guard = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot()?;
        self.install(
            current.grid.signals().to_vec(),
            zone_config,
            current.rejected_count,
        )
    }

    fn install(
        &self,
        signals: Vec<SignalRecord>,
        zone_config: ZoneConfig,
        rejected_count: usize,
    ) -> Result<u64> {
        let zones = cluster_signals(&signals, &zone_config)?;
        let grid = SignalGrid::build(signals, self.config.matching.corridor_radius_meters)?;

        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let zone_index = ZoneIndex::with_version(zones, version);

        info!(
            "Installed snapshot v{}: {} signals, {} zones, {} rejected",
            version,
            grid.len(),
            zone_index.len(),
            rejected_count
        );

        self.current.store(EngineSnapshot {
            version,
            grid,
            zones: zone_index,
            zone_config,
            rejected_count,
        });
        Ok(version)
    }

    /// The current snapshot. Callers may hold it across a reload.
    pub fn snapshot(&self) -> Result<Arc<EngineSnapshot>> {
        self.current
            .load()
            .ok_or_catalog_unavailable("no signal catalog has been loaded")
    }

    /// Drop the current snapshot.
    pub fn clear(&self) {
        self.current.clear();
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Coordinates of the signals along `route`, in encounter order.
    ///
    /// `max_results` of 0 means unlimited. The configured deadline applies.
    pub fn match_route(
        &self,
        route: &[GeoPoint],
        radius_meters: f64,
        max_results: usize,
    ) -> Result<Vec<GeoPoint>> {
        let config = MatchConfig {
            corridor_radius_meters: radius_meters,
            max_results,
            ..self.config.matching.clone()
        };
        let matches = self.match_route_detailed(route, &config)?;
        Ok(matched_coordinates(&matches))
    }

    /// Full match results, including ids and distances.
    pub fn match_route_detailed(
        &self,
        route: &[GeoPoint],
        config: &MatchConfig,
    ) -> Result<Vec<SignalMatch>> {
        let snapshot = self.snapshot()?;
        match_route_indexed(route, &snapshot.grid, config)
    }

    // ========================================================================
    // Zones
    // ========================================================================

    /// Zone listing in index order.
    pub fn current_zones(&self) -> Result<Vec<ZoneSummary>> {
        Ok(self.snapshot()?.zones.summaries())
    }

    /// The zone a registration refers to by its 1-based number.
    pub fn zone_by_index(&self, index: u32) -> Result<Zone> {
        self.snapshot()?.zones.lookup(index).cloned()
    }

    /// The zone closest to a location, e.g. where an officer registers.
    pub fn nearest_zone(&self, point: &GeoPoint) -> Result<Zone> {
        let snapshot = self.snapshot()?;
        snapshot
            .zones
            .nearest_zone(point)
            .cloned()
            .ok_or_not_found(0, snapshot.zones.len())
    }

    /// Counters for the current snapshot, if one is loaded.
    pub fn stats(&self) -> Option<EngineStats> {
        let snapshot = self.current.load()?;
        Some(EngineStats {
            version: snapshot.version,
            signal_count: snapshot.grid.len(),
            rejected_count: snapshot.rejected_count,
            zone_count: snapshot.zones.len(),
            grid_cells: snapshot.grid.cell_count(),
        })
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Process-wide engine instance, loaded once at startup.
pub static ENGINE: Lazy<DispatchEngine> = Lazy::new(DispatchEngine::new);

/// Run `f` against the global engine.
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&DispatchEngine) -> R,
{
    f(&ENGINE)
}
