//! Read-only lookup over one clustering run.
//!
//! Built once from the zones of a run and never mutated afterwards; a
//! re-run produces a new index. Holders of an older index keep a
//! consistent view of the run they started with.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::error::{OptionExt, Result};
use crate::geo_utils::{EARTH_RADIUS_METERS, haversine_distance};
use crate::{GeoPoint, Zone, ZoneSummary};

/// A zone centroid for R-tree queries.
#[derive(Debug, Clone, Copy)]
struct CentroidEntry {
    zone_index: u32,
    lat: f64,
    lng: f64,
}

impl RTreeObject for CentroidEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

impl PointDistance for CentroidEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlng = self.lng - point[0];
        let dlat = self.lat - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// Mapping from 1-based zone index to zone.
#[derive(Debug, Clone)]
pub struct ZoneIndex {
    version: u64,
    zones: Vec<Zone>,
    positions: BTreeMap<u32, usize>,
    signal_zones: HashMap<String, u32>,
    centroids: RTree<CentroidEntry>,
}

impl Default for ZoneIndex {
    fn default() -> Self {
        Self::build(Vec::new())
    }
}

impl ZoneIndex {
    /// Build an index over the zones of one clustering run.
    pub fn build(zones: Vec<Zone>) -> Self {
        Self::with_version(zones, 0)
    }

    /// Build an index tagged with the snapshot version it belongs to.
    ///
    /// Zones are keyed by their own `index` field, not by position. If two
    /// zones claim the same index the first one is kept.
    pub fn with_version(zones: Vec<Zone>, version: u64) -> Self {
        let mut zones = zones;
        zones.sort_by_key(|z| z.index);
        zones.dedup_by(|later, earlier| {
            let duplicate = later.index == earlier.index;
            if duplicate {
                warn!("Duplicate zone index {} ignored", later.index);
            }
            duplicate
        });

        let positions: BTreeMap<u32, usize> = zones
            .iter()
            .enumerate()
            .map(|(pos, z)| (z.index, pos))
            .collect();

        let mut signal_zones = HashMap::new();
        for zone in &zones {
            for member in &zone.members {
                signal_zones.insert(member.id.clone(), zone.index);
            }
        }

        let entries: Vec<CentroidEntry> = zones
            .iter()
            .map(|z| CentroidEntry {
                zone_index: z.index,
                lat: z.centroid.latitude,
                lng: z.centroid.longitude,
            })
            .collect();

        Self {
            version,
            zones,
            positions,
            signal_zones,
            centroids: RTree::bulk_load(entries),
        }
    }

    /// Look up a zone by its 1-based index.
    pub fn lookup(&self, index: u32) -> Result<&Zone> {
        self.positions
            .get(&index)
            .map(|&pos| &self.zones[pos])
            .ok_or_not_found(index, self.zones.len())
    }

    /// The zone a signal was assigned to.
    pub fn zone_for_signal(&self, signal_id: &str) -> Option<&Zone> {
        let index = self.signal_zones.get(signal_id)?;
        self.lookup(*index).ok()
    }

    /// The zone whose centroid is closest to `point` by great-circle distance.
    pub fn nearest_zone(&self, point: &GeoPoint) -> Option<&Zone> {
        let query = [point.longitude, point.latitude];
        let approx = self.centroids.nearest_neighbor(&query)?;
        let approx_dist = haversine_distance(point, &GeoPoint::new(approx.lat, approx.lng));

        // Anything closer than the planar nearest lies inside this box.
        let lat_pad = (approx_dist / EARTH_RADIUS_METERS).to_degrees() * 1.01 + 1e-9;
        let cos_lat = (point.latitude.abs() + lat_pad).min(89.999).to_radians().cos();
        let lng_pad = (lat_pad / cos_lat).min(360.0);

        let mut best = (approx.zone_index, approx_dist);
        // Centroids across the antimeridian sit 360 degrees away in the tree.
        for shift in [-360.0, 0.0, 360.0] {
            let min_lng = point.longitude - lng_pad + shift;
            let max_lng = point.longitude + lng_pad + shift;
            if max_lng < -180.0 || min_lng > 180.0 {
                continue;
            }
            let search = AABB::from_corners(
                [min_lng, point.latitude - lat_pad],
                [max_lng, point.latitude + lat_pad],
            );
            for entry in self.centroids.locate_in_envelope_intersecting(&search) {
                let dist = haversine_distance(point, &GeoPoint::new(entry.lat, entry.lng));
                if dist < best.1 || (dist == best.1 && entry.zone_index < best.0) {
                    best = (entry.zone_index, dist);
                }
            }
        }

        self.lookup(best.0).ok()
    }

    /// All zones in index order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Coordinates-only listing in index order.
    pub fn summaries(&self) -> Vec<ZoneSummary> {
        self.zones.iter().map(Zone::summary).collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total number of signals across all zones.
    pub fn signal_count(&self) -> usize {
        self.signal_zones.len()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
