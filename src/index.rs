use std::collections::{BTreeMap, BTreeSet};

use _model::{MerchantId, ZoneKind};
use geo::Point;

use crate::codec::{SpatialPoint, ZoneGeometry};

// grid cell edge in degrees, ~5.5 km of latitude
const CELL_DEG: f64 = 0.05;

pub(crate) const METERS_PER_DEG: f64 = 111_320.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BBox {
    pub(crate) fn of(geometry: &ZoneGeometry) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self {
            min_lng: rect.min().x,
            min_lat: rect.min().y,
            max_lng: rect.max().x,
            max_lat: rect.max().y,
        })
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x() >= self.min_lng
            && point.x() <= self.max_lng
            && point.y() >= self.min_lat
            && point.y() <= self.max_lat
    }
}

/// Grid buckets over native points plus bounding boxes per zone field.
/// Maintained by the store inside every mutation; queries only ever see
/// committed entries.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cells: BTreeMap<(i32, i32), BTreeSet<MerchantId>>,
    zones: BTreeMap<(ZoneKind, MerchantId), BBox>,
    mutations: u64,
}

fn cell_of(point: Point) -> (i32, i32) {
    (
        (point.y() / CELL_DEG).floor() as i32,
        (point.x() / CELL_DEG).floor() as i32,
    )
}

impl SpatialIndex {
    /// Count of maintenance writes so far. A re-applied identical location
    /// must leave this unchanged.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    pub(crate) fn update_point(
        &mut self,
        id: MerchantId,
        old: Option<SpatialPoint>,
        new: Option<SpatialPoint>,
    ) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            let cell = cell_of(old.point());
            if let Some(ids) = self.cells.get_mut(&cell) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
        if let Some(new) = new {
            self.cells.entry(cell_of(new.point())).or_default().insert(id);
        }
        self.mutations += 1;
    }

    pub(crate) fn update_zone(
        &mut self,
        id: MerchantId,
        kind: ZoneKind,
        geometry: Option<&ZoneGeometry>,
    ) {
        let changed = match geometry.and_then(BBox::of) {
            Some(bbox) => self.zones.insert((kind, id), bbox) != Some(bbox),
            None => self.zones.remove(&(kind, id)).is_some(),
        };
        if changed {
            self.mutations += 1;
        }
    }

    /// Ids whose indexed point may lie within `radius_m` of the center.
    /// Callers still refine with an exact distance check.
    pub(crate) fn candidates(&self, lat: f64, lng: f64, radius_m: f64) -> Vec<MerchantId> {
        let dlat = radius_m / METERS_PER_DEG;
        let dlng = radius_m / (METERS_PER_DEG * lat.to_radians().cos().abs().max(0.01));

        let rows = (((lat - dlat) / CELL_DEG).floor() as i64, ((lat + dlat) / CELL_DEG).floor() as i64);
        let cols = (((lng - dlng) / CELL_DEG).floor() as i64, ((lng + dlng) / CELL_DEG).floor() as i64);

        let window = (rows.1 - rows.0 + 1).saturating_mul(cols.1 - cols.0 + 1);
        let mut out = Vec::new();
        if window as usize >= self.cells.len() {
            // window covers the whole index, skip per-cell lookups
            for ids in self.cells.values() {
                out.extend(ids.iter().copied());
            }
            return out;
        }

        for row in rows.0..=rows.1 {
            for col in cols.0..=cols.1 {
                if let Some(ids) = self.cells.get(&(row as i32, col as i32)) {
                    out.extend(ids.iter().copied());
                }
            }
        }
        out
    }

    /// Ids whose zone bounding box contains the point, ascending.
    pub(crate) fn zone_candidates(&self, kind: ZoneKind, point: Point) -> Vec<MerchantId> {
        self.zones
            .range((kind, MerchantId(0))..=(kind, MerchantId(u32::MAX)))
            .filter(|(_, bbox)| bbox.contains(point))
            .map(|((_, id), _)| *id)
            .collect()
    }

    pub(crate) fn has_point_entry(&self, id: MerchantId, point: SpatialPoint) -> bool {
        self.cells
            .get(&cell_of(point.point()))
            .is_some_and(|ids| ids.contains(&id))
    }

    pub(crate) fn zone_entry(&self, kind: ZoneKind, id: MerchantId) -> Option<BBox> {
        self.zones.get(&(kind, id)).copied()
    }
}
