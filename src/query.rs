use _model::{MerchantId, ZoneKind};
use geo::{HaversineDistance, Point};

use crate::error::{LocationError, Result};
use crate::store::{LocationStore, MerchantRecord};

/// Merchants within `radius_m` meters of the given point, nearest first,
/// distance ties broken by ascending id. Rows without a native point never
/// match. The radius is meters; the meters-to-degrees window used against
/// the index is handled here, not by callers.
pub fn within_radius(
    store: &LocationStore,
    lat: f64,
    lng: f64,
    radius_m: f64,
) -> Vec<(MerchantId, f64)> {
    within_radius_where(store, lat, lng, radius_m, |_| true)
}

pub fn within_radius_where(
    store: &LocationStore,
    lat: f64,
    lng: f64,
    radius_m: f64,
    mut filter: impl FnMut(&MerchantRecord) -> bool,
) -> Vec<(MerchantId, f64)> {
    if !lat.is_finite() || !lng.is_finite() || !(radius_m >= 0.0) {
        return Vec::new();
    }

    let center = Point::new(lng, lat);
    let mut out = Vec::new();
    for id in store.index().candidates(lat, lng, radius_m) {
        let Some(record) = store.merchant(id) else {
            continue;
        };
        let Some(point) = record.point() else {
            continue;
        };
        if !filter(record) {
            continue;
        }
        let distance = center.haversine_distance(&point.point());
        if distance <= radius_m {
            out.push((id, distance));
        }
    }
    out.sort_by(|(a_id, a), (b_id, b)| a.total_cmp(b).then(a_id.cmp(b_id)));
    out
}

/// Point-in-zone test for one merchant. A merchant without that zone simply
/// does not contain anything.
pub fn zone_contains(
    store: &LocationStore,
    id: MerchantId,
    kind: ZoneKind,
    lat: f64,
    lng: f64,
) -> Result<bool> {
    let record = store
        .merchant(id)
        .ok_or(LocationError::UnknownMerchant(id))?;
    Ok(record
        .zone(kind)
        .is_some_and(|zone| zone.contains(Point::new(lng, lat))))
}

/// All merchants whose given zone contains the point, ascending id. Bounding
/// boxes prefilter; the exact predicate decides.
pub fn covering(store: &LocationStore, kind: ZoneKind, lat: f64, lng: f64) -> Vec<MerchantId> {
    if !lat.is_finite() || !lng.is_finite() {
        return Vec::new();
    }
    let point = Point::new(lng, lat);
    store
        .index()
        .zone_candidates(kind, point)
        .into_iter()
        .filter(|id| {
            store
                .merchant(*id)
                .and_then(|record| record.zone(kind))
                .is_some_and(|zone| zone.contains(point))
        })
        .collect()
}

/// Merchants whose own delivery radius reaches the point, nearest first.
/// Falls back to the maximum radius when no standard radius is set.
pub fn delivering_to(store: &LocationStore, lat: f64, lng: f64) -> Vec<(MerchantId, f64)> {
    let reach = store
        .merchants()
        .filter_map(reach_m)
        .max()
        .unwrap_or(0);
    if reach == 0 {
        return Vec::new();
    }

    within_radius_where(store, lat, lng, f64::from(reach), |record| {
        reach_m(record).is_some()
    })
    .into_iter()
    .filter(|(id, distance)| {
        store
            .merchant(*id)
            .and_then(reach_m)
            .is_some_and(|reach| *distance <= f64::from(reach))
    })
    .collect()
}

fn reach_m(record: &MerchantRecord) -> Option<u32> {
    record.delivery_radius_m().or(record.max_delivery_radius_m())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::GeoDocument;

    const MANILA: (f64, f64) = (14.5995, 120.9842);
    const QUIAPO: (f64, f64) = (14.6091, 120.9830);

    fn two_merchants() -> LocationStore {
        let mut store = LocationStore::new();
        store.add_merchant(MerchantId(1), "near").unwrap();
        store.add_merchant(MerchantId(2), "far").unwrap();
        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();
        store.set_location(MerchantId(2), QUIAPO.0, QUIAPO.1).unwrap();
        store
    }

    #[test]
    fn radius_query_is_nearest_first() {
        let store = two_merchants();

        // ~1.1 km apart: 2000 m finds both, 500 m only the center one
        let hits = within_radius(&store, MANILA.0, MANILA.1, 2000.0);
        assert_eq!(
            hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![MerchantId(1), MerchantId(2)]
        );
        assert!(hits[0].1 < hits[1].1);
        assert!(hits[1].1 > 1000.0 && hits[1].1 < 1300.0);

        let hits = within_radius(&store, MANILA.0, MANILA.1, 500.0);
        assert_eq!(hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![MerchantId(1)]);
    }

    #[test]
    fn distance_ties_break_by_id() {
        let mut store = LocationStore::new();
        for id in [3, 1, 2] {
            store.add_merchant(MerchantId(id), "co-located").unwrap();
            store.set_location(MerchantId(id), MANILA.0, MANILA.1).unwrap();
        }

        let hits = within_radius(&store, MANILA.0, MANILA.1, 100.0);
        assert_eq!(
            hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![MerchantId(1), MerchantId(2), MerchantId(3)]
        );
    }

    #[test]
    fn unlocated_rows_never_match() {
        let mut store = two_merchants();
        store.add_merchant(MerchantId(3), "unplaced").unwrap();
        store.set_location(MerchantId(3), 0.0, 14.5).unwrap();

        let hits = within_radius(&store, MANILA.0, MANILA.1, 5_000_000.0);
        assert!(hits.iter().all(|(id, _)| *id != MerchantId(3)));
    }

    #[test]
    fn filter_narrows_candidates() {
        let mut store = two_merchants();
        store.set_active(MerchantId(2), false).unwrap();

        let hits =
            within_radius_where(&store, MANILA.0, MANILA.1, 2000.0, |record| record.active());
        assert_eq!(hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![MerchantId(1)]);
    }

    #[test]
    fn zone_containment_square() {
        let mut store = two_merchants();
        let square = GeoDocument::Polygon {
            coordinates: vec![vec![
                [120.98, 14.59],
                [120.99, 14.59],
                [120.99, 14.60],
                [120.98, 14.60],
                [120.98, 14.59],
            ]],
        };
        store.set_zone(MerchantId(1), ZoneKind::ServiceArea, &square).unwrap();

        assert!(zone_contains(&store, MerchantId(1), ZoneKind::ServiceArea, 14.595, 120.985).unwrap());
        assert!(!zone_contains(&store, MerchantId(1), ZoneKind::ServiceArea, 14.595, 115.985).unwrap());
        // no such zone on this record, never an error
        assert!(!zone_contains(&store, MerchantId(2), ZoneKind::ServiceArea, 14.595, 120.985).unwrap());

        assert_eq!(
            covering(&store, ZoneKind::ServiceArea, 14.595, 120.985),
            vec![MerchantId(1)]
        );
        assert!(covering(&store, ZoneKind::ServiceArea, 14.595, 115.985).is_empty());
    }

    #[test]
    fn delivery_reach_is_per_merchant() {
        let mut store = two_merchants();
        store.set_delivery_radius(MerchantId(1), Some(2000), None).unwrap();
        store.set_delivery_radius(MerchantId(2), None, Some(500)).unwrap();

        // the query point sits on merchant 1; merchant 2 is ~1.1 km away
        let hits = delivering_to(&store, MANILA.0, MANILA.1);
        assert_eq!(hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![MerchantId(1)]);

        store.set_delivery_radius(MerchantId(2), Some(2000), None).unwrap();
        let hits = delivering_to(&store, MANILA.0, MANILA.1);
        assert_eq!(
            hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![MerchantId(1), MerchantId(2)]
        );
    }
}
