use std::collections::BTreeMap;
use std::fmt;

use _model::{AddressId, MerchantId, ZoneKind};
use serde::Deserialize;
use typed_floats::tf64::NonNaN;

use crate::codec::{self, GeoDocument, SpatialPoint, ZoneGeometry};
use crate::error::{LocationError, Result};
use crate::guard::{self, LocationPlan};
use crate::index::{BBox, SpatialIndex};

/// Where a merchant's coordinates come from. Resolved to a concrete scalar
/// pair before any write fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationSource {
    Own { lat: f64, lng: f64 },
    FromAddress(AddressId),
}

/// One merchant and all three representations of its location. The scalar
/// pair is the authoritative input; `document` and `point` are derived and
/// only ever written by the store itself.
#[derive(Debug, Clone)]
pub struct MerchantRecord {
    id: MerchantId,
    name: String,
    active: bool,
    lat: Option<f64>,
    lng: Option<f64>,
    document: Option<GeoDocument>,
    point: Option<SpatialPoint>,
    active_address: Option<AddressId>,
    zones: BTreeMap<ZoneKind, ZoneGeometry>,
    // structured zone documents awaiting migration to native values
    legacy_zones: BTreeMap<ZoneKind, GeoDocument>,
    delivery_radius_m: Option<u32>,
    max_delivery_radius_m: Option<u32>,
}

impl MerchantRecord {
    fn new(id: MerchantId, name: String) -> Self {
        Self {
            id,
            name,
            active: true,
            lat: None,
            lng: None,
            document: None,
            point: None,
            active_address: None,
            zones: BTreeMap::new(),
            legacy_zones: BTreeMap::new(),
            delivery_radius_m: None,
            max_delivery_radius_m: None,
        }
    }

    pub fn id(&self) -> MerchantId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn lat(&self) -> Option<f64> {
        self.lat
    }

    pub fn lng(&self) -> Option<f64> {
        self.lng
    }

    pub fn document(&self) -> Option<&GeoDocument> {
        self.document.as_ref()
    }

    pub fn point(&self) -> Option<SpatialPoint> {
        self.point
    }

    pub fn active_address(&self) -> Option<AddressId> {
        self.active_address
    }

    pub fn zone(&self, kind: ZoneKind) -> Option<&ZoneGeometry> {
        self.zones.get(&kind)
    }

    pub fn legacy_zone(&self, kind: ZoneKind) -> Option<&GeoDocument> {
        self.legacy_zones.get(&kind)
    }

    pub fn delivery_radius_m(&self) -> Option<u32> {
        self.delivery_radius_m
    }

    pub fn max_delivery_radius_m(&self) -> Option<u32> {
        self.max_delivery_radius_m
    }

    pub fn source(&self) -> Option<LocationSource> {
        if let Some(address) = self.active_address {
            return Some(LocationSource::FromAddress(address));
        }
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(LocationSource::Own { lat, lng }),
            _ => None,
        }
    }
}

/// The simpler analogue of a merchant record: a street address with the same
/// three location representations and no zones.
#[derive(Debug, Clone)]
pub struct AddressRecord {
    id: AddressId,
    label: String,
    lat: Option<f64>,
    lng: Option<f64>,
    document: Option<GeoDocument>,
    point: Option<SpatialPoint>,
}

impl AddressRecord {
    fn new(id: AddressId, label: String) -> Self {
        Self {
            id,
            label,
            lat: None,
            lng: None,
            document: None,
            point: None,
        }
    }

    pub fn id(&self) -> AddressId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn lat(&self) -> Option<f64> {
        self.lat
    }

    pub fn lng(&self) -> Option<f64> {
        self.lng
    }

    pub fn document(&self) -> Option<&GeoDocument> {
        self.document.as_ref()
    }

    pub fn point(&self) -> Option<SpatialPoint> {
        self.point
    }
}

#[derive(Debug, Default)]
pub struct LocationStore {
    merchants: BTreeMap<MerchantId, MerchantRecord>,
    addresses: BTreeMap<AddressId, AddressRecord>,
    index: SpatialIndex,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merchant(&self, id: MerchantId) -> Option<&MerchantRecord> {
        self.merchants.get(&id)
    }

    pub fn address(&self, id: AddressId) -> Option<&AddressRecord> {
        self.addresses.get(&id)
    }

    pub fn merchants(&self) -> impl Iterator<Item = &MerchantRecord> {
        self.merchants.values()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &AddressRecord> {
        self.addresses.values()
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn add_merchant(&mut self, id: MerchantId, name: &str) -> Result<()> {
        if self.merchants.contains_key(&id) {
            return Err(LocationError::DuplicateMerchant(id));
        }
        self.merchants.insert(id, MerchantRecord::new(id, name.to_string()));
        Ok(())
    }

    pub fn add_address(&mut self, id: AddressId, label: &str) -> Result<()> {
        if self.addresses.contains_key(&id) {
            return Err(LocationError::DuplicateAddress(id));
        }
        self.addresses.insert(id, AddressRecord::new(id, label.to_string()));
        Ok(())
    }

    pub fn set_active(&mut self, id: MerchantId, active: bool) -> Result<()> {
        self.merchant_mut(id)?.active = active;
        Ok(())
    }

    pub fn set_delivery_radius(
        &mut self,
        id: MerchantId,
        radius_m: Option<u32>,
        max_radius_m: Option<u32>,
    ) -> Result<()> {
        let record = self.merchant_mut(id)?;
        record.delivery_radius_m = radius_m;
        record.max_delivery_radius_m = max_radius_m;
        Ok(())
    }

    /// Write the authoritative scalar pair. Both derived representations and
    /// the index entry change in the same commit, or the whole write fails.
    pub fn set_location(&mut self, id: MerchantId, lat: f64, lng: f64) -> Result<()> {
        let record = self.merchant_ref(id)?;
        if let Some(plan) = guard::plan((record.lat, record.lng), (Some(lat), Some(lng)))? {
            self.commit_merchant(id, plan);
        }
        Ok(())
    }

    pub fn clear_location(&mut self, id: MerchantId) -> Result<()> {
        let record = self.merchant_ref(id)?;
        if let Some(plan) = guard::plan((record.lat, record.lng), (None, None))? {
            self.commit_merchant(id, plan);
        }
        Ok(())
    }

    /// Single entry point for both sourcing modes.
    pub fn set_location_source(&mut self, id: MerchantId, source: LocationSource) -> Result<()> {
        match source {
            LocationSource::Own { lat, lng } => {
                self.merchant_ref(id)?;
                self.set_active_address(id, None)?;
                self.set_location(id, lat, lng)
            }
            LocationSource::FromAddress(address) => self.set_active_address(id, Some(address)),
        }
    }

    /// Repoint a merchant at an address. The address's coordinates become the
    /// merchant's new incoming scalar pair; detaching keeps the coordinates
    /// last resolved.
    pub fn set_active_address(&mut self, id: MerchantId, address: Option<AddressId>) -> Result<()> {
        let record = self.merchant_ref(id)?;
        let incoming = match address {
            Some(aid) => {
                let addr = self
                    .addresses
                    .get(&aid)
                    .ok_or(LocationError::UnknownAddress(aid))?;
                (addr.lat, addr.lng)
            }
            None => (record.lat, record.lng),
        };

        let plan = guard::plan((record.lat, record.lng), incoming)?;
        self.merchants.get_mut(&id).expect("checked above").active_address = address;
        if let Some(plan) = plan {
            self.commit_merchant(id, plan);
        }
        Ok(())
    }

    /// Write an address's scalar pair and re-run the location write for every
    /// merchant currently sourcing from it. All of it is planned before any
    /// field changes.
    pub fn set_address_location(&mut self, id: AddressId, lat: f64, lng: f64) -> Result<()> {
        self.write_address(id, (Some(lat), Some(lng)))
    }

    pub fn clear_address_location(&mut self, id: AddressId) -> Result<()> {
        self.write_address(id, (None, None))
    }

    fn write_address(&mut self, id: AddressId, incoming: (Option<f64>, Option<f64>)) -> Result<()> {
        let record = self
            .addresses
            .get(&id)
            .ok_or(LocationError::UnknownAddress(id))?;
        let Some(plan) = guard::plan((record.lat, record.lng), incoming)? else {
            return Ok(());
        };

        let mut cascades = Vec::new();
        for merchant in self.merchants.values() {
            if merchant.active_address == Some(id) {
                if let Some(cascade) =
                    guard::plan((merchant.lat, merchant.lng), (plan.lat, plan.lng))?
                {
                    cascades.push((merchant.id, cascade));
                }
            }
        }

        let record = self.addresses.get_mut(&id).expect("checked above");
        record.lat = plan.lat;
        record.lng = plan.lng;
        record.document = plan.document;
        record.point = plan.point;
        for (merchant, cascade) in cascades {
            self.commit_merchant(merchant, cascade);
        }
        Ok(())
    }

    pub fn set_zone(&mut self, id: MerchantId, kind: ZoneKind, document: &GeoDocument) -> Result<()> {
        self.merchant_ref(id)?;
        let geometry = codec::zone_geometry(document)?;
        let record = self.merchants.get_mut(&id).expect("checked above");
        record.zones.insert(kind, geometry);
        self.index.update_zone(id, kind, record.zones.get(&kind));
        Ok(())
    }

    pub fn clear_zone(&mut self, id: MerchantId, kind: ZoneKind) -> Result<()> {
        let record = self.merchant_mut(id)?;
        record.zones.remove(&kind);
        self.index.update_zone(id, kind, None);
        Ok(())
    }

    /// Park a structured zone document on the record without converting it.
    /// Used by imports of historical rows; `migrate_legacy_zones` drains it.
    pub fn stash_legacy_zone(
        &mut self,
        id: MerchantId,
        kind: ZoneKind,
        document: GeoDocument,
    ) -> Result<()> {
        self.merchant_mut(id)?.legacy_zones.insert(kind, document);
        Ok(())
    }

    /// Convert every parked zone document to its native value, preserving
    /// ring order, winding, and closure. Validates everything first; a single
    /// malformed document fails the migration with nothing applied.
    pub fn migrate_legacy_zones(&mut self) -> Result<usize> {
        let mut converted = Vec::new();
        for merchant in self.merchants.values() {
            for (kind, document) in &merchant.legacy_zones {
                converted.push((merchant.id, *kind, codec::zone_geometry(document)?));
            }
        }

        let count = converted.len();
        for (id, kind, geometry) in converted {
            let record = self.merchants.get_mut(&id).expect("planned from live records");
            record.zones.insert(kind, geometry);
            record.legacy_zones.remove(&kind);
            self.index.update_zone(id, kind, record.zones.get(&kind));
        }
        Ok(count)
    }

    pub fn remove_merchant(&mut self, id: MerchantId) -> Result<()> {
        let record = self
            .merchants
            .remove(&id)
            .ok_or(LocationError::UnknownMerchant(id))?;
        self.index.update_point(id, record.point, None);
        for kind in record.zones.keys() {
            self.index.update_zone(id, *kind, None);
        }
        Ok(())
    }

    /// Deleting a street address does not un-place the merchants that used
    /// it; they detach and keep their last resolved coordinates.
    pub fn remove_address(&mut self, id: AddressId) -> Result<()> {
        self.addresses
            .remove(&id)
            .ok_or(LocationError::UnknownAddress(id))?;
        for merchant in self.merchants.values_mut() {
            if merchant.active_address == Some(id) {
                merchant.active_address = None;
            }
        }
        Ok(())
    }

    /// Bulk intake: scalar pairs only, everything else derived through the
    /// normal write path. Per-row failures are collected, not fatal.
    pub fn import_merchants(
        &mut self,
        records: impl IntoIterator<Item = ImportRecord>,
    ) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();
        for record in records {
            let id = MerchantId(record.id);
            if !self.merchants.contains_key(&id) {
                self.merchants
                    .insert(id, MerchantRecord::new(id, record.name.clone()));
                outcome.created += 1;
            }

            let (lat, lng) = (f64::from(record.lat), f64::from(record.lng));
            match self.set_location(id, lat, lng) {
                Ok(()) if codec::is_unset(lat, lng) => outcome.unset += 1,
                Ok(()) => outcome.located += 1,
                Err(e) => outcome.failed.push((id, e)),
            }
        }
        outcome
    }

    /// Defensive scan: recompute what the derived columns should hold and
    /// compare against what they do hold, including index membership. Any
    /// finding means a write bypassed the store.
    pub fn check_consistency(&self) -> Vec<Inconsistency> {
        let mut findings = Vec::new();
        for merchant in self.merchants.values() {
            let entity = format!("{:?}", merchant.id);
            match guard::derive(merchant.lat, merchant.lng) {
                Ok((document, point)) => {
                    if merchant.document != document {
                        findings.push(Inconsistency::new(&entity, "document disagrees with scalars"));
                    }
                    if merchant.point != point {
                        findings.push(Inconsistency::new(&entity, "native point disagrees with scalars"));
                    }
                }
                Err(e) => findings.push(Inconsistency::new(&entity, &format!("stored scalars invalid: {e}"))),
            }
            if let Some(point) = merchant.point {
                if point.require_wgs84().is_err() {
                    findings.push(Inconsistency::new(&entity, "native point srid is not 4326"));
                }
                if !self.index.has_point_entry(merchant.id, point) {
                    findings.push(Inconsistency::new(&entity, "native point missing from index"));
                }
            }
            for kind in ZoneKind::all() {
                let expected = merchant.zones.get(&kind).and_then(BBox::of);
                if self.index.zone_entry(kind, merchant.id) != expected {
                    findings.push(Inconsistency::new(
                        &entity,
                        &format!("{} index entry disagrees with record", kind.slug()),
                    ));
                }
            }
        }
        for address in self.addresses.values() {
            let entity = format!("{:?}", address.id);
            match guard::derive(address.lat, address.lng) {
                Ok((document, point)) => {
                    if address.document != document || address.point != point {
                        findings.push(Inconsistency::new(&entity, "derived fields disagree with scalars"));
                    }
                }
                Err(e) => findings.push(Inconsistency::new(&entity, &format!("stored scalars invalid: {e}"))),
            }
        }
        findings
    }

    pub fn verify(&self) -> Result<()> {
        match self.check_consistency().into_iter().next() {
            Some(finding) => Err(LocationError::IndexInconsistency(finding.to_string())),
            None => Ok(()),
        }
    }

    fn commit_merchant(&mut self, id: MerchantId, plan: LocationPlan) {
        let record = self.merchants.get_mut(&id).expect("planned from a live record");
        let old = record.point;
        record.lat = plan.lat;
        record.lng = plan.lng;
        record.document = plan.document;
        record.point = plan.point;
        self.index.update_point(id, old, record.point);
    }

    fn merchant_ref(&self, id: MerchantId) -> Result<&MerchantRecord> {
        self.merchants.get(&id).ok_or(LocationError::UnknownMerchant(id))
    }

    fn merchant_mut(&mut self, id: MerchantId) -> Result<&mut MerchantRecord> {
        self.merchants
            .get_mut(&id)
            .ok_or(LocationError::UnknownMerchant(id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRecord {
    pub id: u32,
    pub name: String,
    pub lat: NonNaN,
    pub lng: NonNaN,
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub created: usize,
    pub located: usize,
    pub unset: usize,
    pub failed: Vec<(MerchantId, LocationError)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inconsistency {
    pub entity: String,
    pub detail: String,
}

impl Inconsistency {
    fn new(entity: &str, detail: &str) -> Self {
        Self {
            entity: entity.to_string(),
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANILA: (f64, f64) = (14.5995, 120.9842);

    fn store_with_merchant() -> LocationStore {
        let mut store = LocationStore::new();
        store.add_merchant(MerchantId(1), "Aling Nena's").unwrap();
        store
    }

    #[test]
    fn set_location_derives_everything() {
        let mut store = store_with_merchant();
        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();

        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!((record.lat(), record.lng()), (Some(MANILA.0), Some(MANILA.1)));
        assert_eq!(
            record.document(),
            Some(&GeoDocument::Point {
                coordinates: [MANILA.1, MANILA.0]
            })
        );
        let point = record.point().unwrap();
        assert_eq!((point.lat(), point.lng()), MANILA);
        assert_eq!(point.srid(), 4326);
        assert!(store.check_consistency().is_empty());
    }

    #[test]
    fn zero_component_stores_scalars_but_no_derived_fields() {
        let mut store = store_with_merchant();
        store.set_location(MerchantId(1), 0.0, 14.5).unwrap();

        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!((record.lat(), record.lng()), (Some(0.0), Some(14.5)));
        assert_eq!(record.document(), None);
        assert_eq!(record.point(), None);
    }

    #[test]
    fn clear_location_propagates() {
        let mut store = store_with_merchant();
        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();
        store.clear_location(MerchantId(1)).unwrap();

        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!(record.lat(), None);
        assert_eq!(record.lng(), None);
        assert_eq!(record.document(), None);
        assert_eq!(record.point(), None);
        assert!(store.index().candidates(MANILA.0, MANILA.1, 1000.0).is_empty());
    }

    #[test]
    fn reapplying_the_same_pair_touches_nothing() {
        let mut store = store_with_merchant();
        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();
        let mutations = store.index().mutations();

        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();
        assert_eq!(store.index().mutations(), mutations);
    }

    #[test]
    fn rejected_write_leaves_no_partial_state() {
        let mut store = store_with_merchant();
        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();

        assert!(store.set_location(MerchantId(1), 91.0, 10.0).is_err());
        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!((record.lat(), record.lng()), (Some(MANILA.0), Some(MANILA.1)));
        assert!(record.point().is_some());
        assert!(store.check_consistency().is_empty());
    }

    #[test]
    fn address_switch_cascades_into_the_merchant() {
        let mut store = store_with_merchant();
        store.add_address(AddressId(10), "stall A").unwrap();
        store.add_address(AddressId(11), "stall B").unwrap();
        store.set_address_location(AddressId(10), MANILA.0, MANILA.1).unwrap();
        store.set_address_location(AddressId(11), 14.6091, 120.9830).unwrap();

        store.set_active_address(MerchantId(1), Some(AddressId(10))).unwrap();
        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!((record.lat(), record.lng()), (Some(MANILA.0), Some(MANILA.1)));
        assert_eq!(record.source(), Some(LocationSource::FromAddress(AddressId(10))));

        // repointing to a different address re-fires with its coordinates
        store.set_active_address(MerchantId(1), Some(AddressId(11))).unwrap();
        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!((record.lat(), record.lng()), (Some(14.6091), Some(120.9830)));

        // updating the address itself reaches sourcing merchants
        store.set_address_location(AddressId(11), 14.62, 121.0).unwrap();
        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!((record.lat(), record.lng()), (Some(14.62), Some(121.0)));
        assert!(store.check_consistency().is_empty());

        // detaching keeps the coordinates
        store.set_active_address(MerchantId(1), None).unwrap();
        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!((record.lat(), record.lng()), (Some(14.62), Some(121.0)));
        assert_eq!(
            record.source(),
            Some(LocationSource::Own {
                lat: 14.62,
                lng: 121.0
            })
        );
    }

    #[test]
    fn zone_migration_preserves_documents() {
        let mut store = store_with_merchant();
        let document = GeoDocument::Polygon {
            coordinates: vec![vec![
                [120.98, 14.59],
                [120.99, 14.59],
                [120.99, 14.60],
                [120.98, 14.60],
                [120.98, 14.59],
            ]],
        };
        store
            .stash_legacy_zone(MerchantId(1), ZoneKind::DeliveryZones, document.clone())
            .unwrap();
        assert_eq!(store.migrate_legacy_zones().unwrap(), 1);

        let record = store.merchant(MerchantId(1)).unwrap();
        assert_eq!(record.legacy_zone(ZoneKind::DeliveryZones), None);
        let geometry = record.zone(ZoneKind::DeliveryZones).unwrap();
        assert_eq!(codec::zone_document(geometry), document);
        assert!(store.check_consistency().is_empty());
    }

    #[test]
    fn bad_legacy_zone_fails_the_whole_migration() {
        let mut store = store_with_merchant();
        store.add_merchant(MerchantId(2), "second").unwrap();
        let valid = GeoDocument::Polygon {
            coordinates: vec![vec![
                [120.98, 14.59],
                [120.99, 14.59],
                [120.99, 14.60],
                [120.98, 14.60],
                [120.98, 14.59],
            ]],
        };
        let open = GeoDocument::Polygon {
            coordinates: vec![vec![
                [120.98, 14.59],
                [120.99, 14.59],
                [120.99, 14.60],
                [120.98, 14.60],
            ]],
        };
        store
            .stash_legacy_zone(MerchantId(1), ZoneKind::ServiceArea, valid)
            .unwrap();
        store
            .stash_legacy_zone(MerchantId(2), ZoneKind::ServiceArea, open)
            .unwrap();

        assert!(store.migrate_legacy_zones().is_err());
        // nothing applied, both documents still parked
        assert!(store.merchant(MerchantId(1)).unwrap().zone(ZoneKind::ServiceArea).is_none());
        assert!(store.merchant(MerchantId(1)).unwrap().legacy_zone(ZoneKind::ServiceArea).is_some());
    }

    #[test]
    fn removal_cleans_the_index() {
        let mut store = store_with_merchant();
        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();
        store.remove_merchant(MerchantId(1)).unwrap();
        assert!(store.index().candidates(MANILA.0, MANILA.1, 1000.0).is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut store = store_with_merchant();
        assert!(matches!(
            store.add_merchant(MerchantId(1), "again"),
            Err(LocationError::DuplicateMerchant(MerchantId(1)))
        ));
    }

    #[test]
    fn import_collects_per_row_failures() {
        let mut store = LocationStore::new();
        let rows = vec![
            ImportRecord {
                id: 1,
                name: "located".into(),
                lat: NonNaN::new(MANILA.0).unwrap(),
                lng: NonNaN::new(MANILA.1).unwrap(),
            },
            ImportRecord {
                id: 2,
                name: "unset".into(),
                lat: NonNaN::new(0.0).unwrap(),
                lng: NonNaN::new(0.0).unwrap(),
            },
            ImportRecord {
                id: 3,
                name: "broken".into(),
                lat: NonNaN::new(99.0).unwrap(),
                lng: NonNaN::new(120.0).unwrap(),
            },
        ];

        let outcome = store.import_merchants(rows);
        assert_eq!(outcome.created, 3);
        assert_eq!(outcome.located, 1);
        assert_eq!(outcome.unset, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, MerchantId(3));
        // the failed row exists but holds no location at all
        let record = store.merchant(MerchantId(3)).unwrap();
        assert_eq!(record.lat(), None);
        assert_eq!(record.point(), None);
    }

    #[test]
    fn consistency_scan_catches_drift() {
        let mut store = store_with_merchant();
        store.set_location(MerchantId(1), MANILA.0, MANILA.1).unwrap();
        assert!(store.verify().is_ok());

        // simulate a writer that bypassed the store
        store.merchants.get_mut(&MerchantId(1)).unwrap().lat = Some(15.0);
        let findings = store.check_consistency();
        assert!(!findings.is_empty());
        assert!(matches!(
            store.verify(),
            Err(LocationError::IndexInconsistency(_))
        ));
    }
}
