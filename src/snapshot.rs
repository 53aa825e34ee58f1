use std::fs::{read, File};
use std::io::Write;
use std::path::Path;

use _model::ZoneKind;
use serde::{Deserialize, Serialize};

use crate::codec::{self, GeoDocument};
use crate::error::{LocationError, Result};
use crate::store::LocationStore;

const MAGIC: &[u8; 4] = b"LOC1";
const VERSION: u8 = 1;

// Only source data is persisted: scalars, zone geometry, parked legacy
// documents. Derived points and the index are replayed through the normal
// write path on load, so a snapshot can never smuggle in drifted state.
#[derive(Serialize, Deserialize)]
struct StoreImage {
    addresses: Vec<AddressImage>,
    merchants: Vec<MerchantImage>,
}

#[derive(Serialize, Deserialize)]
struct MerchantImage {
    id: u32,
    name: String,
    active: bool,
    lat: Option<f64>,
    lng: Option<f64>,
    active_address: Option<u32>,
    // zone documents ride as JSON text; the tagged document enum has no
    // stable postcard shape
    zones: Vec<(ZoneKind, String)>,
    legacy_zones: Vec<(ZoneKind, String)>,
    delivery_radius_m: Option<u32>,
    max_delivery_radius_m: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct AddressImage {
    id: u32,
    label: String,
    lat: Option<f64>,
    lng: Option<f64>,
}

pub fn save(store: &LocationStore, path: &Path) -> Result<()> {
    let image = StoreImage {
        addresses: store
            .addresses()
            .map(|a| AddressImage {
                id: a.id().0,
                label: a.label().to_string(),
                lat: a.lat(),
                lng: a.lng(),
            })
            .collect(),
        merchants: store
            .merchants()
            .map(|m| {
                Ok(MerchantImage {
                    id: m.id().0,
                    name: m.name().to_string(),
                    active: m.active(),
                    lat: m.lat(),
                    lng: m.lng(),
                    active_address: m.active_address().map(|a| a.0),
                    zones: ZoneKind::all()
                        .iter()
                        .filter_map(|kind| m.zone(*kind).map(|z| (*kind, codec::zone_document(z))))
                        .map(|(kind, document)| Ok((kind, json(&document)?)))
                        .collect::<Result<_>>()?,
                    legacy_zones: ZoneKind::all()
                        .iter()
                        .filter_map(|kind| m.legacy_zone(*kind).map(|d| (*kind, d)))
                        .map(|(kind, document)| Ok((kind, json(document)?)))
                        .collect::<Result<_>>()?,
                    delivery_radius_m: m.delivery_radius_m(),
                    max_delivery_radius_m: m.max_delivery_radius_m(),
                })
            })
            .collect::<Result<_>>()?,
    };

    let data = postcard::to_allocvec(&image).map_err(|e| LocationError::Snapshot(e.to_string()))?;
    let mut file = File::create(path)?;
    file.write_all(MAGIC)?;
    file.write_all(&[VERSION])?;
    let mut writer = zstd::Encoder::new(file, 0)?;
    writer.write_all(&data)?;
    writer.finish()?;
    Ok(())
}

pub fn load(path: &Path) -> Result<LocationStore> {
    let bytes = read(path)?;
    if bytes.len() < 5 || &bytes[0..4] != MAGIC {
        return Err(LocationError::Snapshot("not a location snapshot".into()));
    }
    if bytes[4] != VERSION {
        return Err(LocationError::Snapshot(format!(
            "unsupported snapshot version {}",
            bytes[4]
        )));
    }

    let data = zstd::decode_all(&bytes[5..])?;
    let image: StoreImage =
        postcard::from_bytes(&data).map_err(|e| LocationError::Snapshot(e.to_string()))?;

    let mut store = LocationStore::new();
    for address in &image.addresses {
        let id = _model::AddressId(address.id);
        store.add_address(id, &address.label)?;
        if let (Some(lat), Some(lng)) = (address.lat, address.lng) {
            store.set_address_location(id, lat, lng)?;
        }
    }
    for merchant in &image.merchants {
        let id = _model::MerchantId(merchant.id);
        store.add_merchant(id, &merchant.name)?;
        store.set_active(id, merchant.active)?;
        store.set_delivery_radius(id, merchant.delivery_radius_m, merchant.max_delivery_radius_m)?;
        if let (Some(lat), Some(lng)) = (merchant.lat, merchant.lng) {
            store.set_location(id, lat, lng)?;
        }
        if let Some(address) = merchant.active_address {
            store.set_active_address(id, Some(_model::AddressId(address)))?;
        }
        for (kind, text) in &merchant.zones {
            store.set_zone(id, *kind, &unjson(text)?)?;
        }
        for (kind, text) in &merchant.legacy_zones {
            store.stash_legacy_zone(id, *kind, unjson(text)?)?;
        }
    }
    Ok(store)
}

fn json(document: &GeoDocument) -> Result<String> {
    serde_json::to_string(document).map_err(|e| LocationError::Snapshot(e.to_string()))
}

fn unjson(text: &str) -> Result<GeoDocument> {
    serde_json::from_str(text).map_err(|e| LocationError::Snapshot(e.to_string()))
}
