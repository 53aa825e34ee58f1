//! Write-time planning for the location columns. Every mutation that can
//! change a record's authoritative coordinates runs through `plan` before it
//! touches anything: the scalar pair, both derived representations, and the
//! index entry then change together or not at all.

use crate::codec::{self, GeoDocument, SpatialPoint};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPlan {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub document: Option<GeoDocument>,
    pub point: Option<SpatialPoint>,
}

/// Partial pairs are treated as absent.
pub(crate) fn resolve(lat: Option<f64>, lng: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (lat, lng) {
        (Some(lat), Some(lng)) => (Some(lat), Some(lng)),
        _ => (None, None),
    }
}

/// Derived representations for a scalar pair: present only when the pair is
/// present, in range, and clear of the zero sentinel.
pub(crate) fn derive(
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<(Option<GeoDocument>, Option<SpatialPoint>)> {
    match resolve(lat, lng) {
        (Some(lat), Some(lng)) if !codec::is_unset(lat, lng) => Ok((
            Some(codec::point_document(lat, lng)?),
            Some(codec::spatial_point(lat, lng)?),
        )),
        _ => Ok((None, None)),
    }
}

/// Decide what a coordinate write must change. `None` means the incoming pair
/// equals the stored pair value-for-value and nothing fires. Validation
/// failures propagate before any field is written.
pub(crate) fn plan(
    stored: (Option<f64>, Option<f64>),
    incoming: (Option<f64>, Option<f64>),
) -> Result<Option<LocationPlan>> {
    let incoming = resolve(incoming.0, incoming.1);
    if resolve(stored.0, stored.1) == incoming {
        return Ok(None);
    }

    let (lat, lng) = incoming;
    let (document, point) = derive(lat, lng)?;
    Ok(Some(LocationPlan {
        lat,
        lng,
        document,
        point,
    }))
}
