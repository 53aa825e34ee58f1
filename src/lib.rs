//! Storage-and-consistency substrate for merchant locations: one coordinate
//! pair kept identical across its scalar, document, and native spatial
//! representations, plus the indexed proximity queries built on the native
//! one.

pub mod codec;
pub mod error;
mod guard;
pub mod index;
pub mod query;
pub mod snapshot;
pub mod store;

pub use codec::{GeoDocument, SpatialPoint, ZoneGeometry, WGS84};
pub use error::{LocationError, Result};
pub use store::{
    AddressRecord, ImportOutcome, ImportRecord, Inconsistency, LocationSource, LocationStore,
    MerchantRecord,
};
