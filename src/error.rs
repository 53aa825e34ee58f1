use _model::{AddressId, MerchantId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocationError {
    /// Latitude/longitude out of range or non-finite.
    #[error("invalid coordinate: lat {lat}, lng {lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// A geometry document does not match any accepted shape.
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),

    /// A native value arrived tagged with a reference system other than 4326.
    /// Never silently reprojected.
    #[error("reference system mismatch: srid {srid}")]
    ReferenceSystemMismatch { srid: u32 },

    /// A derived representation disagrees with its scalar source. Indicates a
    /// write that bypassed the store; a data-integrity bug, not recoverable.
    #[error("index inconsistency: {0}")]
    IndexInconsistency(String),

    #[error("unknown {0:?}")]
    UnknownMerchant(MerchantId),

    #[error("unknown {0:?}")]
    UnknownAddress(AddressId),

    #[error("{0:?} already exists")]
    DuplicateMerchant(MerchantId),

    #[error("{0:?} already exists")]
    DuplicateAddress(AddressId),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LocationError>;
