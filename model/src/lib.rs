use clap::ValueEnum;
use serde_repr::{Deserialize_repr, Serialize_repr};

mod id;

pub use id::{AddressId, MerchantId};

#[derive(
    Debug, Clone, Copy, Serialize_repr, Deserialize_repr, ValueEnum, PartialEq, Eq, PartialOrd, Ord,
)]
#[repr(u8)]
pub enum ZoneKind {
    ServiceArea = 0,
    PriorityZones,
    RestrictedAreas,
    DeliveryZones,
}

impl ZoneKind {
    pub fn all() -> [ZoneKind; 4] {
        [
            Self::ServiceArea,
            Self::PriorityZones,
            Self::RestrictedAreas,
            Self::DeliveryZones,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::ServiceArea => "service-area",
            Self::PriorityZones => "priority-zones",
            Self::RestrictedAreas => "restricted-areas",
            Self::DeliveryZones => "delivery-zones",
        }
    }
}
