pub mod caas;
pub mod error;
pub mod host;
pub mod network;
pub mod profile;
pub mod storage;

pub use caas::CaasConfig;
pub use error::{SharedResult, SharedTypeError};
pub use host::{Host, ServiceProfile};
pub use network::{
    DomainInstance, InfraNetwork, InfraRole, Networking, ProviderNetwork, Route, VlanRange,
    DEFAULT_MTU,
};
pub use profile::{
    BondMode, BondingKind, NetworkProfile, ProviderNetAttachment, ProviderNetType,
    SriovAttachment, SriovType,
};
pub use storage::StorageProfile;
