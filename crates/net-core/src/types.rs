//! Core topology types and limits

use std::ops::RangeInclusive;

use crate::error::ValidationError;
use nettopo_shared_types::SharedTypeError;

pub use nettopo_shared_types::{
    BondMode, BondingKind, CaasConfig, DomainInstance, Host, InfraNetwork, InfraRole,
    NetworkProfile, Networking, ProviderNetAttachment, ProviderNetType, ProviderNetwork, Route,
    ServiceProfile, SriovAttachment, SriovType, StorageProfile, VlanRange, DEFAULT_MTU,
};

/// Usable 802.1Q VLAN IDs
pub const VLAN_ID_RANGE: RangeInclusive<i64> = 2..=4094;

/// Accepted MTU values
pub const MTU_RANGE: RangeInclusive<i64> = 1280..=9000;

/// Maximum number of DNS servers
pub const MAX_DNS_SERVERS: usize = 2;

/// Kernel limit on interface names
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Maximum length of network and network domain names
pub const MAX_NETWORK_NAME_LEN: usize = 64;

/// Regex for valid interface names
pub const INTERFACE_NAME_REGEX: &str = r"^[a-z][0-9a-z]+$";

/// Regex for bonding interface names
pub const BOND_NAME_REGEX: &str = r"^bond[0-9]+$";

/// Regex for network and network domain names
pub const NETWORK_NAME_REGEX: &str = r"^[a-zA-Z][0-9a-zA-Z_-]+[0-9a-zA-Z]$";

/// Regex for host names
pub const HOSTNAME_REGEX: &str = r"^[\da-z][\da-z-]*$";

/// DNS label limit on host names
pub const MAX_HOSTNAME_LEN: usize = 63;

impl ValidationError {
    /// Attach the parsing context to a shared type parse failure
    pub fn from_shared(context: &str, err: SharedTypeError) -> Self {
        match err {
            SharedTypeError::InvalidValue { field, value } => ValidationError::WrongType {
                context: context.to_string(),
                field: format!("{field} {value}"),
                expected: "a valid value",
            },
            SharedTypeError::ParseError(message) => ValidationError::MalformedInput {
                context: context.to_string(),
                reason: message,
            },
            SharedTypeError::Unsupported(value) => ValidationError::WrongType {
                context: context.to_string(),
                field: value,
                expected: "a supported value",
            },
        }
    }
}
