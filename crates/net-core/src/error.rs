//! Error types for topology validation

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use nettopo_shared_types::{BondMode, ProviderNetType, VlanRange};
use serde::Serialize;
use thiserror::Error;

use crate::bond::member_requirement;
use crate::types::{MTU_RANGE, VLAN_ID_RANGE};

/// Main error type returned by the validation entry points
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Property store error: {0}")]
    Store(#[from] StoreError),
}

impl NetworkError {
    /// The violated invariant, if this is a validation failure
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            NetworkError::Validation(err) => Some(err),
            NetworkError::Store(_) => None,
        }
    }
}

/// Failures reading the property store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Property {key} unavailable: {reason}")]
    Unavailable { key: String, reason: String },
}

/// Coarse classification of validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MalformedInput,
    MissingField,
    WrongType,
    InvalidName,
    OutOfRange,
    DuplicateMapping,
    StructuralConflict,
    OverlapConflict,
    CrossReferenceMissing,
    HomogeneityViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// First violated invariant found by a validation pass
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    // Input shape
    #[error("Invalid {context}: {reason}")]
    MalformedInput { context: String, reason: String },

    #[error("Missing {field} configuration in {context}")]
    MissingField { context: String, field: String },

    #[error("Invalid {field} value in {context}: expected {expected}")]
    WrongType {
        context: String,
        field: String,
        expected: &'static str,
    },

    #[error("Invalid {field} address {value} in {context}")]
    InvalidAddress {
        context: String,
        field: String,
        value: String,
    },

    #[error("Invalid {network} vlan_ranges format: {value}")]
    InvalidVlanRanges { network: String, value: String },

    #[error("Invalid {option} value {value} in {profile}, valid options: mode=active-backup, mode=lacp, mode=lacp-layer34")]
    InvalidBondingOptions {
        profile: String,
        option: String,
        value: String,
    },

    #[error("Invalid provider network type {value} for interface {interface}, valid types: caas, ovs, ovs-dpdk, ovs-offload-sriov, ovs-offload-virtio")]
    InvalidProviderType { interface: String, value: String },

    #[error("Invalid sr-iov network type {value} for network {network}, valid types: caas, openstack")]
    InvalidSriovType { network: String, value: String },

    // Naming
    #[error("Invalid interface name {name} in {context}")]
    InvalidInterfaceName { context: String, name: String },

    #[error("Too long interface name {name} in {context}, max {max} chars")]
    InterfaceNameTooLong {
        context: String,
        name: String,
        max: usize,
    },

    #[error("Interface in {context} cannot be vlan interface: {name}")]
    VlanInterface { context: String, name: String },

    #[error("Invalid bonding interface name {name} in {context}")]
    NotBondName { context: String, name: String },

    #[error("Invalid {context} name {name}: {reason}")]
    InvalidName {
        context: String,
        name: String,
        reason: String,
    },

    // Ranges
    #[error("Invalid {context} vlan {vlan}: not in range {} - {}", VLAN_ID_RANGE.start(), VLAN_ID_RANGE.end())]
    VlanOutOfRange { context: String, vlan: i64 },

    #[error("Invalid {context} mtu {mtu}: not in range {} - {}", MTU_RANGE.start(), MTU_RANGE.end())]
    MtuOutOfRange { context: String, mtu: i64 },

    #[error("Invalid {field} value {value} in {context}: must be positive integer")]
    NotPositive {
        context: String,
        field: String,
        value: i64,
    },

    #[error("Too many DNS server IP addresses ({count}), max {max} supported")]
    TooManyDns { count: usize, max: usize },

    #[error("Invalid {network} vlan range {range}: end is lower than start")]
    InvertedVlanRange { network: String, range: VlanRange },

    #[error("{field} {address} in {context} is not inside {cidr}")]
    AddressOutsideCidr {
        context: String,
        field: String,
        address: String,
        cidr: IpNet,
    },

    #[error("{field} {address} in {context} must not be inside IP range {start} - {end}")]
    AddressInsideRange {
        context: String,
        field: String,
        address: String,
        start: String,
        end: String,
    },

    #[error("Invalid IP range {start} - {end} in {context}")]
    InvalidIpRange {
        context: String,
        start: String,
        end: String,
    },

    #[error("IP range {start} - {end} of {network} in {domain} does not contain {required} addresses")]
    IpRangeTooSmall {
        network: String,
        domain: String,
        start: String,
        end: String,
        required: u128,
    },

    // Duplicates
    #[error("Network {network} mapped to multiple interfaces in {profile}")]
    DuplicateNetworkMapping { profile: String, network: String },

    #[error("Interface {interface} mapped to multiple bond interfaces in {profile}")]
    BondMemberConflict { profile: String, interface: String },

    #[error("Network physical interface {interface} mapped also as part of bond in {profile}")]
    SlaveAlsoDirectlyMapped { profile: String, interface: String },

    #[error("Interface {interface} mapped to multiple SR-IOV networks in {profile}")]
    SriovInterfaceConflict { profile: String, interface: String },

    #[error("Same VLAN ID {vlan} used for multiple infra networks in network domain {domain}")]
    DuplicateInfraVlan { domain: String, vlan: i64 },

    #[error("Network {network} listed more than once in {context}")]
    DuplicateCaasNetwork { context: String, network: String },

    // Structure
    #[error("Interface in {context} cannot be bond interface: {name}")]
    BondAsMember { context: String, name: String },

    #[error("Invalid bonding slave interface count {count} for {bond} in {profile}, {} required with {mode}", member_requirement(*.mode))]
    BondMemberCount {
        profile: String,
        bond: String,
        mode: BondMode,
        count: usize,
    },

    #[error("Multiple untagged networks on interface {interface} in {profile} (network domain {domain})")]
    MultipleUntaggedNetworks {
        profile: String,
        interface: String,
        domain: String,
    },

    #[error("Untagged network {network} in {profile} has too small MTU {mtu}, VLAN tagged networks with MTU {vlan_mtu} exist on the same interface")]
    UntaggedMtuTooSmall {
        profile: String,
        network: String,
        mtu: i64,
        vlan_mtu: i64,
    },

    #[error("Cannot have both {first} and {second} types of provider networks in {profile}")]
    ProviderTypeConflict {
        profile: String,
        first: ProviderNetType,
        second: ProviderNetType,
    },

    #[error("Cannot have both {provider_type} and sr-iov on interface {interface} in {profile}")]
    SriovTypeConflict {
        profile: String,
        interface: String,
        provider_type: ProviderNetType,
    },

    #[error("SR-IOV interface {interface} in {profile} is part of {bond}: bonding mode mode=lacp not supported with SR-IOV networks")]
    SriovLacpConflict {
        profile: String,
        interface: String,
        bond: String,
    },

    #[error("SR-IOV network {network} MTU {mtu} cannot be greater than interface {interface} MTU {interface_mtu}")]
    SriovMtuTooLarge {
        network: String,
        mtu: i64,
        interface: String,
        interface_mtu: i64,
    },

    #[error("Unsupported sharing of interface {interface} in {profile}: {reason}")]
    UnsupportedInterfaceSharing {
        profile: String,
        interface: String,
        reason: String,
    },

    #[error("Provider and infra networks on the same interface in {profile}: supported only if all networks are on the same interface")]
    SingleNicViolation { profile: String },

    #[error("Provider and infra networks on the same interface in {profile}: not supported for {provider_type} type of provider networks")]
    SingleNicProviderType {
        profile: String,
        provider_type: ProviderNetType,
    },

    #[error("Sharing untagged infra network and provider network {network} not supported in {profile}")]
    UntaggedInfraProviderConflict { profile: String, network: String },

    #[error("Misplaced MTU inside provider_network_interfaces interface {interface} in {profile}")]
    MisplacedMtu { profile: String, interface: String },

    #[error("Misplaced MTU inside {network} network domain {domain}")]
    MtuInsideNetworkDomain { network: String, domain: String },

    #[error("Gateway address not supported for {network} in network domain {domain}")]
    GatewayNotSupported { network: String, domain: String },

    #[error("Default route not supported for {network} {domain}")]
    DefaultRoute { network: String, domain: String },

    #[error("Only one provider network can be configured as shared, found {first} and {second}")]
    SharedProviderNetworks { first: String, second: String },

    #[error("Host {host} must declare exactly one network profile, found {count}")]
    InvalidProfileCount { host: String, count: usize },

    #[error("{network} is mapped for {host} without the management service profile")]
    UnexpectedNetworkMapping { host: String, network: String },

    #[error("Missing {profile} service profile on {host}: {reason}")]
    MissingServiceProfile {
        host: String,
        profile: String,
        reason: String,
    },

    #[error("No management or caas_master node defined")]
    NoManagementNode,

    #[error("Unexpected number of {role} nodes {count}, 1 or 3 supported")]
    UnexpectedNodeCount { role: String, count: usize },

    #[error("Management node {host} is in network domain {domain}, expected {expected} like the other management nodes")]
    ManagementDomainMismatch {
        host: String,
        domain: String,
        expected: String,
    },

    #[error("Not enough storage nodes ({count}) for 3 management nodes, at least 2 required")]
    NotEnoughStorageNodes { count: usize },

    // Overlaps
    #[error("Provider network vlan ranges of {first} and {second} conflicting on interface {interface} in {profile}")]
    ProviderVlanOverlap {
        profile: String,
        interface: String,
        first: String,
        second: String,
    },

    #[error("Provider network {network} vlan ranges {first} and {second} are overlapping")]
    VlanRangesOverlapping {
        network: String,
        first: VlanRange,
        second: VlanRange,
    },

    #[error("Network CIDR values {first} and {second} are overlapping")]
    CidrsOverlapping { first: IpNet, second: IpNet },

    #[error("Provider network {network} vlan range is conflicting with infra network vlan {vlan} in {profile}")]
    InfraProviderVlanConflict {
        profile: String,
        network: String,
        vlan: i64,
    },

    #[error("SR-IOV network {network} vlan range is conflicting with infra network vlan {vlan} in {profile}")]
    SriovInfraVlanConflict {
        profile: String,
        network: String,
        vlan: i64,
    },

    #[error("SR-IOV network {network} vlan range is conflicting with other provider network vlan in {profile}")]
    SriovProviderVlanConflict { profile: String, network: String },

    #[error("CIDR {cidr} configured for docker0_cidr overlaps with {other} of {network}")]
    Docker0CidrOverlap {
        cidr: IpNet,
        network: String,
        other: IpNet,
    },

    // Cross references
    #[error("Missing {network} network definition used in {context}")]
    MissingNetworkDefinition { context: String, network: String },

    #[error("{network} does not contain {domain} network domain configuration")]
    MissingNetworkDomain { network: String, domain: String },

    #[error("Missing bonding interface definition for {bond} in {profile}")]
    MissingBondDefinition { profile: String, bond: String },

    #[error("Missing provider network {network} definition used in {context}")]
    MissingProviderNetwork { context: String, network: String },

    #[error("Unknown network profile {profile} for {host}")]
    UnknownProfile { host: String, profile: String },

    #[error("Unknown storage profile {profile} for {host}")]
    UnknownStorageProfile { host: String, profile: String },

    #[error("{network} is not mapped for {host}")]
    NetworkNotMapped { host: String, network: String },

    #[error("Hosts {host} and {other} have duplicated preallocated IP address {address}")]
    DuplicatePreallocatedIp {
        host: String,
        other: String,
        address: IpAddr,
    },

    // Homogeneity
    #[error("CaaS network {network} mapped to interface {interface} in host {host} and interface {expected} in another host")]
    InconsistentNetworkWiring {
        network: String,
        host: String,
        interface: String,
        expected: String,
    },

    #[error("CaaS network {network} missing from host {host}")]
    NetworkMissingFromHost { network: String, host: String },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        use ValidationError::*;

        match self {
            MalformedInput { .. } => ErrorKind::MalformedInput,
            MissingField { .. } => ErrorKind::MissingField,
            WrongType { .. }
            | InvalidAddress { .. }
            | InvalidVlanRanges { .. }
            | InvalidBondingOptions { .. }
            | InvalidProviderType { .. }
            | InvalidSriovType { .. } => ErrorKind::WrongType,
            InvalidInterfaceName { .. }
            | InterfaceNameTooLong { .. }
            | VlanInterface { .. }
            | NotBondName { .. }
            | InvalidName { .. } => ErrorKind::InvalidName,
            VlanOutOfRange { .. }
            | MtuOutOfRange { .. }
            | NotPositive { .. }
            | TooManyDns { .. }
            | InvertedVlanRange { .. }
            | AddressOutsideCidr { .. }
            | AddressInsideRange { .. }
            | InvalidIpRange { .. }
            | IpRangeTooSmall { .. } => ErrorKind::OutOfRange,
            DuplicateNetworkMapping { .. }
            | BondMemberConflict { .. }
            | SlaveAlsoDirectlyMapped { .. }
            | SriovInterfaceConflict { .. }
            | DuplicateInfraVlan { .. }
            | DuplicateCaasNetwork { .. }
            | DuplicatePreallocatedIp { .. } => ErrorKind::DuplicateMapping,
            BondAsMember { .. }
            | BondMemberCount { .. }
            | MultipleUntaggedNetworks { .. }
            | UntaggedMtuTooSmall { .. }
            | ProviderTypeConflict { .. }
            | SriovTypeConflict { .. }
            | SriovLacpConflict { .. }
            | SriovMtuTooLarge { .. }
            | UnsupportedInterfaceSharing { .. }
            | SingleNicViolation { .. }
            | SingleNicProviderType { .. }
            | UntaggedInfraProviderConflict { .. }
            | MisplacedMtu { .. }
            | MtuInsideNetworkDomain { .. }
            | GatewayNotSupported { .. }
            | DefaultRoute { .. }
            | SharedProviderNetworks { .. }
            | InvalidProfileCount { .. }
            | UnexpectedNetworkMapping { .. }
            | MissingServiceProfile { .. }
            | NoManagementNode
            | UnexpectedNodeCount { .. }
            | ManagementDomainMismatch { .. }
            | NotEnoughStorageNodes { .. } => ErrorKind::StructuralConflict,
            ProviderVlanOverlap { .. }
            | VlanRangesOverlapping { .. }
            | CidrsOverlapping { .. }
            | InfraProviderVlanConflict { .. }
            | SriovInfraVlanConflict { .. }
            | SriovProviderVlanConflict { .. }
            | Docker0CidrOverlap { .. } => ErrorKind::OverlapConflict,
            MissingNetworkDefinition { .. }
            | MissingNetworkDomain { .. }
            | MissingBondDefinition { .. }
            | MissingProviderNetwork { .. }
            | UnknownProfile { .. }
            | UnknownStorageProfile { .. }
            | NetworkNotMapped { .. } => ErrorKind::CrossReferenceMissing,
            InconsistentNetworkWiring { .. } | NetworkMissingFromHost { .. } => {
                ErrorKind::HomogeneityViolation
            }
        }
    }

    /// Name of the profile, network, domain or host the failure is about
    pub fn context(&self) -> String {
        use ValidationError::*;

        match self {
            MalformedInput { context, .. }
            | MissingField { context, .. }
            | WrongType { context, .. }
            | InvalidAddress { context, .. }
            | InvalidInterfaceName { context, .. }
            | InterfaceNameTooLong { context, .. }
            | VlanInterface { context, .. }
            | NotBondName { context, .. }
            | InvalidName { context, .. }
            | VlanOutOfRange { context, .. }
            | MtuOutOfRange { context, .. }
            | NotPositive { context, .. }
            | AddressOutsideCidr { context, .. }
            | AddressInsideRange { context, .. }
            | InvalidIpRange { context, .. }
            | DuplicateCaasNetwork { context, .. }
            | BondAsMember { context, .. }
            | MissingNetworkDefinition { context, .. }
            | MissingProviderNetwork { context, .. } => context.clone(),
            InvalidBondingOptions { profile, .. }
            | DuplicateNetworkMapping { profile, .. }
            | BondMemberConflict { profile, .. }
            | SlaveAlsoDirectlyMapped { profile, .. }
            | SriovInterfaceConflict { profile, .. }
            | BondMemberCount { profile, .. }
            | MultipleUntaggedNetworks { profile, .. }
            | UntaggedMtuTooSmall { profile, .. }
            | ProviderTypeConflict { profile, .. }
            | SriovTypeConflict { profile, .. }
            | SriovLacpConflict { profile, .. }
            | UnsupportedInterfaceSharing { profile, .. }
            | SingleNicViolation { profile }
            | SingleNicProviderType { profile, .. }
            | UntaggedInfraProviderConflict { profile, .. }
            | MisplacedMtu { profile, .. }
            | ProviderVlanOverlap { profile, .. }
            | InfraProviderVlanConflict { profile, .. }
            | SriovInfraVlanConflict { profile, .. }
            | SriovProviderVlanConflict { profile, .. }
            | MissingBondDefinition { profile, .. } => profile.clone(),
            InvalidVlanRanges { network, .. }
            | InvalidSriovType { network, .. }
            | InvertedVlanRange { network, .. }
            | SriovMtuTooLarge { network, .. }
            | MtuInsideNetworkDomain { network, .. }
            | GatewayNotSupported { network, .. }
            | DefaultRoute { network, .. }
            | VlanRangesOverlapping { network, .. }
            | IpRangeTooSmall { network, .. }
            | MissingNetworkDomain { network, .. }
            | Docker0CidrOverlap { network, .. } => network.clone(),
            InvalidProviderType { interface, .. } => interface.clone(),
            DuplicateInfraVlan { domain, .. } => domain.clone(),
            CidrsOverlapping { first, .. } => first.to_string(),
            TooManyDns { .. } => "dns".to_string(),
            SharedProviderNetworks { .. } => "provider_networks".to_string(),
            NoManagementNode => "hosts".to_string(),
            NotEnoughStorageNodes { .. } => "storage".to_string(),
            UnexpectedNodeCount { role, .. } => role.clone(),
            InvalidProfileCount { host, .. }
            | UnexpectedNetworkMapping { host, .. }
            | MissingServiceProfile { host, .. }
            | ManagementDomainMismatch { host, .. }
            | DuplicatePreallocatedIp { host, .. }
            | UnknownProfile { host, .. }
            | UnknownStorageProfile { host, .. }
            | NetworkNotMapped { host, .. }
            | InconsistentNetworkWiring { host, .. }
            | NetworkMissingFromHost { host, .. } => host.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_context() {
        let err = ValidationError::DuplicateInfraVlan {
            domain: "rack-1".to_string(),
            vlan: 200,
        };
        assert_eq!(err.kind(), ErrorKind::DuplicateMapping);
        assert_eq!(err.context(), "rack-1");
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_bond_member_count_message() {
        let err = ValidationError::BondMemberCount {
            profile: "compute".to_string(),
            bond: "bond0".to_string(),
            mode: BondMode::ActiveBackup,
            count: 3,
        };
        assert_eq!(err.kind(), ErrorKind::StructuralConflict);
        assert!(err.to_string().contains("exactly two interfaces"));
        assert!(err.to_string().contains("mode=active-backup"));
    }

    #[test]
    fn test_network_error_wrapping() {
        let err: NetworkError = ValidationError::NetworkMissingFromHost {
            network: "caas-tenant".to_string(),
            host: "worker-3".to_string(),
        }
        .into();
        assert_eq!(
            err.as_validation().map(ValidationError::kind),
            Some(ErrorKind::HomogeneityViolation)
        );
    }
}
