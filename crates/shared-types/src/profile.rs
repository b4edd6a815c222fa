use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;

/// Bonding mode declared through `*_bonding_options`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondMode {
    #[serde(rename = "mode=active-backup")]
    ActiveBackup,
    #[serde(rename = "mode=lacp")]
    Lacp,
    #[serde(rename = "mode=lacp-layer34")]
    LacpLayer34,
}

impl BondMode {
    pub const ALL: [BondMode; 3] = [BondMode::ActiveBackup, BondMode::Lacp, BondMode::LacpLayer34];

    pub fn option_str(&self) -> &'static str {
        match self {
            BondMode::ActiveBackup => "mode=active-backup",
            BondMode::Lacp => "mode=lacp",
            BondMode::LacpLayer34 => "mode=lacp-layer34",
        }
    }

    /// Any 802.3ad flavour
    pub fn is_lacp(&self) -> bool {
        matches!(self, BondMode::Lacp | BondMode::LacpLayer34)
    }
}

impl fmt::Display for BondMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_str())
    }
}

impl FromStr for BondMode {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mode=active-backup" | "active-backup" => Ok(BondMode::ActiveBackup),
            "mode=lacp" | "lacp" => Ok(BondMode::Lacp),
            "mode=lacp-layer34" | "lacp-layer34" => Ok(BondMode::LacpLayer34),
            other => Err(SharedTypeError::Unsupported(other.to_string())),
        }
    }
}

/// Which bonding implementation drives a bond: the kernel or Open vSwitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondingKind {
    Linux,
    Ovs,
}

impl BondingKind {
    pub fn option_key(&self) -> &'static str {
        match self {
            BondingKind::Linux => "linux_bonding_options",
            BondingKind::Ovs => "ovs_bonding_options",
        }
    }
}

/// Type of a provider network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderNetType {
    #[serde(rename = "caas")]
    Caas,
    #[serde(rename = "ovs")]
    Ovs,
    #[serde(rename = "ovs-dpdk")]
    OvsDpdk,
    #[serde(rename = "ovs-offload-sriov")]
    OvsOffloadSriov,
    #[serde(rename = "ovs-offload-virtio")]
    OvsOffloadVirtio,
}

impl ProviderNetType {
    pub const ALL: [ProviderNetType; 5] = [
        ProviderNetType::Caas,
        ProviderNetType::Ovs,
        ProviderNetType::OvsDpdk,
        ProviderNetType::OvsOffloadSriov,
        ProviderNetType::OvsOffloadVirtio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderNetType::Caas => "caas",
            ProviderNetType::Ovs => "ovs",
            ProviderNetType::OvsDpdk => "ovs-dpdk",
            ProviderNetType::OvsOffloadSriov => "ovs-offload-sriov",
            ProviderNetType::OvsOffloadVirtio => "ovs-offload-virtio",
        }
    }

    /// CaaS interfaces are bonded by the kernel, everything else by OVS
    pub fn bonding_kind(&self) -> BondingKind {
        match self {
            ProviderNetType::Caas => BondingKind::Linux,
            _ => BondingKind::Ovs,
        }
    }
}

impl fmt::Display for ProviderNetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderNetType {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderNetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SharedTypeError::Unsupported(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SriovType {
    #[serde(rename = "caas")]
    Caas,
    #[serde(rename = "openstack")]
    Openstack,
}

impl SriovType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SriovType::Caas => "caas",
            SriovType::Openstack => "openstack",
        }
    }
}

impl fmt::Display for SriovType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SriovType {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caas" => Ok(SriovType::Caas),
            "openstack" => Ok(SriovType::Openstack),
            other => Err(SharedTypeError::Unsupported(other.to_string())),
        }
    }
}

/// Entry of `provider_network_interfaces`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderNetAttachment {
    pub net_type: ProviderNetType,
    pub provider_networks: Vec<String>,
    pub vf_count: Option<i64>,
    pub dpdk_max_rx_queues: Option<i64>,
    /// MTU is derived from the provider networks and must not be set here
    #[serde(default)]
    pub mtu_declared: bool,
}

impl ProviderNetAttachment {
    pub fn new(net_type: ProviderNetType, provider_networks: Vec<String>) -> Self {
        Self {
            net_type,
            provider_networks,
            vf_count: None,
            dpdk_max_rx_queues: None,
            mtu_declared: false,
        }
    }
}

/// Entry of `sriov_provider_networks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SriovAttachment {
    pub sriov_type: Option<SriovType>,
    pub trusted: Option<bool>,
    pub vf_count: Option<i64>,
    pub interfaces: Vec<String>,
}

impl SriovAttachment {
    pub fn new(interfaces: Vec<String>) -> Self {
        Self {
            sriov_type: None,
            trusted: None,
            vf_count: None,
            interfaces,
        }
    }

    /// Untyped SR-IOV networks default to the OpenStack flavour
    pub fn effective_type(&self) -> SriovType {
        self.sriov_type.unwrap_or(SriovType::Openstack)
    }
}

/// Per-host wiring template (`cloud.network_profiles` entry)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub name: String,
    #[serde(default)]
    pub interface_net_mapping: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub bonding_interfaces: IndexMap<String, Vec<String>>,
    pub linux_bonding_options: Option<BondMode>,
    pub ovs_bonding_options: Option<BondMode>,
    #[serde(default)]
    pub provider_network_interfaces: IndexMap<String, ProviderNetAttachment>,
    #[serde(default)]
    pub sriov_provider_networks: IndexMap<String, SriovAttachment>,
}

impl NetworkProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Bond that enslaves `iface`, if any
    pub fn bond_of(&self, iface: &str) -> Option<&str> {
        self.bonding_interfaces
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == iface))
            .map(|(bond, _)| bond.as_str())
    }

    /// Interface that actually carries traffic for `iface`: its bond, or itself
    pub fn master_of<'a>(&'a self, iface: &'a str) -> &'a str {
        self.bond_of(iface).unwrap_or(iface)
    }

    pub fn bonding_mode(&self, kind: BondingKind) -> Option<BondMode> {
        match kind {
            BondingKind::Linux => self.linux_bonding_options,
            BondingKind::Ovs => self.ovs_bonding_options,
        }
    }

    /// Bonding implementation used for `iface`: provider interfaces decide by
    /// their type, pure infra interfaces are kernel bonds.
    pub fn bonding_kind_for(&self, iface: &str) -> BondingKind {
        self.provider_network_interfaces
            .get(iface)
            .map(|attachment| attachment.net_type.bonding_kind())
            .unwrap_or(BondingKind::Linux)
    }

    pub fn has_provider_type(&self, net_type: ProviderNetType) -> bool {
        self.provider_network_interfaces
            .values()
            .any(|attachment| attachment.net_type == net_type)
    }

    /// Interface an infra network is mapped to
    pub fn interface_of_network(&self, network: &str) -> Option<&str> {
        self.interface_net_mapping
            .iter()
            .find(|(_, nets)| nets.iter().any(|n| n == network))
            .map(|(iface, _)| iface.as_str())
    }

    pub fn maps_network(&self, network: &str) -> bool {
        self.interface_of_network(network).is_some()
    }

    /// `caas`-typed provider interface carrying `network`
    pub fn caas_provider_interface(&self, network: &str) -> Option<&str> {
        self.provider_network_interfaces
            .iter()
            .find(|(_, attachment)| {
                attachment.net_type == ProviderNetType::Caas
                    && attachment.provider_networks.iter().any(|n| n == network)
            })
            .map(|(iface, _)| iface.as_str())
    }

    /// Interfaces of a `caas`-typed SR-IOV network
    pub fn caas_sriov_interfaces(&self, network: &str) -> Option<&[String]> {
        self.sriov_provider_networks
            .get(network)
            .filter(|sriov| sriov.effective_type() == SriovType::Caas)
            .map(|sriov| sriov.interfaces.as_slice())
    }
}
