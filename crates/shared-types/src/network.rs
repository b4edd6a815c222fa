use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use indexmap::IndexMap;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{SharedResult, SharedTypeError};

/// MTU applied to networks that do not declare one and have no global default.
pub const DEFAULT_MTU: i64 = 1500;

/// Fixed roles an infra network can play in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InfraRole {
    #[serde(rename = "infra_internal")]
    Internal,
    #[serde(rename = "infra_external")]
    External,
    #[serde(rename = "infra_storage_cluster")]
    StorageCluster,
    #[serde(rename = "caas_oam")]
    CaasOam,
}

impl InfraRole {
    pub const ALL: [InfraRole; 4] = [
        InfraRole::Internal,
        InfraRole::External,
        InfraRole::StorageCluster,
        InfraRole::CaasOam,
    ];

    /// Key of the network in the `cloud.networking` document
    pub fn network_name(&self) -> &'static str {
        match self {
            InfraRole::Internal => "infra_internal",
            InfraRole::External => "infra_external",
            InfraRole::StorageCluster => "infra_storage_cluster",
            InfraRole::CaasOam => "caas_oam",
        }
    }

    /// Every cluster needs this network; storage cluster is optional
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, InfraRole::StorageCluster)
    }

    /// External and OAM networks route off-cluster and need a gateway,
    /// the others must not declare one.
    pub fn requires_gateway(&self) -> bool {
        matches!(self, InfraRole::External | InfraRole::CaasOam)
    }
}

impl fmt::Display for InfraRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.network_name())
    }
}

impl FromStr for InfraRole {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InfraRole::ALL
            .into_iter()
            .find(|role| role.network_name() == s)
            .ok_or_else(|| SharedTypeError::Unsupported(s.to_string()))
    }
}

/// Static route declared inside a network domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub to: IpNet,
    pub via: IpAddr,
}

/// One instantiation of an infra network inside a network domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainInstance {
    pub name: String,
    pub cidr: IpNet,
    pub vlan: Option<i64>,
    pub gateway: Option<IpAddr>,
    pub ip_range_start: Option<IpAddr>,
    pub ip_range_end: Option<IpAddr>,
    #[serde(default)]
    pub routes: Vec<Route>,
    /// MTU is only legal at network level; kept here so the checker can reject it
    pub mtu: Option<i64>,
}

impl DomainInstance {
    pub fn new(name: impl Into<String>, cidr: IpNet) -> Self {
        Self {
            name: name.into(),
            cidr,
            vlan: None,
            gateway: None,
            ip_range_start: None,
            ip_range_end: None,
            routes: Vec::new(),
            mtu: None,
        }
    }

    pub fn is_tagged(&self) -> bool {
        self.vlan.is_some()
    }

    /// First allocatable address: declared start or the second address of the CIDR
    pub fn range_start(&self) -> IpAddr {
        self.ip_range_start
            .unwrap_or_else(|| offset_addr(self.cidr.network(), 1))
    }

    /// Last allocatable address: declared end or the second to last address of the CIDR
    pub fn range_end(&self) -> IpAddr {
        self.ip_range_end
            .unwrap_or_else(|| offset_addr(self.cidr.broadcast(), -1))
    }

    /// Number of addresses in the allocatable range, zero when the range is
    /// inverted. Saturates at `u128::MAX` for the full IPv6 space.
    pub fn range_size(&self) -> u128 {
        let (start, end) = (self.range_start(), self.range_end());
        match (start, end) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                let (start, end) = (addr_to_u128(start), addr_to_u128(end));
                if end < start {
                    0
                } else {
                    (end - start).saturating_add(1)
                }
            }
            _ => 0,
        }
    }

    /// True if `addr` lies inside the allocatable range
    pub fn in_range(&self, addr: &IpAddr) -> bool {
        let (start, end) = (self.range_start(), self.range_end());
        if start.is_ipv4() != addr.is_ipv4() {
            return false;
        }
        let value = addr_to_u128(*addr);
        addr_to_u128(start) <= value && value <= addr_to_u128(end)
    }
}

/// Integer view of an address, used for range comparisons
pub fn addr_to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

fn offset_addr(addr: IpAddr, delta: i8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let value = u32::from(v4);
            let value = if delta < 0 {
                value.saturating_sub(delta.unsigned_abs() as u32)
            } else {
                value.saturating_add(delta as u32)
            };
            IpAddr::V4(Ipv4Addr::from(value))
        }
        IpAddr::V6(v6) => {
            let value = u128::from(v6);
            let value = if delta < 0 {
                value.saturating_sub(delta.unsigned_abs() as u128)
            } else {
                value.saturating_add(delta as u128)
            };
            IpAddr::V6(Ipv6Addr::from(value))
        }
    }
}

/// Infra network with its per-domain instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfraNetwork {
    pub role: InfraRole,
    pub mtu: Option<i64>,
    pub domains: IndexMap<String, DomainInstance>,
}

impl InfraNetwork {
    pub fn new(role: InfraRole) -> Self {
        Self {
            role,
            mtu: None,
            domains: IndexMap::new(),
        }
    }

    pub fn domain(&self, name: &str) -> Option<&DomainInstance> {
        self.domains.get(name)
    }
}

/// Closed VLAN interval `start:end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VlanRange {
    pub start: i64,
    pub end: i64,
}

impl VlanRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, vid: i64) -> bool {
        self.start <= vid && vid <= self.end
    }

    /// Parse the compact `"10:20,30:30"` notation.
    ///
    /// Only the syntax is checked here; bounds and ordering are validated
    /// by the networking checker so that it can report them precisely.
    pub fn parse_list(value: &str) -> SharedResult<Vec<VlanRange>> {
        value.split(',').map(str::parse).collect()
    }

    pub fn format_list(ranges: &[VlanRange]) -> String {
        ranges
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for VlanRange {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SharedTypeError::InvalidValue {
            field: "vlan_ranges",
            value: s.to_string(),
        };
        let (start, end) = s.split_once(':').ok_or_else(invalid)?;
        let start = start.trim().parse::<i64>().map_err(|_| invalid())?;
        let end = end.trim().parse::<i64>().map_err(|_| invalid())?;
        Ok(VlanRange { start, end })
    }
}

impl fmt::Display for VlanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Catalogue entry for a VLAN tagged tenant network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderNetwork {
    pub name: String,
    pub mtu: Option<i64>,
    pub vlan_ranges: Vec<VlanRange>,
    #[serde(default)]
    pub shared: bool,
}

impl ProviderNetwork {
    pub fn new(name: impl Into<String>, vlan_ranges: Vec<VlanRange>) -> Self {
        Self {
            name: name.into(),
            mtu: None,
            vlan_ranges,
            shared: false,
        }
    }
}

/// Cluster wide network catalogue (`cloud.networking`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Networking {
    #[serde(default)]
    pub dns: Vec<IpAddr>,
    pub mtu: Option<i64>,
    #[serde(default)]
    pub infra: IndexMap<InfraRole, InfraNetwork>,
    #[serde(default)]
    pub provider_networks: IndexMap<String, ProviderNetwork>,
}

impl Networking {
    /// Global default MTU, falling back to [`DEFAULT_MTU`]
    pub fn default_mtu(&self) -> i64 {
        self.mtu.unwrap_or(DEFAULT_MTU)
    }

    /// Look up an infra network by its document key (`infra_internal`, ...)
    pub fn infra_network(&self, name: &str) -> Option<&InfraNetwork> {
        let role = name.parse::<InfraRole>().ok()?;
        self.infra.get(&role)
    }

    pub fn provider_network(&self, name: &str) -> Option<&ProviderNetwork> {
        self.provider_networks.get(name)
    }

    pub fn infra_mtu(&self, network: &InfraNetwork) -> i64 {
        network.mtu.unwrap_or_else(|| self.default_mtu())
    }

    pub fn provider_mtu(&self, network: &ProviderNetwork) -> i64 {
        network.mtu.unwrap_or_else(|| self.default_mtu())
    }

    /// VLAN ranges of a provider network, empty for unknown names
    pub fn vlan_ranges(&self, name: &str) -> &[VlanRange] {
        self.provider_networks
            .get(name)
            .map(|net| net.vlan_ranges.as_slice())
            .unwrap_or(&[])
    }

    /// All infra network domain instances in role order
    pub fn domain_instances(&self) -> impl Iterator<Item = (InfraRole, &DomainInstance)> {
        InfraRole::ALL.into_iter().flat_map(move |role| {
            self.infra
                .get(&role)
                .into_iter()
                .flat_map(move |net| net.domains.values().map(move |d| (role, d)))
        })
    }
}
