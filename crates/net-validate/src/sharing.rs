//! Rules for physical interfaces shared between infra, provider and SR-IOV
//! networks
//!
//! An SR-IOV carrier `i` is resolved to its master (the bond enslaving it,
//! or `i` itself) and the following rules apply in order, first match wins:
//!
//! 1. `i` is a member of a bond running `mode=lacp`: [`SriovLacpConflict`]
//! 2. the master carries `ovs-dpdk` or `ovs-offload-sriov` provider
//!    networks: [`SriovTypeConflict`]
//! 3. the master carries infra networks: the SR-IOV MTU must not exceed the
//!    infra MTU and its VLAN ranges must avoid the infra VLAN IDs
//! 4. the master carries provider networks: VLAN ranges must be disjoint
//! 5. `i` is a member of a bond in any LACP mode whose master carries an
//!    untagged infra network: [`UnsupportedInterfaceSharing`]
//!
//! A provider interface that also carries infra networks (single NIC setup)
//! is checked by [`check_single_nic`].
//!
//! [`SriovLacpConflict`]: nettopo_core::ValidationError::SriovLacpConflict
//! [`SriovTypeConflict`]: nettopo_core::ValidationError::SriovTypeConflict
//! [`UnsupportedInterfaceSharing`]: nettopo_core::ValidationError::UnsupportedInterfaceSharing

use nettopo_core::range::{any_overlap, contains_vlan};
use nettopo_core::{
    BondMode, NetworkProfile, Networking, ProviderNetAttachment, ProviderNetType,
    ValidationError, ValidationResult, VlanRange,
};

/// Infra networks riding an interface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfraUsage {
    /// VLAN IDs of every tagged domain instance
    pub vlans: Vec<i64>,
    /// Some domain instance is untagged
    pub untagged: bool,
    /// Largest infra MTU
    pub mtu: i64,
}

/// Provider networks riding an interface
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUsage {
    pub net_type: ProviderNetType,
    pub vlan_ranges: Vec<VlanRange>,
}

/// Infra networks mapped to `iface` or to the bond enslaving it
pub fn infra_usage(profile: &NetworkProfile, networking: &Networking, iface: &str) -> Option<InfraUsage> {
    let master = profile.master_of(iface);
    let networks = profile.interface_net_mapping.get(master)?;

    let mut usage = InfraUsage::default();
    for network in networks.iter().filter_map(|name| networking.infra_network(name)) {
        for domain in network.domains.values() {
            match domain.vlan {
                Some(vlan) => usage.vlans.push(vlan),
                None => usage.untagged = true,
            }
        }
        usage.mtu = usage.mtu.max(networking.infra_mtu(network));
    }
    Some(usage)
}

/// Provider networks attached to `iface` or to the bond enslaving it
pub fn provider_usage(
    profile: &NetworkProfile,
    networking: &Networking,
    iface: &str,
) -> Option<ProviderUsage> {
    let master = profile.master_of(iface);
    let attachment = profile.provider_network_interfaces.get(master)?;

    Some(ProviderUsage {
        net_type: attachment.net_type,
        vlan_ranges: attachment
            .provider_networks
            .iter()
            .flat_map(|name| networking.vlan_ranges(name).iter().copied())
            .collect(),
    })
}

/// Bond enslaving `iface` and its effective mode. Bonds carrying provider
/// networks use the mode of their provider type, bonds carrying only infra
/// networks the Linux mode. Unused bonds have no mode.
pub fn carrier_bond_mode<'a>(profile: &'a NetworkProfile, iface: &str) -> Option<(&'a str, BondMode)> {
    let bond = profile.bond_of(iface)?;
    if !profile.provider_network_interfaces.contains_key(bond)
        && !profile.interface_net_mapping.contains_key(bond)
    {
        return None;
    }
    profile
        .bonding_mode(profile.bonding_kind_for(bond))
        .map(|mode| (bond, mode))
}

/// Apply the SR-IOV sharing rules to carrier `iface` of SR-IOV network `network`
pub fn check_sriov_carrier(
    profile: &NetworkProfile,
    networking: &Networking,
    network: &str,
    iface: &str,
) -> ValidationResult {
    let bond_mode = carrier_bond_mode(profile, iface);

    if let Some((bond, BondMode::Lacp)) = bond_mode {
        return Err(ValidationError::SriovLacpConflict {
            profile: profile.name.clone(),
            interface: iface.to_string(),
            bond: bond.to_string(),
        });
    }

    let provider = provider_usage(profile, networking, iface);
    if let Some(provider) = &provider {
        if matches!(
            provider.net_type,
            ProviderNetType::OvsDpdk | ProviderNetType::OvsOffloadSriov
        ) {
            return Err(ValidationError::SriovTypeConflict {
                profile: profile.name.clone(),
                interface: iface.to_string(),
                provider_type: provider.net_type,
            });
        }
    }

    let sriov_ranges = networking.vlan_ranges(network);
    let infra = infra_usage(profile, networking, iface);
    if let Some(infra) = &infra {
        let sriov_mtu = networking
            .provider_network(network)
            .map(|net| networking.provider_mtu(net))
            .unwrap_or_else(|| networking.default_mtu());
        if sriov_mtu > infra.mtu {
            return Err(ValidationError::SriovMtuTooLarge {
                network: network.to_string(),
                mtu: sriov_mtu,
                interface: iface.to_string(),
                interface_mtu: infra.mtu,
            });
        }
        if let Some(vlan) = infra.vlans.iter().find(|vlan| contains_vlan(sriov_ranges, **vlan)) {
            return Err(ValidationError::SriovInfraVlanConflict {
                profile: profile.name.clone(),
                network: network.to_string(),
                vlan: *vlan,
            });
        }
    }

    if let Some(provider) = &provider {
        if any_overlap(sriov_ranges, &provider.vlan_ranges) {
            return Err(ValidationError::SriovProviderVlanConflict {
                profile: profile.name.clone(),
                network: network.to_string(),
            });
        }
    }

    if let (Some((bond, mode)), Some(infra)) = (bond_mode, &infra) {
        if mode.is_lacp() && infra.untagged {
            return Err(ValidationError::UnsupportedInterfaceSharing {
                profile: profile.name.clone(),
                interface: iface.to_string(),
                reason: format!(
                    "SR-IOV network {} on a member of {} ({}) which also carries untagged infra networks",
                    network, bond, mode
                ),
            });
        }
    }

    Ok(())
}

/// Provider interface also carrying infra networks: it must be the only
/// interface of the profile and keep its VLANs apart from the infra VLANs
pub fn check_single_nic(
    profile: &NetworkProfile,
    networking: &Networking,
    iface: &str,
    attachment: &ProviderNetAttachment,
) -> ValidationResult {
    let Some(infra) = infra_usage(profile, networking, iface) else {
        return Ok(());
    };

    for network in &attachment.provider_networks {
        if profile.provider_network_interfaces.len() > 1 || profile.interface_net_mapping.len() > 1 {
            return Err(ValidationError::SingleNicViolation {
                profile: profile.name.clone(),
            });
        }
        if matches!(attachment.net_type, ProviderNetType::Caas | ProviderNetType::OvsDpdk) {
            return Err(ValidationError::SingleNicProviderType {
                profile: profile.name.clone(),
                provider_type: attachment.net_type,
            });
        }
        if infra.untagged {
            return Err(ValidationError::UntaggedInfraProviderConflict {
                profile: profile.name.clone(),
                network: network.clone(),
            });
        }
        let ranges = networking.vlan_ranges(network);
        if let Some(vlan) = infra.vlans.iter().find(|vlan| contains_vlan(ranges, **vlan)) {
            return Err(ValidationError::InfraProviderVlanConflict {
                profile: profile.name.clone(),
                network: network.clone(),
                vlan: *vlan,
            });
        }
    }
    Ok(())
}
