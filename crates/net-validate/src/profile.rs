//! Network profile structure: interface mapping, bonding groups and the
//! integrity between them

use log::debug;
use nettopo_core::bond::validate_member_count;
use nettopo_core::interface::NameRules;
use nettopo_core::range::first_duplicate;
use nettopo_core::{
    BondingKind, InfraNetwork, NetworkProfile, Networking, ValidationError, ValidationResult,
};

use crate::ValidationOptions;

/// Structural validator for a single network profile
pub struct ProfileValidator {
    names: NameRules,
}

impl ProfileValidator {
    pub fn new() -> Self {
        Self {
            names: NameRules::new(),
        }
    }

    pub fn validate(
        &self,
        profile: &NetworkProfile,
        networking: &Networking,
        options: &ValidationOptions,
    ) -> ValidationResult {
        self.validate_interface_net_mapping(profile, networking, options)?;
        self.validate_bonding_interfaces(profile)?;
        self.validate_network_integrity(profile)?;

        debug!("Network profile {} structure is valid", profile.name);
        Ok(())
    }

    fn validate_interface_net_mapping(
        &self,
        profile: &NetworkProfile,
        networking: &Networking,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let mut mapped: Vec<&str> = Vec::new();

        for (iface, networks) in &profile.interface_net_mapping {
            self.names.validate_carrier_name(&profile.name, iface)?;

            let infra = networks
                .iter()
                .map(|name| {
                    networking
                        .infra_network(name)
                        .ok_or_else(|| ValidationError::MissingNetworkDefinition {
                            context: profile.name.clone(),
                            network: name.clone(),
                        })
                })
                .collect::<ValidationResult<Vec<_>>>()?;

            for domain in domains_of(&infra) {
                validate_untagged_integrity(profile, iface, domain, &infra, networking, options)?;
            }
            mapped.extend(networks.iter().map(String::as_str));
        }

        if let Some(network) = first_duplicate(mapped) {
            return Err(ValidationError::DuplicateNetworkMapping {
                profile: profile.name.clone(),
                network: network.to_string(),
            });
        }
        Ok(())
    }

    fn validate_bonding_interfaces(&self, profile: &NetworkProfile) -> ValidationResult {
        for (bond, members) in &profile.bonding_interfaces {
            self.names.validate_interface_name(&profile.name, bond)?;
            self.names.validate_bond_name(&profile.name, bond)?;
            for member in members {
                self.names.validate_member_name(&profile.name, member)?;
            }
        }

        let members = profile.bonding_interfaces.values().flatten().map(String::as_str);
        if let Some(member) = first_duplicate(members) {
            return Err(ValidationError::BondMemberConflict {
                profile: profile.name.clone(),
                interface: member.to_string(),
            });
        }
        Ok(())
    }

    /// Every used bond must be defined and bonding options must fit its
    /// member count. Provider interfaces bond with the implementation of
    /// their type, infra-only interfaces with Linux bonding.
    fn validate_network_integrity(&self, profile: &NetworkProfile) -> ValidationResult {
        let mapped_only = profile
            .interface_net_mapping
            .keys()
            .filter(|iface| !profile.provider_network_interfaces.contains_key(*iface));
        for iface in profile.provider_network_interfaces.keys().chain(mapped_only) {
            self.validate_carrier_integrity(profile, iface, profile.bonding_kind_for(iface))?;
        }
        Ok(())
    }

    fn validate_carrier_integrity(
        &self,
        profile: &NetworkProfile,
        iface: &str,
        kind: BondingKind,
    ) -> ValidationResult {
        if self.names.is_bond(iface) {
            let members = profile.bonding_interfaces.get(iface).ok_or_else(|| {
                ValidationError::MissingBondDefinition {
                    profile: profile.name.clone(),
                    bond: iface.to_string(),
                }
            })?;
            let mode = profile
                .bonding_mode(kind)
                .ok_or_else(|| ValidationError::MissingField {
                    context: profile.name.clone(),
                    field: kind.option_key().to_string(),
                })?;
            validate_member_count(&profile.name, iface, mode, members.len())
        } else if profile.bond_of(iface).is_some() {
            Err(ValidationError::SlaveAlsoDirectlyMapped {
                profile: profile.name.clone(),
                interface: iface.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for ProfileValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Network domains used by `networks`, in first-seen order
fn domains_of<'a>(networks: &[&'a InfraNetwork]) -> Vec<&'a str> {
    let mut domains: Vec<&str> = Vec::new();
    for name in networks.iter().flat_map(|network| network.domains.keys()) {
        if !domains.contains(&name.as_str()) {
            domains.push(name);
        }
    }
    domains
}

/// At most one untagged network per interface and domain, and it needs an
/// MTU no smaller than the VLAN networks stacked on top of it
fn validate_untagged_integrity(
    profile: &NetworkProfile,
    iface: &str,
    domain: &str,
    networks: &[&InfraNetwork],
    networking: &Networking,
    options: &ValidationOptions,
) -> ValidationResult {
    let mut untagged: Vec<(&InfraNetwork, i64)> = Vec::new();
    let mut vlan_mtu = 0;

    for network in networks {
        let Some(instance) = network.domain(domain) else { continue };
        let mtu = networking.infra_mtu(network);
        if instance.is_tagged() {
            vlan_mtu = vlan_mtu.max(mtu);
        } else {
            untagged.push((network, mtu));
        }
    }

    if untagged.len() > 1 && !options.virtualized {
        return Err(ValidationError::MultipleUntaggedNetworks {
            profile: profile.name.clone(),
            interface: iface.to_string(),
            domain: domain.to_string(),
        });
    }
    if let Some((network, mtu)) = untagged.iter().find(|(_, mtu)| *mtu < vlan_mtu) {
        return Err(ValidationError::UntaggedMtuTooSmall {
            profile: profile.name.clone(),
            network: network.role.network_name().to_string(),
            mtu: *mtu,
            vlan_mtu,
        });
    }
    Ok(())
}
