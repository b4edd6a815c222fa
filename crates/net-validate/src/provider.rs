//! Provider network and SR-IOV attachments of a network profile

use log::debug;
use nettopo_core::interface::NameRules;
use nettopo_core::range::{any_overlap, first_duplicate};
use nettopo_core::{
    NetworkProfile, Networking, ProviderNetType, ValidationError, ValidationResult, VlanRange,
};

use crate::sharing::{check_single_nic, check_sriov_carrier};

/// Provider type pairs that cannot coexist in one profile
const CONFLICTING_TYPES: [(ProviderNetType, ProviderNetType); 2] = [
    (ProviderNetType::Ovs, ProviderNetType::OvsDpdk),
    (ProviderNetType::OvsDpdk, ProviderNetType::OvsOffloadSriov),
];

/// Validator for the provider and SR-IOV sections of a network profile
pub struct ProviderValidator {
    names: NameRules,
}

impl ProviderValidator {
    pub fn new() -> Self {
        Self {
            names: NameRules::new(),
        }
    }

    pub fn validate(&self, profile: &NetworkProfile, networking: &Networking) -> ValidationResult {
        self.validate_provider_interfaces(profile, networking)?;
        self.validate_sriov_networks(profile, networking)?;
        validate_provider_networks(profile, networking)?;

        debug!("Network profile {} attachments are valid", profile.name);
        Ok(())
    }

    fn validate_provider_interfaces(
        &self,
        profile: &NetworkProfile,
        networking: &Networking,
    ) -> ValidationResult {
        for (iface, attachment) in &profile.provider_network_interfaces {
            self.names.validate_carrier_name(&profile.name, iface)?;
            validate_positive(profile, iface, "vf_count", attachment.vf_count)?;
            validate_positive(profile, iface, "dpdk_max_rx_queues", attachment.dpdk_max_rx_queues)?;
            if attachment.mtu_declared {
                return Err(ValidationError::MisplacedMtu {
                    profile: profile.name.clone(),
                    interface: iface.clone(),
                });
            }
        }

        for (first, second) in CONFLICTING_TYPES {
            if profile.has_provider_type(first) && profile.has_provider_type(second) {
                return Err(ValidationError::ProviderTypeConflict {
                    profile: profile.name.clone(),
                    first,
                    second,
                });
            }
        }

        let networks: Vec<&str> = profile
            .provider_network_interfaces
            .values()
            .flat_map(|attachment| attachment.provider_networks.iter().map(String::as_str))
            .collect();
        if let Some(network) = first_duplicate(networks.iter().copied()) {
            return Err(ValidationError::DuplicateNetworkMapping {
                profile: profile.name.clone(),
                network: network.to_string(),
            });
        }
        for network in networks {
            validate_defined(profile, networking, network)?;
        }
        Ok(())
    }

    fn validate_sriov_networks(&self, profile: &NetworkProfile, networking: &Networking) -> ValidationResult {
        for network in profile.sriov_provider_networks.keys() {
            validate_defined(profile, networking, network)?;
        }

        for (network, sriov) in &profile.sriov_provider_networks {
            validate_positive(profile, network, "vf_count", sriov.vf_count)?;
            for iface in &sriov.interfaces {
                self.names.validate_member_name(&profile.name, iface)?;
                check_sriov_carrier(profile, networking, network, iface)?;
            }
        }

        // An interface serves at most one SR-IOV network
        let interfaces = profile
            .sriov_provider_networks
            .values()
            .flat_map(|sriov| sriov.interfaces.iter().map(String::as_str));
        if let Some(iface) = first_duplicate(interfaces) {
            return Err(ValidationError::SriovInterfaceConflict {
                profile: profile.name.clone(),
                interface: iface.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ProviderValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_defined(profile: &NetworkProfile, networking: &Networking, network: &str) -> ValidationResult {
    if networking.provider_network(network).is_none() {
        return Err(ValidationError::MissingProviderNetwork {
            context: profile.name.clone(),
            network: network.to_string(),
        });
    }
    Ok(())
}

fn validate_positive(
    profile: &NetworkProfile,
    owner: &str,
    field: &str,
    value: Option<i64>,
) -> ValidationResult {
    match value {
        Some(value) if value < 1 => Err(ValidationError::NotPositive {
            context: profile.name.clone(),
            field: format!("{} of {}", field, owner),
            value,
        }),
        _ => Ok(()),
    }
}

/// Single NIC rules, then disjoint VLAN ranges between the provider
/// networks sharing an interface
fn validate_provider_networks(profile: &NetworkProfile, networking: &Networking) -> ValidationResult {
    for (iface, attachment) in &profile.provider_network_interfaces {
        check_single_nic(profile, networking, iface, attachment)?;

        let ranges: Vec<(&str, &[VlanRange])> = attachment
            .provider_networks
            .iter()
            .map(|name| (name.as_str(), networking.vlan_ranges(name)))
            .collect();

        for (i, &(first, first_ranges)) in ranges.iter().enumerate() {
            for &(second, second_ranges) in &ranges[i + 1..] {
                if any_overlap(first_ranges, second_ranges) {
                    return Err(ValidationError::ProviderVlanOverlap {
                        profile: profile.name.clone(),
                        interface: iface.clone(),
                        first: first.to_string(),
                        second: second.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nettopo_core::{
        BondMode, DomainInstance, ErrorKind, InfraNetwork, InfraRole, ProviderNetAttachment,
        ProviderNetwork, SriovAttachment,
    };

    fn networking() -> Networking {
        let mut networking = Networking::default();
        let mut internal = InfraNetwork::new(InfraRole::Internal);
        let mut domain = DomainInstance::new("rack-1", "10.0.0.0/24".parse().unwrap());
        domain.vlan = Some(10);
        internal.domains.insert("rack-1".to_string(), domain);
        networking.infra.insert(InfraRole::Internal, internal);

        for (name, start, end) in [
            ("physnet1", 100, 199),
            ("physnet2", 200, 299),
            ("physnet3", 150, 250),
            ("sriovnet1", 300, 399),
        ] {
            networking.provider_networks.insert(
                name.to_string(),
                ProviderNetwork::new(name, vec![VlanRange::new(start, end)]),
            );
        }
        networking
    }

    fn provider_profile() -> NetworkProfile {
        let mut profile = NetworkProfile::new("compute");
        profile
            .interface_net_mapping
            .insert("eth0".to_string(), vec!["infra_internal".to_string()]);
        profile.provider_network_interfaces.insert(
            "eth1".to_string(),
            ProviderNetAttachment::new(
                ProviderNetType::Ovs,
                vec!["physnet1".to_string(), "physnet2".to_string()],
            ),
        );
        profile.sriov_provider_networks.insert(
            "sriovnet1".to_string(),
            SriovAttachment::new(vec!["eth2".to_string(), "eth3".to_string()]),
        );
        profile
    }

    fn validate(profile: &NetworkProfile) -> ValidationResult {
        ProviderValidator::new().validate(profile, &networking())
    }

    #[test]
    fn test_valid_attachments() {
        assert!(validate(&provider_profile()).is_ok());
    }

    #[test]
    fn test_overlapping_networks_on_interface() {
        let mut profile = provider_profile();
        profile.provider_network_interfaces["eth1"]
            .provider_networks
            .push("physnet3".to_string());

        let err = validate(&profile).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ProviderVlanOverlap {
                profile: "compute".to_string(),
                interface: "eth1".to_string(),
                first: "physnet1".to_string(),
                second: "physnet3".to_string(),
            }
        );
        assert_eq!(err.kind(), ErrorKind::OverlapConflict);
    }

    #[test]
    fn test_undefined_provider_network() {
        let mut profile = provider_profile();
        profile.provider_network_interfaces["eth1"].provider_networks = vec!["physnet9".to_string()];
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::MissingProviderNetwork { .. }
        ));

        let mut profile = provider_profile();
        profile
            .sriov_provider_networks
            .insert("sriovnet9".to_string(), SriovAttachment::new(vec!["eth4".to_string()]));
        assert_eq!(
            validate(&profile).unwrap_err().kind(),
            ErrorKind::CrossReferenceMissing
        );
    }

    #[test]
    fn test_network_on_two_interfaces() {
        let mut profile = provider_profile();
        profile.provider_network_interfaces.insert(
            "eth4".to_string(),
            ProviderNetAttachment::new(ProviderNetType::Ovs, vec!["physnet2".to_string()]),
        );
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::DuplicateNetworkMapping { .. }
        ));
    }

    #[test]
    fn test_conflicting_provider_types() {
        let mut profile = provider_profile();
        profile.provider_network_interfaces.insert(
            "eth4".to_string(),
            ProviderNetAttachment::new(ProviderNetType::OvsDpdk, vec!["physnet3".to_string()]),
        );
        assert_eq!(
            validate(&profile).unwrap_err(),
            ValidationError::ProviderTypeConflict {
                profile: "compute".to_string(),
                first: ProviderNetType::Ovs,
                second: ProviderNetType::OvsDpdk,
            }
        );
    }

    #[test]
    fn test_attachment_values() {
        let mut profile = provider_profile();
        profile.provider_network_interfaces["eth1"].vf_count = Some(0);
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::NotPositive { value: 0, .. }
        ));

        let mut profile = provider_profile();
        profile.provider_network_interfaces["eth1"].mtu_declared = true;
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::MisplacedMtu { .. }
        ));
    }

    #[test]
    fn test_sriov_interface_in_two_networks() {
        let mut profile = provider_profile();
        profile
            .sriov_provider_networks
            .insert("physnet3".to_string(), SriovAttachment::new(vec!["eth3".to_string()]));
        assert_eq!(
            validate(&profile).unwrap_err(),
            ValidationError::SriovInterfaceConflict {
                profile: "compute".to_string(),
                interface: "eth3".to_string(),
            }
        );
    }

    #[test]
    fn test_carrier_checks_precede_interface_conflict() {
        let mut profile = provider_profile();
        profile.sriov_provider_networks.insert(
            "physnet3".to_string(),
            SriovAttachment::new(vec!["eth3".to_string(), "bond0".to_string()]),
        );
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::BondAsMember { .. }
        ));
    }

    #[test]
    fn test_sriov_on_bond_or_vlan() {
        let mut profile = provider_profile();
        profile.sriov_provider_networks["sriovnet1"].interfaces = vec!["bond0".to_string()];
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::BondAsMember { .. }
        ));

        profile.sriov_provider_networks["sriovnet1"].interfaces = vec!["vlan10".to_string()];
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::VlanInterface { .. }
        ));
    }

    #[test]
    fn test_sriov_on_lacp_bond() {
        let mut profile = provider_profile();
        profile.interface_net_mapping.shift_remove("eth0");
        profile
            .interface_net_mapping
            .insert("bond0".to_string(), vec!["infra_internal".to_string()]);
        profile.bonding_interfaces.insert(
            "bond0".to_string(),
            vec!["eth2".to_string(), "eth5".to_string()],
        );
        profile.linux_bonding_options = Some(BondMode::Lacp);

        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::SriovLacpConflict { .. }
        ));
    }

    #[test]
    fn test_single_nic_with_second_interface() {
        let mut profile = provider_profile();
        profile
            .interface_net_mapping
            .insert("eth1".to_string(), vec!["infra_internal".to_string()]);
        profile.interface_net_mapping.shift_remove("eth0");
        profile.sriov_provider_networks.clear();
        assert!(validate(&profile).is_ok());

        profile
            .interface_net_mapping
            .insert("eth0".to_string(), vec!["infra_internal".to_string()]);
        assert!(matches!(
            validate(&profile).unwrap_err(),
            ValidationError::SingleNicViolation { .. }
        ));
    }
}
