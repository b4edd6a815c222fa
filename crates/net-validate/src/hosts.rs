//! Host to profile and network domain assignment

use std::net::IpAddr;

use indexmap::IndexMap;
use log::debug;
use nettopo_core::interface::NameRules;
use nettopo_core::{
    Host, InfraRole, NetworkProfile, Networking, ProviderNetType, ServiceProfile, StorageProfile,
    ValidationError, ValidationResult,
};

/// Validator for `cloud.hosts` against the profiles and the network catalogue
pub struct HostsValidator {
    names: NameRules,
}

impl HostsValidator {
    pub fn new() -> Self {
        Self {
            names: NameRules::new(),
        }
    }

    /// Per host checks in document order, then the checks over the whole fleet.
    /// Ceph checks need `storage`; without it they are skipped.
    pub fn validate(
        &self,
        hosts: &IndexMap<String, Host>,
        profiles: &IndexMap<String, NetworkProfile>,
        networking: &Networking,
        storage: Option<&IndexMap<String, StorageProfile>>,
    ) -> ValidationResult {
        let mut assigned: Vec<(&Host, &NetworkProfile)> = Vec::with_capacity(hosts.len());

        for host in hosts.values() {
            self.names.validate_hostname(&host.name)?;
            let profile = resolve_profile(host, profiles)?;
            validate_host(host, profile)?;
            if let Some(storage) = storage {
                validate_storage(host, profile, storage)?;
            }
            validate_pre_allocated_ips(host, profile, networking)?;
            assigned.push((host, profile));
        }

        validate_unique_ips(hosts)?;
        validate_control_plane(hosts)?;
        validate_address_capacity(&assigned, networking)?;

        debug!("{} hosts are valid", hosts.len());
        Ok(())
    }
}

impl Default for HostsValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_profile<'a>(
    host: &Host,
    profiles: &'a IndexMap<String, NetworkProfile>,
) -> ValidationResult<&'a NetworkProfile> {
    if host.network_domain.is_none() {
        return Err(ValidationError::MissingField {
            context: host.name.clone(),
            field: "network_domain".to_string(),
        });
    }

    let name = host
        .network_profile()
        .ok_or_else(|| ValidationError::InvalidProfileCount {
            host: host.name.clone(),
            count: host.network_profiles.len(),
        })?;
    profiles
        .get(name)
        .ok_or_else(|| ValidationError::UnknownProfile {
            host: host.name.clone(),
            profile: name.to_string(),
        })
}

fn validate_host(host: &Host, profile: &NetworkProfile) -> ValidationResult {
    let internal = InfraRole::Internal.network_name();
    let external = InfraRole::External.network_name();

    if !profile.maps_network(internal) {
        return Err(ValidationError::NetworkNotMapped {
            host: host.name.clone(),
            network: internal.to_string(),
        });
    }

    if profile.has_provider_type(ProviderNetType::OvsDpdk) && !host.has_role(&ServiceProfile::Base) {
        return Err(missing_service_profile(
            host,
            ServiceProfile::Base,
            "ovs-dpdk provider interfaces need the base service profile",
        ));
    }
    let caas = host.service_profiles.iter().any(ServiceProfile::is_caas);
    if !profile.sriov_provider_networks.is_empty() && !host.has_role(&ServiceProfile::Base) && !caas {
        return Err(missing_service_profile(
            host,
            ServiceProfile::Base,
            "SR-IOV provider networks need the base or a caas service profile",
        ));
    }

    let management = host.has_role(&ServiceProfile::Management);
    match (management, profile.maps_network(external)) {
        (true, false) => Err(ValidationError::NetworkNotMapped {
            host: host.name.clone(),
            network: external.to_string(),
        }),
        (false, true) => Err(ValidationError::UnexpectedNetworkMapping {
            host: host.name.clone(),
            network: external.to_string(),
        }),
        _ => Ok(()),
    }
}

fn missing_service_profile(host: &Host, profile: ServiceProfile, reason: &str) -> ValidationError {
    ValidationError::MissingServiceProfile {
        host: host.name.clone(),
        profile: profile.to_string(),
        reason: reason.to_string(),
    }
}

/// Storage hosts backed by ceph need the storage cluster network
fn validate_storage(
    host: &Host,
    profile: &NetworkProfile,
    storage: &IndexMap<String, StorageProfile>,
) -> ValidationResult {
    if !host.has_role(&ServiceProfile::Storage) {
        return Ok(());
    }

    let mut ceph = false;
    for name in &host.storage_profiles {
        let storage_profile = storage.get(name).ok_or_else(|| ValidationError::UnknownStorageProfile {
            host: host.name.clone(),
            profile: name.clone(),
        })?;
        ceph |= storage_profile.is_ceph();
    }

    let storage_cluster = InfraRole::StorageCluster.network_name();
    if ceph && !profile.maps_network(storage_cluster) {
        return Err(ValidationError::NetworkNotMapped {
            host: host.name.clone(),
            network: storage_cluster.to_string(),
        });
    }
    Ok(())
}

/// A preallocated address belongs to a mapped infra network and lies
/// inside the CIDR of the host's network domain
fn validate_pre_allocated_ips(host: &Host, profile: &NetworkProfile, networking: &Networking) -> ValidationResult {
    let Some(domain_name) = host.network_domain.as_deref() else {
        return Ok(());
    };

    for (network_name, address) in &host.pre_allocated_ips {
        if !profile.maps_network(network_name) {
            return Err(ValidationError::NetworkNotMapped {
                host: host.name.clone(),
                network: network_name.clone(),
            });
        }

        let network = network_name
            .parse::<InfraRole>()
            .ok()
            .and_then(|role| networking.infra.get(&role))
            .ok_or_else(|| ValidationError::MissingNetworkDefinition {
                context: host.name.clone(),
                network: network_name.clone(),
            })?;
        let domain = network
            .domain(domain_name)
            .ok_or_else(|| ValidationError::MissingNetworkDomain {
                network: network_name.clone(),
                domain: domain_name.to_string(),
            })?;

        if !domain.cidr.contains(address) {
            return Err(ValidationError::AddressOutsideCidr {
                context: host.name.clone(),
                field: format!("pre_allocated_ips {network_name}"),
                address: address.to_string(),
                cidr: domain.cidr,
            });
        }
    }
    Ok(())
}

/// No two hosts may preallocate the same address on the same network
fn validate_unique_ips(hosts: &IndexMap<String, Host>) -> ValidationResult {
    let mut owners: IndexMap<(&str, IpAddr), &str> = IndexMap::new();

    for host in hosts.values() {
        for (network, address) in &host.pre_allocated_ips {
            if let Some(other) = owners.insert((network.as_str(), *address), host.name.as_str()) {
                return Err(ValidationError::DuplicatePreallocatedIp {
                    host: other.to_string(),
                    other: host.name.clone(),
                    address: *address,
                });
            }
        }
    }
    Ok(())
}

/// Management and caas_master nodes: at least one of them, 1 or 3 of each,
/// managements in one network domain and backed by two storage nodes when
/// there are three of them
fn validate_control_plane(hosts: &IndexMap<String, Host>) -> ValidationResult {
    let managements = with_role(hosts, &ServiceProfile::Management);
    let caas_masters = with_role(hosts, &ServiceProfile::CaasMaster);

    if managements.is_empty() && caas_masters.is_empty() {
        return Err(ValidationError::NoManagementNode);
    }
    for (role, nodes) in [
        (ServiceProfile::CaasMaster, &caas_masters),
        (ServiceProfile::Management, &managements),
    ] {
        if !nodes.is_empty() && !matches!(nodes.len(), 1 | 3) {
            return Err(ValidationError::UnexpectedNodeCount {
                role: role.to_string(),
                count: nodes.len(),
            });
        }
    }

    if let Some((first, rest)) = managements.split_first() {
        let expected = first.network_domain.as_deref().unwrap_or_default();
        if let Some(host) = rest
            .iter()
            .find(|host| host.network_domain.as_deref().unwrap_or_default() != expected)
        {
            return Err(ValidationError::ManagementDomainMismatch {
                host: host.name.clone(),
                domain: host.network_domain.clone().unwrap_or_default(),
                expected: expected.to_string(),
            });
        }
    }

    let storages = with_role(hosts, &ServiceProfile::Storage).len();
    if managements.len() == 3 && storages < 2 {
        return Err(ValidationError::NotEnoughStorageNodes { count: storages });
    }
    Ok(())
}

fn with_role<'a>(hosts: &'a IndexMap<String, Host>, role: &ServiceProfile) -> Vec<&'a Host> {
    hosts.values().filter(|host| host.has_role(role)).collect()
}

/// Every `(infra network, network domain)` pair needs one address per host
/// in its range, plus a floating address on the external network
fn validate_address_capacity(assigned: &[(&Host, &NetworkProfile)], networking: &Networking) -> ValidationResult {
    let mut demand: IndexMap<(InfraRole, &str), u128> = IndexMap::new();

    for (host, profile) in assigned {
        let Some(domain) = host.network_domain.as_deref() else { continue };
        let roles = profile
            .interface_net_mapping
            .values()
            .flatten()
            .filter_map(|name| name.parse::<InfraRole>().ok());
        for role in roles {
            *demand.entry((role, domain)).or_insert(0) += 1;
        }
    }

    for ((role, domain_name), hosts) in demand {
        let Some(network) = networking.infra.get(&role) else { continue };
        let domain = network
            .domain(domain_name)
            .ok_or_else(|| ValidationError::MissingNetworkDomain {
                network: role.network_name().to_string(),
                domain: domain_name.to_string(),
            })?;

        let required = if role == InfraRole::External { hosts + 1 } else { hosts };
        if domain.range_size() < required {
            return Err(ValidationError::IpRangeTooSmall {
                network: role.network_name().to_string(),
                domain: domain_name.to_string(),
                start: domain.range_start().to_string(),
                end: domain.range_end().to_string(),
                required,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nettopo_core::{DomainInstance, ErrorKind, InfraNetwork, ProviderNetAttachment, SriovAttachment};

    fn networking() -> Networking {
        let mut networking = Networking::default();
        for (role, cidr) in [
            (InfraRole::Internal, "10.0.0.0/24"),
            (InfraRole::External, "198.51.100.0/29"),
        ] {
            let mut network = InfraNetwork::new(role);
            network
                .domains
                .insert("rack-1".to_string(), DomainInstance::new("rack-1", cidr.parse().unwrap()));
            networking.infra.insert(role, network);
        }
        networking
    }

    fn profiles() -> IndexMap<String, NetworkProfile> {
        let mut controller = NetworkProfile::new("controller");
        controller.interface_net_mapping.insert(
            "eth0".to_string(),
            vec!["infra_internal".to_string(), "infra_external".to_string()],
        );
        let mut compute = NetworkProfile::new("compute");
        compute
            .interface_net_mapping
            .insert("eth0".to_string(), vec!["infra_internal".to_string()]);

        [controller, compute]
            .into_iter()
            .map(|profile| (profile.name.clone(), profile))
            .collect()
    }

    fn host(name: &str, profile: &str, roles: &[ServiceProfile]) -> Host {
        let mut host = Host::new(name);
        host.network_domain = Some("rack-1".to_string());
        host.network_profiles = vec![profile.to_string()];
        host.service_profiles = roles.to_vec();
        host
    }

    fn hosts(entries: Vec<Host>) -> IndexMap<String, Host> {
        entries.into_iter().map(|host| (host.name.clone(), host)).collect()
    }

    fn validate(hosts: &IndexMap<String, Host>) -> ValidationResult {
        HostsValidator::new().validate(hosts, &profiles(), &networking(), None)
    }

    fn controller() -> Host {
        host("ctrl-1", "controller", &[ServiceProfile::Management, ServiceProfile::Controller])
    }

    fn storage_profiles() -> IndexMap<String, StorageProfile> {
        [("ceph_backend", Some("ceph")), ("lvm_backend", Some("lvm"))]
            .into_iter()
            .map(|(name, backend)| {
                let profile = StorageProfile {
                    name: name.to_string(),
                    backend: backend.map(str::to_string),
                };
                (name.to_string(), profile)
            })
            .collect()
    }

    #[test]
    fn test_valid_hosts() {
        let hosts = hosts(vec![
            host("ctrl-1", "controller", &[ServiceProfile::Management, ServiceProfile::Controller]),
            host("compute-1", "compute", &[ServiceProfile::Compute]),
        ]);
        assert!(validate(&hosts).is_ok());
    }

    #[test]
    fn test_profile_count() {
        let mut entry = host("compute-1", "compute", &[ServiceProfile::Compute]);
        entry.network_profiles.push("controller".to_string());
        let err = validate(&hosts(vec![entry])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidProfileCount { count: 2, .. }));

        let mut entry = host("compute-1", "compute", &[ServiceProfile::Compute]);
        entry.network_profiles.clear();
        assert_eq!(validate(&hosts(vec![entry])).unwrap_err().kind(), ErrorKind::StructuralConflict);
    }

    #[test]
    fn test_unknown_profile() {
        let err = validate(&hosts(vec![host("compute-1", "storage", &[])])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownProfile {
                host: "compute-1".to_string(),
                profile: "storage".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_network_domain() {
        let mut entry = host("compute-1", "compute", &[]);
        entry.network_domain = None;
        assert_eq!(validate(&hosts(vec![entry])).unwrap_err().kind(), ErrorKind::MissingField);
    }

    #[test]
    fn test_external_network_needs_management() {
        let err = validate(&hosts(vec![host("ctrl-1", "controller", &[ServiceProfile::Controller])]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedNetworkMapping { .. }));

        let err = validate(&hosts(vec![host("compute-1", "compute", &[ServiceProfile::Management])]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NetworkNotMapped { .. }));
    }

    #[test]
    fn test_accelerated_profiles_need_base() {
        let mut profiles = profiles();
        profiles["compute"].provider_network_interfaces.insert(
            "eth1".to_string(),
            ProviderNetAttachment::new(ProviderNetType::OvsDpdk, vec!["physnet1".to_string()]),
        );
        let hosts = hosts(vec![host("compute-1", "compute", &[ServiceProfile::Compute])]);
        let err = HostsValidator::new()
            .validate(&hosts, &profiles, &networking(), None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingServiceProfile { .. }));

        let mut profiles = self::profiles();
        profiles["compute"]
            .sriov_provider_networks
            .insert("sriovnet1".to_string(), SriovAttachment::new(vec!["eth2".to_string()]));
        assert!(HostsValidator::new()
            .validate(&hosts, &profiles, &networking(), None)
            .is_err());

        let workers = self::hosts(vec![
            controller(),
            host("worker-1", "compute", &[ServiceProfile::CaasWorker]),
        ]);
        assert!(HostsValidator::new()
            .validate(&workers, &profiles, &networking(), None)
            .is_ok());
    }

    #[test]
    fn test_ip_range_capacity() {
        let mut networking = networking();
        let external = networking.infra.get_mut(&InfraRole::External).unwrap();
        let domain = external.domains.get_mut("rack-1").unwrap();
        domain.ip_range_start = Some("198.51.100.2".parse().unwrap());
        domain.ip_range_end = Some("198.51.100.3".parse().unwrap());

        // The external network also needs a floating address
        let single = hosts(vec![controller()]);
        assert!(HostsValidator::new()
            .validate(&single, &profiles(), &networking, None)
            .is_ok());

        let mut entries: Vec<Host> = (1..=3)
            .map(|i| host(&format!("ctrl-{}", i), "controller", &[ServiceProfile::Management]))
            .collect();
        entries.extend(
            (1..=2).map(|i| host(&format!("storage-{}", i), "compute", &[ServiceProfile::Storage])),
        );
        let err = HostsValidator::new()
            .validate(&hosts(entries), &profiles(), &networking, None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::IpRangeTooSmall { required: 4, .. }));
    }

    #[test]
    fn test_host_in_undefined_domain() {
        let mut entry = host("compute-1", "compute", &[]);
        entry.network_domain = Some("rack-9".to_string());
        assert!(matches!(
            validate(&hosts(vec![controller(), entry])).unwrap_err(),
            ValidationError::MissingNetworkDomain { .. }
        ));
    }

    #[test]
    fn test_invalid_hostname() {
        let entry = host("Compute_1", "compute", &[ServiceProfile::Compute]);
        let err = validate(&hosts(vec![controller(), entry])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(err.to_string().contains("Compute_1"));

        let entry = host(&"c".repeat(64), "compute", &[ServiceProfile::Compute]);
        assert!(validate(&hosts(vec![controller(), entry])).is_err());
    }

    #[test]
    fn test_management_presence_and_counts() {
        let err = validate(&hosts(vec![host("compute-1", "compute", &[ServiceProfile::Compute])]))
            .unwrap_err();
        assert_eq!(err, ValidationError::NoManagementNode);
        assert_eq!(err.kind(), ErrorKind::StructuralConflict);

        let masters = hosts(vec![host("master-1", "compute", &[ServiceProfile::CaasMaster])]);
        assert!(validate(&masters).is_ok());

        let two_managements = hosts(vec![
            controller(),
            host("ctrl-2", "controller", &[ServiceProfile::Management]),
        ]);
        assert_eq!(
            validate(&two_managements).unwrap_err(),
            ValidationError::UnexpectedNodeCount {
                role: "management".to_string(),
                count: 2,
            }
        );

        let two_masters = hosts(vec![
            controller(),
            host("master-1", "compute", &[ServiceProfile::CaasMaster]),
            host("master-2", "compute", &[ServiceProfile::CaasMaster]),
        ]);
        let err = validate(&two_masters).unwrap_err();
        assert_eq!(err.context(), "caas_master");
    }

    #[test]
    fn test_managements_share_network_domain() {
        let mut entries: Vec<Host> = (1..=3)
            .map(|i| host(&format!("ctrl-{}", i), "controller", &[ServiceProfile::Management]))
            .collect();
        entries[2].network_domain = Some("rack-2".to_string());

        let err = validate(&hosts(entries)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ManagementDomainMismatch {
                host: "ctrl-3".to_string(),
                domain: "rack-2".to_string(),
                expected: "rack-1".to_string(),
            }
        );
    }

    #[test]
    fn test_three_managements_need_storage_nodes() {
        let mut entries: Vec<Host> = (1..=3)
            .map(|i| host(&format!("ctrl-{}", i), "controller", &[ServiceProfile::Management]))
            .collect();
        entries.push(host("storage-1", "compute", &[ServiceProfile::Storage]));
        assert_eq!(
            validate(&hosts(entries.clone())).unwrap_err(),
            ValidationError::NotEnoughStorageNodes { count: 1 }
        );

        entries.push(host("storage-2", "compute", &[ServiceProfile::Storage]));
        assert!(validate(&hosts(entries)).is_ok());
    }

    #[test]
    fn test_ceph_storage_needs_storage_cluster() {
        let storage = storage_profiles();
        let check = |profiles: &IndexMap<String, NetworkProfile>, backend: &str| {
            let mut entry = host("storage-1", "compute", &[ServiceProfile::Storage]);
            entry.storage_profiles = vec![backend.to_string()];
            HostsValidator::new().validate(
                &hosts(vec![controller(), entry]),
                profiles,
                &networking(),
                Some(&storage),
            )
        };

        assert_eq!(
            check(&profiles(), "ceph_backend").unwrap_err(),
            ValidationError::NetworkNotMapped {
                host: "storage-1".to_string(),
                network: "infra_storage_cluster".to_string(),
            }
        );
        assert!(check(&profiles(), "lvm_backend").is_ok());
        assert!(matches!(
            check(&profiles(), "nfs_backend").unwrap_err(),
            ValidationError::UnknownStorageProfile { .. }
        ));

        let mut mapped = profiles();
        mapped["compute"]
            .interface_net_mapping
            .insert("eth1".to_string(), vec!["infra_storage_cluster".to_string()]);
        assert!(check(&mapped, "ceph_backend").is_ok());

        // Without the storage profiles document the backend is unknown
        let mut entry = host("storage-1", "compute", &[ServiceProfile::Storage]);
        entry.storage_profiles = vec!["ceph_backend".to_string()];
        assert!(validate(&hosts(vec![controller(), entry])).is_ok());
    }

    #[test]
    fn test_pre_allocated_ips() {
        let with_ip = |host: &mut Host, network: &str, address: &str| {
            host.pre_allocated_ips
                .insert(network.to_string(), address.parse().unwrap());
        };

        let mut ctrl = controller();
        with_ip(&mut ctrl, "infra_internal", "10.0.0.10");
        with_ip(&mut ctrl, "infra_external", "198.51.100.2");
        assert!(validate(&hosts(vec![ctrl])).is_ok());

        let mut ctrl = controller();
        with_ip(&mut ctrl, "infra_internal", "10.0.1.10");
        let err = validate(&hosts(vec![ctrl])).unwrap_err();
        assert!(matches!(err, ValidationError::AddressOutsideCidr { .. }));
        assert_eq!(err.context(), "ctrl-1");

        let mut compute = host("compute-1", "compute", &[ServiceProfile::Compute]);
        with_ip(&mut compute, "infra_external", "198.51.100.3");
        assert_eq!(
            validate(&hosts(vec![controller(), compute])).unwrap_err(),
            ValidationError::NetworkNotMapped {
                host: "compute-1".to_string(),
                network: "infra_external".to_string(),
            }
        );

        let mut profiles = profiles();
        profiles["compute"].interface_net_mapping["eth0"].push("caas_oam".to_string());
        let mut compute = host("compute-1", "compute", &[ServiceProfile::Compute]);
        with_ip(&mut compute, "caas_oam", "10.1.0.10");
        let err = HostsValidator::new()
            .validate(&hosts(vec![controller(), compute]), &profiles, &networking(), None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingNetworkDefinition { .. }));
    }

    #[test]
    fn test_duplicate_pre_allocated_ips() {
        let address: IpAddr = "10.0.0.10".parse().unwrap();
        let mut ctrl = controller();
        ctrl.pre_allocated_ips.insert("infra_internal".to_string(), address);
        let mut compute = host("compute-1", "compute", &[ServiceProfile::Compute]);
        compute.pre_allocated_ips.insert("infra_internal".to_string(), address);

        let err = validate(&hosts(vec![ctrl, compute])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicatePreallocatedIp {
                host: "ctrl-1".to_string(),
                other: "compute-1".to_string(),
                address,
            }
        );
        assert_eq!(err.kind(), ErrorKind::DuplicateMapping);
    }
}
