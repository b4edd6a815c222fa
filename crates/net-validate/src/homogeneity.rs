//! Cross-host wiring consistency of the container networks
//!
//! Every host running container workloads must attach each required CaaS
//! network the same way: through the same `caas` provider interface, or
//! through SR-IOV interface sets that share at least one member.

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use nettopo_core::{Host, NetworkProfile, ValidationError, ValidationResult};

/// How a host reaches a CaaS network
#[derive(Debug, Clone, Copy, PartialEq)]
enum Wiring<'a> {
    Provider(&'a str),
    Sriov(&'a [String]),
}

impl<'a> Wiring<'a> {
    fn of(profile: &'a NetworkProfile, network: &str) -> Option<Self> {
        profile
            .caas_provider_interface(network)
            .map(Wiring::Provider)
            .or_else(|| profile.caas_sriov_interfaces(network).map(Wiring::Sriov))
    }

    fn matches(&self, other: &Wiring<'_>) -> bool {
        match (self, other) {
            (Wiring::Provider(a), Wiring::Provider(b)) => a == b,
            (Wiring::Sriov(a), Wiring::Sriov(b)) => a.iter().any(|iface| b.contains(iface)),
            _ => false,
        }
    }
}

impl fmt::Display for Wiring<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wiring::Provider(iface) => f.write_str(iface),
            Wiring::Sriov(ifaces) => f.write_str(&ifaces.join(",")),
        }
    }
}

/// Check that every CaaS workload host wires each of `required_networks`
/// like the first such host does
pub fn validate_homogeneity(
    hosts: &IndexMap<String, Host>,
    profiles: &IndexMap<String, NetworkProfile>,
    required_networks: &[String],
) -> ValidationResult {
    let workload_hosts: Vec<(&Host, Option<&NetworkProfile>)> = hosts
        .values()
        .filter(|host| host.runs_caas_workloads())
        .map(|host| {
            let profile = host.network_profiles.first().and_then(|name| profiles.get(name));
            (host, profile)
        })
        .collect();

    for network in required_networks {
        let mut reference: Option<Wiring<'_>> = None;

        for &(host, profile) in &workload_hosts {
            let wiring = profile
                .and_then(|profile| Wiring::of(profile, network))
                .ok_or_else(|| ValidationError::NetworkMissingFromHost {
                    network: network.clone(),
                    host: host.name.clone(),
                })?;

            match reference {
                None => reference = Some(wiring),
                Some(expected) if !expected.matches(&wiring) => {
                    return Err(ValidationError::InconsistentNetworkWiring {
                        network: network.clone(),
                        host: host.name.clone(),
                        interface: wiring.to_string(),
                        expected: expected.to_string(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    debug!(
        "{} CaaS networks wired consistently on {} hosts",
        required_networks.len(),
        workload_hosts.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nettopo_core::{
        ErrorKind, ProviderNetAttachment, ProviderNetType, ServiceProfile, SriovAttachment, SriovType,
    };

    fn caas_profile(name: &str, iface: &str) -> NetworkProfile {
        let mut profile = NetworkProfile::new(name);
        profile.provider_network_interfaces.insert(
            iface.to_string(),
            ProviderNetAttachment::new(ProviderNetType::Caas, vec!["caasnet".to_string()]),
        );
        profile
    }

    fn sriov_profile(name: &str, ifaces: &[&str]) -> NetworkProfile {
        let mut profile = NetworkProfile::new(name);
        let mut sriov = SriovAttachment::new(ifaces.iter().map(|i| i.to_string()).collect());
        sriov.sriov_type = Some(SriovType::Caas);
        profile.sriov_provider_networks.insert("caasnet".to_string(), sriov);
        profile
    }

    fn worker(name: &str, profile: &str) -> Host {
        let mut host = Host::new(name);
        host.network_profiles = vec![profile.to_string()];
        host.service_profiles = vec![ServiceProfile::CaasWorker];
        host
    }

    fn index<T>(items: Vec<(String, T)>) -> IndexMap<String, T> {
        items.into_iter().collect()
    }

    fn required() -> Vec<String> {
        vec!["caasnet".to_string()]
    }

    #[test]
    fn test_consistent_provider_wiring() {
        let profiles = index(vec![
            ("p1".to_string(), caas_profile("p1", "eth1")),
            ("p2".to_string(), caas_profile("p2", "eth1")),
        ]);
        let hosts = index(vec![
            ("w1".to_string(), worker("w1", "p1")),
            ("w2".to_string(), worker("w2", "p2")),
        ]);
        assert!(validate_homogeneity(&hosts, &profiles, &required()).is_ok());
    }

    #[test]
    fn test_inconsistent_provider_wiring() {
        let profiles = index(vec![
            ("p1".to_string(), caas_profile("p1", "eth1")),
            ("p2".to_string(), caas_profile("p2", "eth2")),
        ]);
        let hosts = index(vec![
            ("w1".to_string(), worker("w1", "p1")),
            ("w2".to_string(), worker("w2", "p2")),
        ]);
        let err = validate_homogeneity(&hosts, &profiles, &required()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InconsistentNetworkWiring {
                network: "caasnet".to_string(),
                host: "w2".to_string(),
                interface: "eth2".to_string(),
                expected: "eth1".to_string(),
            }
        );
        assert_eq!(err.kind(), ErrorKind::HomogeneityViolation);
    }

    #[test]
    fn test_sriov_sets_must_intersect() {
        let profiles = index(vec![
            ("p1".to_string(), sriov_profile("p1", &["eth4", "eth5"])),
            ("p2".to_string(), sriov_profile("p2", &["eth5", "eth6"])),
            ("p3".to_string(), sriov_profile("p3", &["eth7"])),
        ]);
        let hosts = index(vec![
            ("w1".to_string(), worker("w1", "p1")),
            ("w2".to_string(), worker("w2", "p2")),
        ]);
        assert!(validate_homogeneity(&hosts, &profiles, &required()).is_ok());

        let hosts = index(vec![
            ("w1".to_string(), worker("w1", "p1")),
            ("w3".to_string(), worker("w3", "p3")),
        ]);
        let err = validate_homogeneity(&hosts, &profiles, &required()).unwrap_err();
        assert!(matches!(err, ValidationError::InconsistentNetworkWiring { .. }));
    }

    #[test]
    fn test_provider_and_sriov_mismatch() {
        let profiles = index(vec![
            ("p1".to_string(), caas_profile("p1", "eth4")),
            ("p2".to_string(), sriov_profile("p2", &["eth4"])),
        ]);
        let hosts = index(vec![
            ("w1".to_string(), worker("w1", "p1")),
            ("w2".to_string(), worker("w2", "p2")),
        ]);
        assert!(validate_homogeneity(&hosts, &profiles, &required()).is_err());
    }

    #[test]
    fn test_network_missing_from_host() {
        let profiles = index(vec![
            ("p1".to_string(), caas_profile("p1", "eth1")),
            ("p2".to_string(), NetworkProfile::new("p2")),
        ]);
        let hosts = index(vec![
            ("w1".to_string(), worker("w1", "p1")),
            ("w2".to_string(), worker("w2", "p2")),
        ]);
        let err = validate_homogeneity(&hosts, &profiles, &required()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NetworkMissingFromHost {
                network: "caasnet".to_string(),
                host: "w2".to_string(),
            }
        );
    }

    #[test]
    fn test_non_workload_hosts_ignored() {
        let profiles = index(vec![
            ("p1".to_string(), caas_profile("p1", "eth1")),
            ("p2".to_string(), NetworkProfile::new("p2")),
        ]);
        let mut master = worker("m1", "p2");
        master.service_profiles = vec![ServiceProfile::CaasMaster, ServiceProfile::Compute];
        let hosts = index(vec![
            ("w1".to_string(), worker("w1", "p1")),
            ("m1".to_string(), master),
        ]);
        assert!(validate_homogeneity(&hosts, &profiles, &required()).is_ok());
    }
}
