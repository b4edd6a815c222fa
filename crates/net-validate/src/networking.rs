//! Global network catalogue validation

use std::net::IpAddr;

use ipnet::IpNet;
use log::debug;
use nettopo_core::interface::NameRules;
use nettopo_core::range::{first_duplicate, first_overlap};
use nettopo_core::vlan::{validate_mtu, validate_vlan_id, validate_vlan_ranges};
use nettopo_core::{
    DomainInstance, InfraNetwork, InfraRole, Networking, ValidationError, ValidationResult,
    MAX_DNS_SERVERS,
};

const CONTEXT: &str = "cloud.networking";

/// Validator for `cloud.networking`
pub struct NetworkingValidator {
    names: NameRules,
}

impl NetworkingValidator {
    pub fn new() -> Self {
        Self {
            names: NameRules::new(),
        }
    }

    pub fn validate(&self, networking: &Networking) -> ValidationResult {
        self.validate_dns(networking)?;
        if let Some(mtu) = networking.mtu {
            validate_mtu(CONTEXT, mtu)?;
        }

        for role in InfraRole::ALL {
            match networking.infra.get(&role) {
                Some(network) => self.validate_infra_network(network)?,
                None if role.is_mandatory() => {
                    return Err(ValidationError::MissingField {
                        context: CONTEXT.to_string(),
                        field: role.network_name().to_string(),
                    })
                }
                None => debug!("Optional network {} not configured", role),
            }
        }
        validate_no_duplicate_infra_vlans(networking)?;

        self.validate_provider_networks(networking)?;
        validate_no_overlapping_cidrs(networking)?;

        debug!("Network catalogue is valid");
        Ok(())
    }

    fn validate_dns(&self, networking: &Networking) -> ValidationResult {
        if networking.dns.len() > MAX_DNS_SERVERS {
            return Err(ValidationError::TooManyDns {
                count: networking.dns.len(),
                max: MAX_DNS_SERVERS,
            });
        }
        Ok(())
    }

    fn validate_infra_network(&self, network: &InfraNetwork) -> ValidationResult {
        let name = network.role.network_name();
        let context = format!("{} network domain", name);

        for domain_name in network.domains.keys() {
            self.names.validate_network_name(&context, domain_name)?;
        }
        if let Some(mtu) = network.mtu {
            validate_mtu(name, mtu)?;
        }

        for domain in network.domains.values() {
            validate_domain_instance(network.role, domain)?;
        }
        Ok(())
    }

    fn validate_provider_networks(&self, networking: &Networking) -> ValidationResult {
        let mut shared: Option<&str> = None;

        for (name, network) in &networking.provider_networks {
            self.names.validate_network_name("provider network", name)?;
            if let Some(mtu) = network.mtu {
                validate_mtu(name, mtu)?;
            }
            validate_vlan_ranges(name, &network.vlan_ranges)?;

            if network.shared {
                if let Some(first) = shared {
                    return Err(ValidationError::SharedProviderNetworks {
                        first: first.to_string(),
                        second: name.clone(),
                    });
                }
                shared = Some(name);
            }
        }
        Ok(())
    }
}

impl Default for NetworkingValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_domain_instance(role: InfraRole, domain: &DomainInstance) -> ValidationResult {
    let network = role.network_name();
    let context = format!("{} network domain {}", network, domain.name);

    if let Some(vlan) = domain.vlan {
        validate_vlan_id(network, vlan)?;
    }
    validate_ip_range(&context, domain)?;

    for route in &domain.routes {
        if route.to.prefix_len() == 0 {
            return Err(ValidationError::DefaultRoute {
                network: network.to_string(),
                domain: domain.name.clone(),
            });
        }
        validate_outside_range(&context, "via", &route.via, domain)?;
    }

    if domain.mtu.is_some() {
        return Err(ValidationError::MtuInsideNetworkDomain {
            network: network.to_string(),
            domain: domain.name.clone(),
        });
    }

    match (role.requires_gateway(), domain.gateway) {
        (true, Some(gateway)) => validate_outside_range(&context, "gateway", &gateway, domain),
        (true, None) => Err(ValidationError::MissingField {
            context,
            field: "gateway".to_string(),
        }),
        (false, Some(_)) => Err(ValidationError::GatewayNotSupported {
            network: network.to_string(),
            domain: domain.name.clone(),
        }),
        (false, None) => Ok(()),
    }
}

/// Declared range bounds must be inside the CIDR and ordered
fn validate_ip_range(context: &str, domain: &DomainInstance) -> ValidationResult {
    for (field, bound) in [
        ("ip_range_start", domain.ip_range_start),
        ("ip_range_end", domain.ip_range_end),
    ] {
        if let Some(addr) = bound {
            validate_inside_cidr(context, field, &addr, &domain.cidr)?;
        }
    }

    if domain.range_size() == 0 {
        return Err(ValidationError::InvalidIpRange {
            context: context.to_string(),
            start: domain.range_start().to_string(),
            end: domain.range_end().to_string(),
        });
    }
    Ok(())
}

fn validate_inside_cidr(context: &str, field: &str, addr: &IpAddr, cidr: &IpNet) -> ValidationResult {
    if !cidr.contains(addr) {
        return Err(ValidationError::AddressOutsideCidr {
            context: context.to_string(),
            field: field.to_string(),
            address: addr.to_string(),
            cidr: *cidr,
        });
    }
    Ok(())
}

/// Gateways and route next hops live in the CIDR but outside the allocatable range
fn validate_outside_range(
    context: &str,
    field: &str,
    addr: &IpAddr,
    domain: &DomainInstance,
) -> ValidationResult {
    validate_inside_cidr(context, field, addr, &domain.cidr)?;
    if domain.in_range(addr) {
        return Err(ValidationError::AddressInsideRange {
            context: context.to_string(),
            field: field.to_string(),
            address: addr.to_string(),
            start: domain.range_start().to_string(),
            end: domain.range_end().to_string(),
        });
    }
    Ok(())
}

/// Infra networks sharing a network domain need distinct VLAN IDs
fn validate_no_duplicate_infra_vlans(networking: &Networking) -> ValidationResult {
    let mut domains: Vec<(&str, Vec<i64>)> = Vec::new();

    for (_, domain) in networking.domain_instances() {
        let Some(vlan) = domain.vlan else { continue };
        match domains.iter_mut().find(|(name, _)| *name == domain.name) {
            Some((_, vlans)) => vlans.push(vlan),
            None => domains.push((domain.name.as_str(), vec![vlan])),
        }
    }

    for (name, vlans) in &domains {
        if let Some(vlan) = first_duplicate(vlans) {
            return Err(ValidationError::DuplicateInfraVlan {
                domain: name.to_string(),
                vlan: *vlan,
            });
        }
    }
    Ok(())
}

fn validate_no_overlapping_cidrs(networking: &Networking) -> ValidationResult {
    let cidrs: Vec<IpNet> = networking
        .domain_instances()
        .map(|(_, domain)| domain.cidr)
        .collect();

    if let Some((first, second)) = first_overlap(&cidrs) {
        return Err(ValidationError::CidrsOverlapping {
            first: *first,
            second: *second,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use nettopo_core::{ErrorKind, ProviderNetwork, Route, VlanRange};

    fn domain(name: &str, cidr: &str, vlan: Option<i64>) -> DomainInstance {
        let mut domain = DomainInstance::new(name, cidr.parse().unwrap());
        domain.vlan = vlan;
        domain
    }

    fn network(role: InfraRole, domains: Vec<DomainInstance>) -> InfraNetwork {
        let mut network = InfraNetwork::new(role);
        network.domains = domains
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect::<IndexMap<_, _>>();
        network
    }

    fn gateway_domain(name: &str, cidr: &str, gateway: &str, vlan: Option<i64>) -> DomainInstance {
        let mut domain = domain(name, cidr, vlan);
        domain.gateway = Some(gateway.parse().unwrap());
        domain.ip_range_start = Some(offset(gateway, 9));
        domain
    }

    fn offset(addr: &str, by: u8) -> IpAddr {
        let IpAddr::V4(v4) = addr.parse::<IpAddr>().unwrap() else {
            unreachable!()
        };
        let mut octets = v4.octets();
        octets[3] += by;
        IpAddr::from(octets)
    }

    fn valid_networking() -> Networking {
        let mut networking = Networking {
            dns: vec!["192.0.2.53".parse().unwrap()],
            ..Default::default()
        };
        networking.infra.insert(
            InfraRole::Internal,
            network(InfraRole::Internal, vec![domain("rack-1", "10.0.0.0/24", Some(100))]),
        );
        networking.infra.insert(
            InfraRole::External,
            network(
                InfraRole::External,
                vec![gateway_domain("rack-1", "198.51.100.0/24", "198.51.100.1", Some(101))],
            ),
        );
        networking.infra.insert(
            InfraRole::CaasOam,
            network(
                InfraRole::CaasOam,
                vec![gateway_domain("rack-1", "10.1.0.0/24", "10.1.0.1", Some(102))],
            ),
        );
        networking
    }

    #[test]
    fn test_valid_networking() {
        let validator = NetworkingValidator::new();
        assert!(validator.validate(&valid_networking()).is_ok());
    }

    #[test]
    fn test_missing_mandatory_network() {
        let mut networking = valid_networking();
        networking.infra.shift_remove(&InfraRole::CaasOam);

        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert!(err.to_string().contains("caas_oam"));
    }

    #[test]
    fn test_too_many_dns() {
        let mut networking = valid_networking();
        networking.dns = vec![
            "192.0.2.1".parse().unwrap(),
            "192.0.2.2".parse().unwrap(),
            "192.0.2.3".parse().unwrap(),
        ];
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::TooManyDns { count: 3, max: 2 }));
    }

    #[test]
    fn test_duplicate_infra_vlan() {
        let mut networking = valid_networking();
        networking.infra[&InfraRole::Internal].domains["rack-1"].vlan = Some(200);
        networking.infra[&InfraRole::External].domains["rack-1"].vlan = Some(200);

        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateInfraVlan {
                domain: "rack-1".to_string(),
                vlan: 200
            }
        );
        assert_eq!(err.kind(), ErrorKind::DuplicateMapping);
    }

    #[test]
    fn test_same_vlan_in_different_domains() {
        let mut networking = valid_networking();
        let internal = networking.infra.get_mut(&InfraRole::Internal).unwrap();
        internal
            .domains
            .insert("rack-2".to_string(), domain("rack-2", "10.2.0.0/24", Some(100)));
        assert!(NetworkingValidator::new().validate(&networking).is_ok());
    }

    #[test]
    fn test_overlapping_cidrs() {
        let mut networking = valid_networking();
        let internal = networking.infra.get_mut(&InfraRole::Internal).unwrap();
        internal
            .domains
            .insert("rack-2".to_string(), domain("rack-2", "10.0.0.128/25", Some(110)));

        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverlapConflict);
    }

    #[test]
    fn test_gateway_rules() {
        let mut networking = valid_networking();
        networking.infra[&InfraRole::Internal].domains["rack-1"].gateway =
            Some("10.0.0.1".parse().unwrap());
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::GatewayNotSupported { .. }));

        let mut networking = valid_networking();
        networking.infra[&InfraRole::External].domains["rack-1"].gateway = None;
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);

        // Inside the allocatable range
        let mut networking = valid_networking();
        networking.infra[&InfraRole::External].domains["rack-1"].gateway =
            Some("198.51.100.50".parse().unwrap());
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::AddressInsideRange { .. }));
    }

    #[test]
    fn test_routes() {
        let mut networking = valid_networking();
        networking.infra[&InfraRole::External].domains["rack-1"]
            .routes
            .push(Route {
                to: "0.0.0.0/0".parse().unwrap(),
                via: "198.51.100.2".parse().unwrap(),
            });
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::DefaultRoute { .. }));

        let mut networking = valid_networking();
        networking.infra[&InfraRole::External].domains["rack-1"]
            .routes
            .push(Route {
                to: "203.0.113.0/24".parse().unwrap(),
                via: "198.51.100.2".parse().unwrap(),
            });
        assert!(NetworkingValidator::new().validate(&networking).is_ok());
    }

    #[test]
    fn test_mtu_inside_domain() {
        let mut networking = valid_networking();
        networking.infra[&InfraRole::Internal].domains["rack-1"].mtu = Some(1500);
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::MtuInsideNetworkDomain { .. }));
    }

    #[test]
    fn test_invalid_ip_range() {
        let mut networking = valid_networking();
        let rack = &mut networking.infra[&InfraRole::Internal].domains["rack-1"];
        rack.ip_range_start = Some("10.0.0.100".parse().unwrap());
        rack.ip_range_end = Some("10.0.0.10".parse().unwrap());
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidIpRange { .. }));
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let mut networking = valid_networking();
        networking.infra[&InfraRole::Internal].domains["rack-1"].ip_range_end =
            Some("10.0.1.10".parse().unwrap());
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::AddressOutsideCidr { .. }));
    }

    #[test]
    fn test_invalid_domain_name() {
        let mut networking = valid_networking();
        let internal = networking.infra.get_mut(&InfraRole::Internal).unwrap();
        internal
            .domains
            .insert("rack_".to_string(), domain("rack_", "10.3.0.0/24", None));
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_shared_provider_networks() {
        let mut networking = valid_networking();
        for name in ["physnet1", "physnet2"] {
            let mut network = ProviderNetwork::new(name, vec![VlanRange::new(10, 20)]);
            network.shared = name == "physnet1";
            networking.provider_networks.insert(name.to_string(), network);
        }
        assert!(NetworkingValidator::new().validate(&networking).is_ok());

        networking.provider_networks["physnet2"].shared = true;
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralConflict);
        assert!(matches!(err, ValidationError::SharedProviderNetworks { .. }));
    }

    #[test]
    fn test_provider_vlan_ranges() {
        let mut networking = valid_networking();
        networking.provider_networks.insert(
            "physnet1".to_string(),
            ProviderNetwork::new("physnet1", vec![VlanRange::new(10, 20), VlanRange::new(15, 30)]),
        );
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert!(matches!(err, ValidationError::VlanRangesOverlapping { .. }));

        networking.provider_networks["physnet1"].vlan_ranges = vec![VlanRange::new(4000, 4095)];
        let err = NetworkingValidator::new().validate(&networking).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }
}
