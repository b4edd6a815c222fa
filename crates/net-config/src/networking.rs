//! `cloud.networking` parser

use std::net::IpAddr;

use indexmap::IndexMap;
use log::debug;
use nettopo_core::{
    DomainInstance, InfraNetwork, InfraRole, Networking, ProviderNetwork, Route, ValidationError,
    ValidationResult, VlanRange,
};
use serde_json::Value;

use crate::reader::{expect_str, parse_cidr, parse_ip, wrong_type, Section};
use crate::store::ConfigDomain;

pub const DNS: &str = "dns";
pub const MTU: &str = "mtu";
pub const NETWORK_DOMAINS: &str = "network_domains";
pub const PROVIDER_NETWORKS: &str = "provider_networks";

/// Build the typed network catalogue from its JSON document
pub fn parse_networking(value: &Value) -> ValidationResult<Networking> {
    let doc = Section::document(ConfigDomain::Networking.key(), value)?;

    let dns = parse_dns(&doc)?;
    let mtu = doc.opt_integer(MTU)?;

    let mut infra = IndexMap::new();
    for role in InfraRole::ALL {
        if let Some(section) = doc.opt_section(role.network_name())? {
            let network = parse_infra_network(role, section.with_context(role.network_name()))?;
            infra.insert(role, network);
        }
    }

    let mut provider_networks = IndexMap::new();
    if let Some(section) = doc.opt_section(PROVIDER_NETWORKS)? {
        let section = section.with_context(PROVIDER_NETWORKS);
        for (name, value) in section.entries() {
            let entry = Section::nested(PROVIDER_NETWORKS, name, value)?.with_context(name.as_str());
            provider_networks.insert(name.clone(), parse_provider_network(name, &entry)?);
        }
    }

    debug!(
        "Parsed networking: {} infra networks, {} provider networks",
        infra.len(),
        provider_networks.len()
    );

    Ok(Networking {
        dns,
        mtu,
        infra,
        provider_networks,
    })
}

/// Non-empty, duplicate-free list of server addresses; the count limit is
/// left to the checker.
fn parse_dns(doc: &Section<'_>) -> ValidationResult<Vec<IpAddr>> {
    let servers = doc.string_list(DNS)?;
    let mut dns: Vec<IpAddr> = Vec::with_capacity(servers.len());
    for server in &servers {
        let addr = parse_ip(doc.context(), DNS, server)?;
        if dns.contains(&addr) {
            return Err(wrong_type(doc.context(), DNS, "a duplicate-free list"));
        }
        dns.push(addr);
    }
    Ok(dns)
}

fn parse_infra_network(role: InfraRole, section: Section<'_>) -> ValidationResult<InfraNetwork> {
    let mut network = InfraNetwork::new(role);
    network.mtu = section.opt_integer(MTU)?;

    let domains = section.section(NETWORK_DOMAINS)?;
    for (name, value) in domains.entries() {
        let context = format!("{} network domain {}", role, name);
        let domain = Section::nested(section.context(), name, value)?.with_context(context);
        network
            .domains
            .insert(name.clone(), parse_domain_instance(name, &domain)?);
    }

    Ok(network)
}

fn parse_domain_instance(name: &str, section: &Section<'_>) -> ValidationResult<DomainInstance> {
    let mut domain = DomainInstance::new(name, section.cidr("cidr")?);
    domain.vlan = section.opt_integer("vlan")?;
    domain.gateway = section.opt_ip("gateway")?;
    domain.ip_range_start = section.opt_ip("ip_range_start")?;
    domain.ip_range_end = section.opt_ip("ip_range_end")?;
    domain.mtu = section.opt_integer(MTU)?;

    if let Some(routes) = section.get("routes") {
        domain.routes = parse_routes(section.context(), routes)?;
    }

    Ok(domain)
}

fn parse_routes(context: &str, value: &Value) -> ValidationResult<Vec<Route>> {
    let invalid = || wrong_type(context, "routes", "a non-empty list of {to, via} entries");

    let entries = value.as_array().filter(|list| !list.is_empty()).ok_or_else(invalid)?;
    entries
        .iter()
        .map(|entry| {
            let route = entry.as_object().ok_or_else(invalid)?;
            let to = route.get("to").ok_or_else(invalid)?;
            let via = route.get("via").ok_or_else(invalid)?;
            Ok(Route {
                to: parse_cidr(context, "to", expect_str(context, "to", to)?)?,
                via: parse_ip(context, "via", expect_str(context, "via", via)?)?,
            })
        })
        .collect()
}

fn parse_provider_network(name: &str, section: &Section<'_>) -> ValidationResult<ProviderNetwork> {
    let ranges = section.string("vlan_ranges")?;
    let vlan_ranges = VlanRange::parse_list(ranges).map_err(|_| ValidationError::InvalidVlanRanges {
        network: name.to_string(),
        value: ranges.to_string(),
    })?;

    let mut network = ProviderNetwork::new(name, vlan_ranges);
    network.mtu = section.opt_integer(MTU)?;
    network.shared = section.opt_bool("shared")?.unwrap_or(false);
    Ok(network)
}
