//! `cloud.hosts` parser

use std::net::IpAddr;

use indexmap::IndexMap;
use nettopo_core::{Host, ServiceProfile, ValidationResult};
use serde_json::Value;

use crate::reader::{expect_str, parse_ip, Section};
use crate::store::ConfigDomain;

pub fn parse_hosts(value: &Value) -> ValidationResult<IndexMap<String, Host>> {
    let doc = Section::document(ConfigDomain::Hosts.key(), value)?;

    let mut hosts = IndexMap::new();
    for (name, value) in doc.entries() {
        let section = Section::nested(doc.context(), name, value)?.with_context(name.as_str());
        hosts.insert(name.clone(), parse_host(name, &section)?);
    }
    Ok(hosts)
}

/// Profile counts are left to the hosts checker so it can name the host
fn parse_host(name: &str, section: &Section<'_>) -> ValidationResult<Host> {
    let mut host = Host::new(name);
    host.network_domain = section.opt_string("network_domain")?.map(str::to_string);
    host.network_profiles = section.opt_strings("network_profiles")?;
    host.service_profiles = section
        .opt_strings("service_profiles")?
        .iter()
        .filter_map(|role| role.parse::<ServiceProfile>().ok())
        .collect();
    host.storage_profiles = section.opt_strings("storage_profiles")?;
    host.pre_allocated_ips = parse_pre_allocated_ips(section)?;
    Ok(host)
}

/// An empty dictionary means no preallocation
fn parse_pre_allocated_ips(section: &Section<'_>) -> ValidationResult<IndexMap<String, IpAddr>> {
    let ips = match section.get("pre_allocated_ips") {
        None => return Ok(IndexMap::new()),
        Some(value) if value.as_object().is_some_and(|map| map.is_empty()) => {
            return Ok(IndexMap::new())
        }
        Some(value) => Section::nested(section.context(), "pre_allocated_ips", value)?,
    };

    ips.entries()
        .map(|(network, value)| {
            let text = expect_str(ips.context(), network, value)?;
            Ok((network.clone(), parse_ip(ips.context(), network, text)?))
        })
        .collect()
}
