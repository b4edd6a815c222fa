//! `cloud.network_profiles` parser

use indexmap::IndexMap;
use log::debug;
use nettopo_core::{
    BondMode, NetworkProfile, ProviderNetAttachment, ProviderNetType, SriovAttachment, SriovType,
    ValidationError, ValidationResult,
};
use serde_json::Value;

use crate::reader::{expect_string_list, Section};
use crate::store::ConfigDomain;

pub const INTERFACE_NET_MAPPING: &str = "interface_net_mapping";
pub const BONDING_INTERFACES: &str = "bonding_interfaces";
pub const LINUX_BONDING_OPTIONS: &str = "linux_bonding_options";
pub const OVS_BONDING_OPTIONS: &str = "ovs_bonding_options";
pub const BONDING_OPTIONS: &str = "bonding_options";
pub const PROVIDER_NETWORK_INTERFACES: &str = "provider_network_interfaces";
pub const SRIOV_PROVIDER_NETWORKS: &str = "sriov_provider_networks";

/// Build every profile of the `cloud.network_profiles` document
pub fn parse_network_profiles(value: &Value) -> ValidationResult<IndexMap<String, NetworkProfile>> {
    let doc = Section::document(ConfigDomain::NetworkProfiles.key(), value)?;

    let mut profiles = IndexMap::new();
    for (name, value) in doc.entries() {
        let section = Section::nested(doc.context(), name, value)?.with_context(name.as_str());
        profiles.insert(name.clone(), parse_profile(name, &section)?);
    }

    debug!("Parsed {} network profiles", profiles.len());
    Ok(profiles)
}

pub fn parse_profile(name: &str, section: &Section<'_>) -> ValidationResult<NetworkProfile> {
    let mut profile = NetworkProfile::new(name);

    profile.interface_net_mapping = list_map(&section.section(INTERFACE_NET_MAPPING)?)?;
    if let Some(bonds) = section.opt_section(BONDING_INTERFACES)? {
        profile.bonding_interfaces = list_map(&bonds)?;
    }

    let generic = bonding_option(section, BONDING_OPTIONS)?;
    profile.linux_bonding_options = bonding_option(section, LINUX_BONDING_OPTIONS)?.or(generic);
    profile.ovs_bonding_options = bonding_option(section, OVS_BONDING_OPTIONS)?.or(generic);

    if let Some(interfaces) = section.opt_section(PROVIDER_NETWORK_INTERFACES)? {
        for (iface, value) in interfaces.entries() {
            let entry = Section::nested(name, iface, value)?;
            profile
                .provider_network_interfaces
                .insert(iface.clone(), parse_provider_attachment(iface, &entry)?);
        }
    }

    if let Some(networks) = section.opt_section(SRIOV_PROVIDER_NETWORKS)? {
        for (network, value) in networks.entries() {
            let entry = Section::nested(name, network, value)?;
            profile
                .sriov_provider_networks
                .insert(network.clone(), parse_sriov_attachment(network, &entry)?);
        }
    }

    Ok(profile)
}

/// Object whose values are non-empty lists of names
fn list_map(section: &Section<'_>) -> ValidationResult<IndexMap<String, Vec<String>>> {
    section
        .entries()
        .map(|(key, value)| Ok((key.clone(), expect_string_list(section.context(), key, value)?)))
        .collect()
}

fn bonding_option(section: &Section<'_>, field: &str) -> ValidationResult<Option<BondMode>> {
    let Some(value) = section.opt_string(field)? else {
        return Ok(None);
    };
    // Only the `mode=` spelling is accepted in documents
    let mode = BondMode::ALL.into_iter().find(|mode| mode.option_str() == value);
    mode.map(Some)
        .ok_or_else(|| ValidationError::InvalidBondingOptions {
            profile: section.context().to_string(),
            option: field.to_string(),
            value: value.to_string(),
        })
}

fn parse_provider_attachment(
    iface: &str,
    section: &Section<'_>,
) -> ValidationResult<ProviderNetAttachment> {
    let type_name = section.string("type")?;
    let net_type = type_name
        .parse::<ProviderNetType>()
        .map_err(|_| ValidationError::InvalidProviderType {
            interface: iface.to_string(),
            value: type_name.to_string(),
        })?;

    let mut attachment = ProviderNetAttachment::new(net_type, section.string_list("provider_networks")?);
    attachment.vf_count = section.opt_integer("vf_count")?;
    attachment.dpdk_max_rx_queues = section.opt_integer("dpdk_max_rx_queues")?;
    attachment.mtu_declared = section.has("mtu");
    Ok(attachment)
}

fn parse_sriov_attachment(network: &str, section: &Section<'_>) -> ValidationResult<SriovAttachment> {
    let mut attachment = SriovAttachment::new(section.string_list("interfaces")?);

    if let Some(type_name) = section.opt_string("type")? {
        let sriov_type = type_name
            .parse::<SriovType>()
            .map_err(|_| ValidationError::InvalidSriovType {
                network: network.to_string(),
                value: type_name.to_string(),
            })?;
        attachment.sriov_type = Some(sriov_type);
    }
    attachment.trusted = section.opt_bool("trusted")?;
    attachment.vf_count = section.opt_integer("vf_count")?;
    Ok(attachment)
}
