//! Typed topology model built from the domain documents

use indexmap::IndexMap;
use nettopo_core::{
    CaasConfig, Host, NetworkProfile, Networking, StorageProfile, ValidationResult,
};

use crate::caas::parse_caas;
use crate::hosts::parse_hosts;
use crate::networking::parse_networking;
use crate::profiles::parse_network_profiles;
use crate::reader::parse_document;
use crate::storage::parse_storage_profiles;
use crate::store::ConfigDomain;

/// Immutable view of one configuration snapshot. Domains absent from the
/// snapshot are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyModel {
    pub networking: Option<Networking>,
    pub profiles: Option<IndexMap<String, NetworkProfile>>,
    pub hosts: Option<IndexMap<String, Host>>,
    pub caas: Option<CaasConfig>,
    pub storage: Option<IndexMap<String, StorageProfile>>,
}

impl TopologyModel {
    /// Parse each `(domain, document)` pair into the model
    pub fn parse<'a, I>(documents: I) -> ValidationResult<Self>
    where
        I: IntoIterator<Item = (ConfigDomain, &'a str)>,
    {
        let mut model = TopologyModel::default();

        for (domain, text) in documents {
            let value = parse_document(domain.key(), text)?;
            match domain {
                ConfigDomain::Networking => model.networking = Some(parse_networking(&value)?),
                ConfigDomain::NetworkProfiles => {
                    model.profiles = Some(parse_network_profiles(&value)?)
                }
                ConfigDomain::Hosts => model.hosts = Some(parse_hosts(&value)?),
                ConfigDomain::Caas => model.caas = Some(parse_caas(&value)?),
                ConfigDomain::StorageProfiles => {
                    model.storage = Some(parse_storage_profiles(&value)?)
                }
            }
        }

        Ok(model)
    }

    /// True if some host carries a container platform role
    pub fn has_caas_hosts(&self) -> bool {
        self.hosts
            .as_ref()
            .map(|hosts| {
                hosts
                    .values()
                    .any(|host| host.service_profiles.iter().any(|role| role.is_caas()))
            })
            .unwrap_or(false)
    }
}
