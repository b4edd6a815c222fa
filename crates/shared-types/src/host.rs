use std::convert::Infallible;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Service role assigned to a host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceProfile {
    Management,
    Controller,
    CaasMaster,
    CaasWorker,
    Base,
    Storage,
    Compute,
    Other(String),
}

impl ServiceProfile {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceProfile::Management => "management",
            ServiceProfile::Controller => "controller",
            ServiceProfile::CaasMaster => "caas_master",
            ServiceProfile::CaasWorker => "caas_worker",
            ServiceProfile::Base => "base",
            ServiceProfile::Storage => "storage",
            ServiceProfile::Compute => "compute",
            ServiceProfile::Other(name) => name,
        }
    }

    pub fn is_caas(&self) -> bool {
        matches!(self, ServiceProfile::CaasMaster | ServiceProfile::CaasWorker)
    }
}

impl FromStr for ServiceProfile {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "management" => ServiceProfile::Management,
            "controller" => ServiceProfile::Controller,
            "caas_master" => ServiceProfile::CaasMaster,
            "caas_worker" => ServiceProfile::CaasWorker,
            "base" => ServiceProfile::Base,
            "storage" => ServiceProfile::Storage,
            "compute" => ServiceProfile::Compute,
            other => ServiceProfile::Other(other.to_string()),
        })
    }
}

impl fmt::Display for ServiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host entry of `cloud.hosts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub network_domain: Option<String>,
    #[serde(default)]
    pub network_profiles: Vec<String>,
    #[serde(default)]
    pub service_profiles: Vec<ServiceProfile>,
    #[serde(default)]
    pub storage_profiles: Vec<String>,
    /// Fixed addresses keyed by infra network name
    #[serde(default)]
    pub pre_allocated_ips: IndexMap<String, IpAddr>,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            network_domain: None,
            network_profiles: Vec::new(),
            service_profiles: Vec::new(),
            storage_profiles: Vec::new(),
            pre_allocated_ips: IndexMap::new(),
        }
    }

    pub fn has_role(&self, role: &ServiceProfile) -> bool {
        self.service_profiles.contains(role)
    }

    /// Workers, and masters that do not double as compute nodes, run containers
    pub fn runs_caas_workloads(&self) -> bool {
        self.has_role(&ServiceProfile::CaasWorker)
            || (self.has_role(&ServiceProfile::CaasMaster)
                && !self.has_role(&ServiceProfile::Compute))
    }

    /// The profile name, when exactly one is declared
    pub fn network_profile(&self) -> Option<&str> {
        match self.network_profiles.as_slice() {
            [profile] => Some(profile.as_str()),
            _ => None,
        }
    }
}
