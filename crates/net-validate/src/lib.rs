//! Network topology validation
//!
//! Checkers for the network catalogue, the network profiles, host
//! assignment and CaaS wiring, and the orchestrator that picks the checks
//! a configuration change needs.

pub mod caas;
pub mod homogeneity;
pub mod hosts;
pub mod networking;
pub mod profile;
pub mod provider;
pub mod sharing;


pub use caas::CaasValidator;
pub use homogeneity::validate_homogeneity;
pub use hosts::HostsValidator;
pub use networking::NetworkingValidator;
pub use profile::ProfileValidator;
pub use provider::ProviderValidator;

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info, warn};
use nettopo_config::{ConfigDomain, ConfigSnapshot, PropertyStore, TopologyModel};
use nettopo_core::{NetworkError, NetworkProfile, Networking, ValidationError, ValidationResult};

/// Caller supplied switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Hosts are virtual machines: several untagged networks may share an interface
    pub virtualized: bool,
}

/// Checks a configuration change has to pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CheckPlan {
    networking: bool,
    profiles: bool,
    hosts: bool,
    caas: bool,
}

impl CheckPlan {
    /// Each domain invalidates its own checks and those of every domain
    /// that refers to it
    fn for_changes(changed: &[ConfigDomain]) -> Self {
        let mut plan = CheckPlan::default();
        for domain in changed {
            match domain {
                ConfigDomain::Networking => {
                    plan.networking = true;
                    plan.profiles = true;
                    plan.hosts = true;
                    plan.caas = true;
                }
                ConfigDomain::NetworkProfiles => {
                    plan.profiles = true;
                    plan.hosts = true;
                    plan.caas = true;
                }
                ConfigDomain::Hosts => {
                    plan.hosts = true;
                    plan.caas = true;
                }
                ConfigDomain::Caas => plan.caas = true,
                ConfigDomain::StorageProfiles => plan.hosts = true,
            }
        }
        plan
    }
}

/// Validation orchestrator
pub struct TopologyValidator {
    networking: NetworkingValidator,
    profile: ProfileValidator,
    provider: ProviderValidator,
    hosts: HostsValidator,
    caas: CaasValidator,
    options: ValidationOptions,
}

impl TopologyValidator {
    pub fn new() -> Self {
        Self::with_options(ValidationOptions::default())
    }

    pub fn with_options(options: ValidationOptions) -> Self {
        Self {
            networking: NetworkingValidator::new(),
            profile: ProfileValidator::new(),
            provider: ProviderValidator::new(),
            hosts: HostsValidator::new(),
            caas: CaasValidator::new(),
            options,
        }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validate a proposed change: `proposed` maps domain keys to their new
    /// JSON documents, the other domains are read from `store`
    pub async fn validate_set(
        &self,
        proposed: &HashMap<String, String>,
        store: &dyn PropertyStore,
    ) -> nettopo_core::Result<()> {
        let snapshot = ConfigSnapshot::load(proposed, store).await?;
        let model = snapshot.model()?;
        self.validate_model(&model, snapshot.changed())
            .map_err(NetworkError::from)
    }

    /// Run the checks selected by `changed` against a parsed snapshot
    pub fn validate_model(&self, model: &TopologyModel, changed: &[ConfigDomain]) -> ValidationResult {
        let plan = CheckPlan::for_changes(changed);
        debug!("Validating {:?} for changes to {:?}", plan, changed);

        if plan.networking {
            self.networking.validate(require_networking(model, ConfigDomain::Networking)?)?;
        }

        if plan.profiles {
            match &model.profiles {
                Some(profiles) => {
                    let networking = require_networking(model, ConfigDomain::NetworkProfiles)?;
                    self.validate_profiles(profiles, networking)?;
                }
                None => warn!("No network profiles configured, skipping profile checks"),
            }
        }

        if plan.hosts {
            match (&model.hosts, &model.profiles, &model.networking) {
                (Some(hosts), Some(profiles), Some(networking)) => {
                    self.hosts.validate(hosts, profiles, networking, model.storage.as_ref())?
                }
                (Some(_), _, _) => warn!("Hosts configured without profiles or networking, skipping host checks"),
                (None, _, _) => warn!("No hosts configured, skipping host checks"),
            }
        }

        if plan.caas {
            self.validate_caas(model)?;
        }

        info!("Network topology validation passed");
        Ok(())
    }

    /// Structural checks, then provider and SR-IOV checks, per profile
    pub fn validate_profiles(
        &self,
        profiles: &IndexMap<String, NetworkProfile>,
        networking: &Networking,
    ) -> ValidationResult {
        for profile in profiles.values() {
            self.profile.validate(profile, networking, &self.options)?;
            self.provider.validate(profile, networking)?;
        }
        Ok(())
    }

    fn validate_caas(&self, model: &TopologyModel) -> ValidationResult {
        if !model.has_caas_hosts() {
            warn!("No host carries a CaaS service profile, skipping CaaS checks");
            return Ok(());
        }
        let caas = model.caas.as_ref().ok_or_else(|| ValidationError::MissingField {
            context: ConfigDomain::Hosts.key().to_string(),
            field: ConfigDomain::Caas.key().to_string(),
        })?;

        self.caas.validate_networks(caas)?;
        if let Some(networking) = &model.networking {
            self.caas.validate_docker0(caas, networking)?;
        }

        let (no_hosts, no_profiles) = (IndexMap::new(), IndexMap::new());
        let hosts = model.hosts.as_ref().unwrap_or(&no_hosts);
        let profiles = model.profiles.as_ref().unwrap_or(&no_profiles);
        validate_homogeneity(hosts, profiles, &caas.required_networks())
    }
}

impl Default for TopologyValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn require_networking(model: &TopologyModel, context: ConfigDomain) -> ValidationResult<&Networking> {
    model
        .networking
        .as_ref()
        .ok_or_else(|| ValidationError::MissingField {
            context: context.key().to_string(),
            field: ConfigDomain::Networking.key().to_string(),
        })
}

/// Validate the global network catalogue
pub fn validate_networking(networking: &Networking) -> ValidationResult {
    NetworkingValidator::new().validate(networking)
}

/// Validate every network profile against the network catalogue
pub fn validate_network_profiles(
    profiles: &IndexMap<String, NetworkProfile>,
    networking: &Networking,
) -> ValidationResult {
    TopologyValidator::new().validate_profiles(profiles, networking)
}
