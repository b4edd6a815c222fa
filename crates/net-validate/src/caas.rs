//! Container platform network settings

use log::debug;
use nettopo_core::range::{first_duplicate, overlaps};
use nettopo_core::{CaasConfig, Networking, ValidationError, ValidationResult};

const CLUSTER_NETWORKS: &str = "cluster_networks";
const TENANT_NETWORKS: &str = "tenant_networks";

/// Validator for `cloud.caas`
#[derive(Debug, Default)]
pub struct CaasValidator;

impl CaasValidator {
    pub fn new() -> Self {
        Self
    }

    /// Network lists must be duplicate free, within and across each other
    pub fn validate_networks(&self, caas: &CaasConfig) -> ValidationResult {
        for (context, networks) in [
            (CLUSTER_NETWORKS, &caas.cluster_networks),
            (TENANT_NETWORKS, &caas.tenant_networks),
        ] {
            if let Some(network) = first_duplicate(networks) {
                return Err(ValidationError::DuplicateCaasNetwork {
                    context: context.to_string(),
                    network: network.clone(),
                });
            }
        }

        if let Some(network) = caas
            .cluster_networks
            .iter()
            .find(|network| caas.tenant_networks.contains(network))
        {
            return Err(ValidationError::DuplicateCaasNetwork {
                context: format!("{} and {}", CLUSTER_NETWORKS, TENANT_NETWORKS),
                network: network.clone(),
            });
        }
        Ok(())
    }

    /// The docker0 bridge must not shadow any infra network domain
    pub fn validate_docker0(&self, caas: &CaasConfig, networking: &Networking) -> ValidationResult {
        let Some(cidr) = caas.docker0_cidr else {
            return Ok(());
        };

        for (role, domain) in networking.domain_instances() {
            if overlaps(&cidr, &domain.cidr) {
                return Err(ValidationError::Docker0CidrOverlap {
                    cidr,
                    network: format!("{} network domain {}", role, domain.name),
                    other: domain.cidr,
                });
            }
        }

        debug!("docker0 CIDR {} does not overlap infra networks", cidr);
        Ok(())
    }
}
