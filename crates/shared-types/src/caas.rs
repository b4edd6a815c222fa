use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// Container platform settings relevant to network wiring (`cloud.caas`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaasConfig {
    #[serde(default)]
    pub cluster_networks: Vec<String>,
    #[serde(default)]
    pub tenant_networks: Vec<String>,
    pub docker0_cidr: Option<IpNet>,
}

impl CaasConfig {
    /// Networks every container host has to reach, cluster networks first
    pub fn required_networks(&self) -> Vec<String> {
        self.cluster_networks
            .iter()
            .chain(self.tenant_networks.iter())
            .cloned()
            .collect()
    }
}
