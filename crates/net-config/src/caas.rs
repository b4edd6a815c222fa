//! `cloud.caas` parser

use nettopo_core::{CaasConfig, ValidationResult};
use serde_json::Value;

use crate::reader::Section;
use crate::store::ConfigDomain;

pub fn parse_caas(value: &Value) -> ValidationResult<CaasConfig> {
    let doc = Section::document(ConfigDomain::Caas.key(), value)?;

    Ok(CaasConfig {
        cluster_networks: doc.opt_strings("cluster_networks")?,
        tenant_networks: doc.opt_strings("tenant_networks")?,
        docker0_cidr: doc.opt_cidr("docker0_cidr")?,
    })
}
