//! Configuration snapshot assembled for one validation pass

use std::collections::HashMap;

use log::debug;
use nettopo_core::{ValidationError, ValidationResult};

use crate::model::TopologyModel;
use crate::store::{ConfigDomain, PropertyStore};

/// Proposed documents of a change merged over the current store values
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    documents: HashMap<ConfigDomain, String>,
    changed: Vec<ConfigDomain>,
}

impl ConfigSnapshot {
    /// Merge `proposed` over the store. Keys not supplied by the change are
    /// fetched in a single batched read; unknown keys are ignored.
    pub async fn load(
        proposed: &HashMap<String, String>,
        store: &dyn PropertyStore,
    ) -> nettopo_core::Result<Self> {
        let mut documents = HashMap::new();
        let mut changed = Vec::new();

        for (key, value) in proposed {
            let Some(domain) = ConfigDomain::from_key(key) else {
                debug!("Ignoring property {} outside the validated domains", key);
                continue;
            };
            if value.trim().is_empty() {
                return Err(ValidationError::MalformedInput {
                    context: key.clone(),
                    reason: "empty value".to_string(),
                }
                .into());
            }
            documents.insert(domain, value.clone());
            changed.push(domain);
        }
        changed.sort();

        let missing: Vec<String> = ConfigDomain::ALL
            .iter()
            .filter(|domain| !documents.contains_key(*domain))
            .map(|domain| domain.key().to_string())
            .collect();

        if !missing.is_empty() {
            debug!("Reading current values of {}", missing.join(", "));
            for (key, value) in store.get_properties(&missing).await? {
                if let Some(domain) = ConfigDomain::from_key(&key) {
                    documents.insert(domain, value);
                }
            }
        }

        Ok(Self { documents, changed })
    }

    /// Domains supplied by the change, in dispatch order
    pub fn changed(&self) -> &[ConfigDomain] {
        &self.changed
    }

    pub fn document(&self, domain: ConfigDomain) -> Option<&str> {
        self.documents.get(&domain).map(String::as_str)
    }

    pub fn model(&self) -> ValidationResult<TopologyModel> {
        TopologyModel::parse(
            ConfigDomain::ALL
                .into_iter()
                .filter_map(|domain| self.document(domain).map(|text| (domain, text))),
        )
    }
}
