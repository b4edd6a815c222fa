//! `cloud.storage_profiles` parser

use indexmap::IndexMap;
use nettopo_core::{StorageProfile, ValidationResult};
use serde_json::Value;

use crate::reader::Section;
use crate::store::ConfigDomain;

/// Only the backend is read; the hosts checker needs nothing else
pub fn parse_storage_profiles(value: &Value) -> ValidationResult<IndexMap<String, StorageProfile>> {
    let doc = Section::document(ConfigDomain::StorageProfiles.key(), value)?;

    let mut profiles = IndexMap::new();
    for (name, value) in doc.entries() {
        let section = Section::nested(doc.context(), name, value)?.with_context(name.as_str());
        let profile = StorageProfile {
            name: name.clone(),
            backend: section.opt_string("backend")?.map(str::to_string),
        };
        profiles.insert(name.clone(), profile);
    }
    Ok(profiles)
}
