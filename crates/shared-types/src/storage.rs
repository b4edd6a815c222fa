use serde::{Deserialize, Serialize};

/// Storage profile of `cloud.storage_profiles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProfile {
    pub name: String,
    pub backend: Option<String>,
}

impl StorageProfile {
    /// Ceph backed storage needs the storage cluster network
    pub fn is_ceph(&self) -> bool {
        self.backend.as_deref() == Some("ceph")
    }
}
