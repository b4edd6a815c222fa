//! Configuration domains and the property store they are read from

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use log::{debug, trace};
use nettopo_core::StoreError;
use nettopo_shared_types::SharedTypeError;
use tokio::fs;

#[cfg(test)]
use mockall::automock;

/// Configuration domain a property belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigDomain {
    Networking,
    NetworkProfiles,
    Hosts,
    Caas,
    StorageProfiles,
}

impl ConfigDomain {
    pub const ALL: [ConfigDomain; 5] = [
        ConfigDomain::Networking,
        ConfigDomain::NetworkProfiles,
        ConfigDomain::Hosts,
        ConfigDomain::Caas,
        ConfigDomain::StorageProfiles,
    ];

    /// Property key of the domain document
    pub fn key(&self) -> &'static str {
        match self {
            ConfigDomain::Networking => "cloud.networking",
            ConfigDomain::NetworkProfiles => "cloud.network_profiles",
            ConfigDomain::Hosts => "cloud.hosts",
            ConfigDomain::Caas => "cloud.caas",
            ConfigDomain::StorageProfiles => "cloud.storage_profiles",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|domain| domain.key() == key)
    }
}

impl fmt::Display for ConfigDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Accepts the property key or its short form (`networking`, `hosts`, ...)
impl FromStr for ConfigDomain {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.key() == s || domain.key().strip_prefix("cloud.") == Some(s))
            .ok_or_else(|| SharedTypeError::InvalidValue {
                field: "domain",
                value: s.to_string(),
            })
    }
}

/// Source of the current configuration documents
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Read all `keys` in one call; absent properties are left out of the result
    async fn get_properties(&self, keys: &[String]) -> Result<HashMap<String, String>, StoreError>;
}

/// In-memory property store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    properties: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: ConfigDomain, value: impl Into<String>) -> Self {
        self.insert(domain.key(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn get_properties(&self, keys: &[String]) -> Result<HashMap<String, String>, StoreError> {
        Ok(keys
            .iter()
            .filter_map(|key| {
                self.properties
                    .get(key)
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect())
    }
}

/// Property store backed by a directory holding one `<key>.json` file per property
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base_path: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn property_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

#[async_trait]
impl PropertyStore for DirectoryStore {
    async fn get_properties(&self, keys: &[String]) -> Result<HashMap<String, String>, StoreError> {
        let mut properties = HashMap::new();

        for key in keys {
            let path = self.property_path(key);
            match fs::read_to_string(&path).await {
                Ok(content) => {
                    trace!("Read {} from {}", key, path.display());
                    properties.insert(key.clone(), content);
                }
                Err(e) if e.kind() == IoErrorKind::NotFound => {
                    debug!("Property {} not present in {}", key, self.base_path.display());
                }
                Err(e) => {
                    return Err(StoreError::Unavailable {
                        key: key.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }

        Ok(properties)
    }
}
