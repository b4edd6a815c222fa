//! Validate command

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use nettopo_config::{ConfigDomain, DirectoryStore, PropertyStore};
use nettopo_core::{NetworkError, ValidationError};
use nettopo_validate::{TopologyValidator, ValidationOptions};

/// Validate command implementation
pub struct ValidateCommand {
    store: DirectoryStore,
    validator: TopologyValidator,
}

impl ValidateCommand {
    pub fn new<P: AsRef<Path>>(store_dir: P, options: ValidationOptions) -> Self {
        Self {
            store: DirectoryStore::new(store_dir),
            validator: TopologyValidator::with_options(options),
        }
    }

    /// Validate the store as if `changed` had just been written. Returns
    /// `Ok(false)` after reporting a validation failure.
    pub async fn execute(&self, changed: &[ConfigDomain]) -> Result<bool> {
        let base = self.store.base_path();
        if !base.is_dir() {
            anyhow::bail!("Property store directory not found: {}", base.display());
        }

        let proposed = self.proposed(changed).await?;
        info!(
            "Validating {} changed domains from {}",
            proposed.len(),
            base.display()
        );

        match self.validator.validate_set(&proposed, &self.store).await {
            Ok(()) => {
                println!("configuration is valid");
                Ok(true)
            }
            Err(NetworkError::Validation(err)) => {
                eprintln!("{}", report(&err));
                Ok(false)
            }
            Err(err) => Err(err).context("Failed to read configuration documents"),
        }
    }

    /// Current documents of the changed domains, read as one batch
    async fn proposed(&self, changed: &[ConfigDomain]) -> Result<HashMap<String, String>> {
        let keys: Vec<String> = changed.iter().map(|domain| domain.key().to_string()).collect();
        let proposed = self
            .store
            .get_properties(&keys)
            .await
            .with_context(|| format!("Failed to read {}", keys.join(", ")))?;

        for key in keys.iter().filter(|key| !proposed.contains_key(*key)) {
            warn!("{} not present in the store, not validated as changed", key);
        }
        Ok(proposed)
    }
}

/// `kind: context: message` line for a validation failure
pub fn report(err: &ValidationError) -> String {
    format!("{}: {}: {}", err.kind(), err.context(), err)
}
