//! CLI settings

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Settings files read when no explicit path is given, later ones win
pub const SETTINGS_PATHS: [&str; 2] = ["/etc/nettopo/nettopo.toml", "./nettopo.toml"];

/// Prefix of the environment overrides (`NETTOPO_STORE_DIR`, ...)
pub const ENV_PREFIX: &str = "NETTOPO";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Relax the untagged network rule for virtual machine deployments
    pub virtualized: bool,
    /// Directory holding one `<domain key>.json` document per domain
    pub store_dir: PathBuf,
    /// Domains treated as changed when none are given on the command line
    pub default_domains: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            virtualized: false,
            store_dir: PathBuf::from("/var/lib/nettopo/properties"),
            default_domains: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the standard locations when no
    /// path is given, overlaid with `NETTOPO_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        match path {
            Some(path) => builder = builder.add_source(File::from(path)),
            None => {
                for path in SETTINGS_PATHS {
                    builder = builder.add_source(File::with_name(path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        let settings: Settings = settings.try_deserialize()?;

        log::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }
}
