//! CLI commands

pub mod validate;

pub use validate::ValidateCommand;

use nettopo_config::ConfigDomain;

/// Property keys of every validated domain
pub fn domain_keys() -> Vec<&'static str> {
    ConfigDomain::ALL.iter().map(|domain| domain.key()).collect()
}
