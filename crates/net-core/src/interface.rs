//! Interface and network naming rules

use regex::Regex;

use crate::error::ValidationError;
use crate::types::{
    BOND_NAME_REGEX, HOSTNAME_REGEX, INTERFACE_NAME_REGEX, MAX_HOSTNAME_LEN,
    MAX_INTERFACE_NAME_LEN, MAX_NETWORK_NAME_LEN, NETWORK_NAME_REGEX,
};
use crate::ValidationResult;

/// Compiled naming rules for interfaces, bonds and networks
pub struct NameRules {
    interface_name_regex: Regex,
    bond_name_regex: Regex,
    network_name_regex: Regex,
    hostname_regex: Regex,
}

impl NameRules {
    pub fn new() -> Self {
        Self {
            interface_name_regex: Regex::new(INTERFACE_NAME_REGEX).unwrap(),
            bond_name_regex: Regex::new(BOND_NAME_REGEX).unwrap(),
            network_name_regex: Regex::new(NETWORK_NAME_REGEX).unwrap(),
            hostname_regex: Regex::new(HOSTNAME_REGEX).unwrap(),
        }
    }

    /// `bondN` names
    pub fn is_bond(&self, name: &str) -> bool {
        self.bond_name_regex.is_match(name)
    }

    /// Lowercase alphanumeric, starting with a letter, at most 15 chars
    pub fn validate_interface_name(&self, context: &str, name: &str) -> ValidationResult {
        if !self.interface_name_regex.is_match(name) {
            return Err(ValidationError::InvalidInterfaceName {
                context: context.to_string(),
                name: name.to_string(),
            });
        }
        if name.len() > MAX_INTERFACE_NAME_LEN {
            return Err(ValidationError::InterfaceNameTooLong {
                context: context.to_string(),
                name: name.to_string(),
                max: MAX_INTERFACE_NAME_LEN,
            });
        }
        Ok(())
    }

    /// Valid name that is not a VLAN sub-interface; used wherever a
    /// physical interface or bond is expected.
    pub fn validate_carrier_name(&self, context: &str, name: &str) -> ValidationResult {
        self.validate_interface_name(context, name)?;
        if name.contains("vlan") {
            return Err(ValidationError::VlanInterface {
                context: context.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Bonding group member: a physical interface, neither VLAN nor bond
    pub fn validate_member_name(&self, context: &str, name: &str) -> ValidationResult {
        self.validate_carrier_name(context, name)?;
        if name.contains("bond") {
            return Err(ValidationError::BondAsMember {
                context: context.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn validate_bond_name(&self, context: &str, name: &str) -> ValidationResult {
        if !self.is_bond(name) {
            return Err(ValidationError::NotBondName {
                context: context.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Provider network and network domain names
    pub fn validate_network_name(&self, context: &str, name: &str) -> ValidationResult {
        let reason = if name.len() > MAX_NETWORK_NAME_LEN {
            format!("too long, max {MAX_NETWORK_NAME_LEN} chars")
        } else if !self.network_name_regex.is_match(name) {
            format!("does not match {NETWORK_NAME_REGEX}")
        } else {
            return Ok(());
        };
        Err(ValidationError::InvalidName {
            context: context.to_string(),
            name: name.to_string(),
            reason,
        })
    }

    pub fn validate_hostname(&self, name: &str) -> ValidationResult {
        let reason = if name.len() > MAX_HOSTNAME_LEN {
            format!("too long, max {MAX_HOSTNAME_LEN} chars")
        } else if !self.hostname_regex.is_match(name) {
            format!("does not match {HOSTNAME_REGEX}")
        } else {
            return Ok(());
        };
        Err(ValidationError::InvalidName {
            context: "hostname".to_string(),
            name: name.to_string(),
            reason,
        })
    }
}

impl Default for NameRules {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_interface_names() {
        let rules = NameRules::new();
        assert!(rules.validate_interface_name("p1", "eth0").is_ok());
        assert!(rules.validate_interface_name("p1", "ens3f1").is_ok());
        assert!(rules.validate_interface_name("p1", "Eth0").is_err());
        assert!(rules.validate_interface_name("p1", "e").is_err());
        assert!(rules.validate_interface_name("p1", "eth0.100").is_err());

        let err = rules
            .validate_interface_name("p1", "enp175s0f1abcdef")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_carrier_and_member_names() {
        let rules = NameRules::new();
        assert!(rules.validate_carrier_name("p1", "bond0").is_ok());
        assert!(matches!(
            rules.validate_carrier_name("p1", "vlan100"),
            Err(ValidationError::VlanInterface { .. })
        ));

        let err = rules.validate_member_name("p1", "bond1").unwrap_err();
        assert!(matches!(err, ValidationError::BondAsMember { .. }));
        assert_eq!(err.kind(), ErrorKind::StructuralConflict);
    }

    #[test]
    fn test_bond_names() {
        let rules = NameRules::new();
        assert!(rules.is_bond("bond0"));
        assert!(rules.is_bond("bond12"));
        assert!(!rules.is_bond("bondx"));
        assert!(rules.validate_bond_name("p1", "eth0").is_err());
    }

    #[test]
    fn test_network_names() {
        let rules = NameRules::new();
        assert!(rules.validate_network_name("provider", "physnet1").is_ok());
        assert!(rules.validate_network_name("provider", "rack-1_a").is_ok());
        assert!(rules.validate_network_name("provider", "rack-").is_err());
        assert!(rules.validate_network_name("provider", "1rack").is_err());
        assert!(rules
            .validate_network_name("provider", &"a".repeat(65))
            .is_err());
    }

    #[test]
    fn test_hostnames() {
        let rules = NameRules::new();
        assert!(rules.validate_hostname("controller-1").is_ok());
        assert!(rules.validate_hostname("0worker").is_ok());
        assert!(rules.validate_hostname(&"a".repeat(63)).is_ok());
        assert!(rules.validate_hostname("-controller").is_err());
        assert!(rules.validate_hostname("Controller").is_err());
        assert!(rules.validate_hostname("worker_1").is_err());

        let err = rules.validate_hostname(&"a".repeat(64)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert_eq!(err.context(), "hostname");
    }
}
