//! Bonding group rules

use crate::error::ValidationError;
use crate::types::BondMode;
use crate::ValidationResult;

/// Human readable member count requirement of a bonding mode
pub fn member_requirement(mode: BondMode) -> &'static str {
    match mode {
        BondMode::ActiveBackup => "exactly two interfaces",
        BondMode::Lacp | BondMode::LacpLayer34 => "at least two interfaces",
    }
}

/// Active-backup pairs exactly two links, LACP aggregates two or more
pub fn member_count_ok(mode: BondMode, count: usize) -> bool {
    match mode {
        BondMode::ActiveBackup => count == 2,
        BondMode::Lacp | BondMode::LacpLayer34 => count >= 2,
    }
}

pub fn validate_member_count(
    profile: &str,
    bond: &str,
    mode: BondMode,
    count: usize,
) -> ValidationResult {
    if !member_count_ok(mode, count) {
        return Err(ValidationError::BondMemberCount {
            profile: profile.to_string(),
            bond: bond.to_string(),
            mode,
            count,
        });
    }
    Ok(())
}
