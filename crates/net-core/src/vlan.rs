//! VLAN and MTU bounds

use log::trace;

use crate::error::ValidationError;
use crate::range::first_overlap;
use crate::types::{VlanRange, MTU_RANGE, VLAN_ID_RANGE};
use crate::ValidationResult;

pub fn validate_vlan_id(context: &str, vlan: i64) -> ValidationResult {
    if !VLAN_ID_RANGE.contains(&vlan) {
        return Err(ValidationError::VlanOutOfRange {
            context: context.to_string(),
            vlan,
        });
    }
    Ok(())
}

pub fn validate_mtu(context: &str, mtu: i64) -> ValidationResult {
    if !MTU_RANGE.contains(&mtu) {
        return Err(ValidationError::MtuOutOfRange {
            context: context.to_string(),
            mtu,
        });
    }
    Ok(())
}

/// Bounds, ordering and self-overlap of a provider network's VLAN ranges
pub fn validate_vlan_ranges(network: &str, ranges: &[VlanRange]) -> ValidationResult {
    trace!("Checking vlan ranges {} of {}", VlanRange::format_list(ranges), network);

    for range in ranges {
        validate_vlan_id(network, range.start)?;
        validate_vlan_id(network, range.end)?;
        if range.end < range.start {
            return Err(ValidationError::InvertedVlanRange {
                network: network.to_string(),
                range: *range,
            });
        }
    }

    if let Some((first, second)) = first_overlap(ranges) {
        return Err(ValidationError::VlanRangesOverlapping {
            network: network.to_string(),
            first: *first,
            second: *second,
        });
    }

    Ok(())
}
