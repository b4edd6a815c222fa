//! Network topology core
//!
//! Limits, naming rules, interval arithmetic and the error taxonomy shared
//! by the configuration parser and the validators.

pub mod bond;
pub mod error;
pub mod interface;
pub mod range;
pub mod types;
pub mod vlan;

pub use error::{ErrorKind, NetworkError, StoreError, ValidationError};
pub use types::*;

/// Result type for validation entry points
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Result type for individual checks
pub type ValidationResult<T = ()> = std::result::Result<T, ValidationError>;
