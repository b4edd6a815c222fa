//! Network topology validation CLI
//!
//! Validates the domain documents of a directory backed property store
//! and reports the first violated rule.

pub mod commands;
pub mod settings;
