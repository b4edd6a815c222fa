//! Network topology configuration
//!
//! Property store access and parsing of the raw domain documents into the
//! typed topology model

pub mod caas;
pub mod hosts;
pub mod model;
pub mod networking;
pub mod profiles;
pub mod reader;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use model::TopologyModel;
pub use snapshot::ConfigSnapshot;
pub use store::{ConfigDomain, DirectoryStore, MemoryStore, PropertyStore};
