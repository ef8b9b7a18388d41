//! PDS registry: on-chain authority over data labels, consumer policies and
//! storage nodes for a private data storage network.

pub use pds_auth as auth;
pub use pds_registry as registry;
pub use pds_store as store;

pub use pds_registry::{Registry, RegistryConfig, RegistryError, RegistryResult};
