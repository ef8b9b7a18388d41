pub mod config;
pub mod error;
pub mod events;
mod labels;
mod nodes;
pub mod pin;
mod policies;
pub mod registry;
pub mod types;

pub use config::RegistryConfig;
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use events::{EventSink, LogEventSink, MemoryEventLog, RegistryEvent};
pub use pin::{MemoryPinService, PinError, PinRecord, PinService, GROUP_REVOKED};
pub use registry::{Registry, SharedEventSink, SharedOracle, SharedPinService};
pub use types::{
    Address, DataInfo, InvocationContext, LabelInfo, LabelUpdate, NewData, NewLabel, NewNode,
    NewPolicy, NodeInfo, NodeUpdate, PolicyCheck, PolicyInfo,
};

pub use pds_store::Page;
