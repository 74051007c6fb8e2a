//! Configuration types
//!
//! Board-agnostic configuration records, stored as one postcard record.

pub mod network;
#[cfg(feature = "serde")]
pub mod persisted;
pub mod tunables;

pub use network::NetworkConfig;
#[cfg(feature = "serde")]
pub use persisted::{load_or_default, ConfigSource, LoadedConfig, StoreError, StoredConfig};
pub use tunables::{ConfigFault, ConfigFaults, ConfigField, HomeMode, Tunables};
