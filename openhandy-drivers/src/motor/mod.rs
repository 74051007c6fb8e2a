//! Motor driver implementations

pub mod hbridge;

pub use hbridge::{HBridgeConfig, HBridgeMotor};
