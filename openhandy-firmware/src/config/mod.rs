//! Configuration loading
//!
//! The unified config record lives in flash; compiled defaults stand in
//! when it is missing or unusable.

pub mod loader;

pub use loader::{ConfigError, ConfigPersistence};
