//! RP2040-specific HAL for the actuator firmware
//!
//! RP2040 implementations of the shared `openhandy-hal` traits:
//!
//! - Flash storage driver (implements `openhandy_hal::FlashStorage`)
//! - Blocking ADC input (implements `openhandy_hal::AnalogInput`)

#![no_std]

pub mod adc;
pub mod flash;

pub use adc::Rp2040AnalogInput;
pub use flash::Rp2040FlashStorage;

// Re-export shared traits from openhandy-hal for convenience
pub use openhandy_hal::{AnalogInput, FlashStorage as FlashStorageTrait, StorageKey};
