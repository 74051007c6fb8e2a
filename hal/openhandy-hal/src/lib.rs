//! OpenHandy Hardware Abstraction Layer
//!
//! Platform traits implemented by chip-specific HALs, so the drivers and
//! the firmware glue stay independent of the microcontroller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  openhandy-firmware / openhandy-drivers │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  openhandy-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ openhandy-hal-│
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Contents
//!
//! - [`flash::FlashStorage`] - Persistent key/value storage
//! - [`adc::AnalogInput`] - Single-channel blocking analog reads
//! - [`counter::PositionCounter`] - Interrupt-fed position count

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod adc;
pub mod counter;
pub mod flash;

pub use adc::{AdcError, AnalogInput};
pub use counter::PositionCounter;
pub use flash::{FlashError, FlashStorage, StorageKey};
