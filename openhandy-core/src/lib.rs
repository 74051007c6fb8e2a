//! Board-agnostic core logic for the OpenHandy linear actuator firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware capability trait (digital/analog I/O, PWM, position counter)
//! - Run-state machine
//! - Homing procedure and proportional position loop
//! - Collision and thermal safety supervision
//! - Stroke pattern generation
//! - Command ingestion from the network protocol
//! - Manual UI state and button mapping
//! - Configuration records and persistence format

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod motion;
pub mod pattern;
pub mod safety;
pub mod state;
pub mod status;
pub mod traits;
pub mod ui;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
