//! Hardware driver implementations
//!
//! Concrete drivers for the actuator board, built on `embedded-hal` 1.0:
//!
//! - H-bridge motor output (PWM, direction, brake, enable)
//! - Three-phase hall sensor decoder for the position count
//! - [`board::ActuatorBoard`], the core's hardware capability set

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod board;
pub mod motor;
pub mod sensor;

pub use board::ActuatorBoard;
pub use motor::{HBridgeConfig, HBridgeMotor};
pub use sensor::{HallDecoder, HallState};
