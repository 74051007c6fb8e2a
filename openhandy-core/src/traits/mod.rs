//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and hardware-specific implementations.

pub mod actuator;

pub use actuator::{
    ActuatorHardware, AnalogChannel, DigitalInput, DigitalOutput, Direction, SensorSample,
};
