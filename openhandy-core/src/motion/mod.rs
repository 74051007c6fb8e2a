//! Motion control
//!
//! Travel limits, the proportional position loop, the homing procedure and
//! the controller that ties them to the run state.

pub mod control;
pub mod controller;
pub mod homing;
pub mod position;

pub use control::{low_speed_scale, speed_for_interval, PositionLoop};
pub use controller::{CommandRejected, MotionController, TickReport, Transition};
pub use homing::{Homing, HomingFailure, HomingPhase, HomingResult, HomingStep};
pub use position::{Band, Crop, Limits};
