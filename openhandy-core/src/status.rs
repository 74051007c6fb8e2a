//! Status snapshot and LED mode
//!
//! Produced by the controller for the status LED, debug output and the
//! companion app. Rendering is left to the consumers.

use crate::motion::Limits;
use crate::state::RunState;

/// Point-in-time view of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    pub state: RunState,
    pub lower_endstop: bool,
    pub upper_endstop: bool,
    /// Free-running counter value
    pub absolute_position: i32,
    /// Position relative to the home offset
    pub axis_position: i32,
    pub thermal_raw: u16,
    pub limits: Limits,
    pub target: Option<i32>,
    /// Signed PWM written on the last tick
    pub output: i32,
    pub collision_fault: bool,
    pub thermal_fault: bool,
}

/// Status LED modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedMode {
    Booting,
    StateHoming,
    Ready,
    StateUdp,
    StateError,
    StateCollision,
    StateThermal,
    DiscoveryBreathing,
}

impl LedMode {
    /// LED mode for a run state; an active discovery burst takes precedence
    /// outside of faults
    pub fn for_state(state: RunState, discovery_active: bool) -> Self {
        let base = match state {
            RunState::Idle => LedMode::Booting,
            RunState::Homing => LedMode::StateHoming,
            RunState::Ready | RunState::Pattern => LedMode::Ready,
            RunState::Running => LedMode::StateUdp,
            RunState::Error => LedMode::StateError,
            RunState::ErrorCollision => LedMode::StateCollision,
            RunState::ErrorThermal => LedMode::StateThermal,
        };

        if discovery_active && !state.is_fault() {
            LedMode::DiscoveryBreathing
        } else {
            base
        }
    }
}
