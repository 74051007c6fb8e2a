//! Run-state machine definition
//!
//! Motor output, target selection and command gating are all a function of
//! the current state. Every change of state goes through [`RunState::transition`].

use super::events::Event;

/// Actuator run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunState {
    /// Powered, not calibrated or waiting for rehome
    #[default]
    Idle,
    /// Endstop calibration in progress
    Homing,
    /// Calibrated, holding position with brake engaged
    Ready,
    /// Tracking a commanded target
    Running,
    /// Tracking the pattern generator
    Pattern,
    /// Homing fault; outputs disabled
    Error,
    /// Unexpected simultaneous endstop activation; outputs disabled
    ErrorCollision,
    /// Sustained over-temperature; outputs disabled
    ErrorThermal,
}

impl RunState {
    /// Check if this is one of the latched fault states
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            RunState::Error | RunState::ErrorCollision | RunState::ErrorThermal
        )
    }

    /// Check if the motor may be driven in this state
    pub fn motor_allowed(&self) -> bool {
        matches!(self, RunState::Homing | RunState::Running | RunState::Pattern)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use RunState::*;

        match (self, event) {
            // Thermal faults escalate from every state, including other faults
            (_, ThermalTrip) => ErrorThermal,

            // Collision never downgrades an existing fault and is owned by
            // the homing procedure while calibrating
            (Error | ErrorCollision | ErrorThermal | Homing, Collision) => self,
            (_, Collision) => ErrorCollision,

            // Idle transitions
            (Idle, StartHoming) => Homing,

            // Homing transitions
            (Homing, HomingComplete) => Ready,
            (Homing, HomingFailed(_)) => Error,

            // Ready transitions
            (Ready, MotionCommanded) => Running,
            (Ready, PatternEnabled) => Pattern,

            // Running transitions
            (Running, TargetReached) => Ready,

            // Pattern transitions
            (Pattern, TargetReached) => Ready,

            // Fault transitions
            (Error | ErrorCollision | ErrorThermal, Reset) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}
