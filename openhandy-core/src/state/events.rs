//! Events that trigger state transitions

use crate::motion::HomingFailure;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Calibration events
    /// Startup or rehome request
    StartHoming,
    /// Both endstops found and the measured span is valid
    HomingComplete,
    /// Homing aborted (stall, watchdog, bad span)
    HomingFailed(HomingFailure),

    // Motion events
    /// A target was commanded directly (network or manual)
    MotionCommanded,
    /// Motion-on with a pattern selected
    PatternEnabled,
    /// Target reached with motion-on cleared
    TargetReached,

    // Safety events
    /// Both endstops active outside of homing
    Collision,
    /// Thermal reading above threshold for too many consecutive ticks
    ThermalTrip,

    // Operator events
    /// Explicit reset of a latched fault
    Reset,
}
