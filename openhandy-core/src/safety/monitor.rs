//! Safety supervisor implementation
//!
//! Runs every tick regardless of state and watches for two hazards:
//! a sustained over-temperature reading and both endstops reporting active
//! at once outside of homing (the carriage cannot physically be at both
//! ends, so this means a jam or a wiring fault).

use crate::config::Tunables;
use crate::state::RunState;
use crate::traits::SensorSample;

/// Detected hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    Collision,
    Thermal,
}

/// Safety condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    Ok,
    /// Safety condition violated
    Fault(FaultKind),
}

/// Safety supervisor for fault detection
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    thermal_threshold: u16,
    trip_ticks: u8,
    /// Consecutive over-threshold samples
    over_count: u8,
}

impl SafetySupervisor {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            thermal_threshold: tunables.thermal_threshold_adc,
            trip_ticks: tunables.thermal_trip_ticks.max(1),
            over_count: 0,
        }
    }

    /// Check this tick's sample
    ///
    /// Thermal is checked first so it wins when both hazards coincide.
    pub fn check(&mut self, state: RunState, sample: &SensorSample) -> SafetyStatus {
        if sample.thermal_raw > self.thermal_threshold {
            self.over_count = self.over_count.saturating_add(1);
        } else {
            self.over_count = 0;
        }

        if self.over_count >= self.trip_ticks {
            return SafetyStatus::Fault(FaultKind::Thermal);
        }

        if state != RunState::Homing && sample.both_endstops_active() {
            return SafetyStatus::Fault(FaultKind::Collision);
        }

        SafetyStatus::Ok
    }

    /// Clear the thermal streak (operator reset)
    pub fn reset(&mut self) {
        self.over_count = 0;
    }

    /// Number of consecutive over-threshold samples seen
    pub fn thermal_streak(&self) -> u8 {
        self.over_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(thermal_raw: u16, lower: bool, upper: bool) -> SensorSample {
        SensorSample {
            position: 0,
            lower_active: lower,
            upper_active: upper,
            thermal_raw,
        }
    }

    #[test]
    fn test_normal_operation() {
        let mut sup = SafetySupervisor::new(&Tunables::DEFAULT);
        assert_eq!(
            sup.check(RunState::Running, &sample(1000, true, false)),
            SafetyStatus::Ok
        );
    }

    #[test]
    fn test_thermal_needs_consecutive_samples() {
        let mut sup = SafetySupervisor::new(&Tunables::DEFAULT);
        for _ in 0..9 {
            assert_eq!(
                sup.check(RunState::Ready, &sample(3500, false, false)),
                SafetyStatus::Ok
            );
        }
        assert_eq!(
            sup.check(RunState::Ready, &sample(3500, false, false)),
            SafetyStatus::Fault(FaultKind::Thermal)
        );
    }

    #[test]
    fn test_thermal_streak_broken_by_normal_sample() {
        let mut sup = SafetySupervisor::new(&Tunables::DEFAULT);
        for _ in 0..9 {
            sup.check(RunState::Ready, &sample(3500, false, false));
        }
        sup.check(RunState::Ready, &sample(2000, false, false));
        assert_eq!(sup.thermal_streak(), 0);
        assert_eq!(
            sup.check(RunState::Ready, &sample(3500, false, false)),
            SafetyStatus::Ok
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let t = Tunables {
            thermal_trip_ticks: 1,
            ..Tunables::DEFAULT
        };
        let mut sup = SafetySupervisor::new(&t);
        assert_eq!(
            sup.check(RunState::Ready, &sample(3000, false, false)),
            SafetyStatus::Ok
        );
        assert_eq!(
            sup.check(RunState::Ready, &sample(3001, false, false)),
            SafetyStatus::Fault(FaultKind::Thermal)
        );
    }

    #[test]
    fn test_collision_outside_homing() {
        let mut sup = SafetySupervisor::new(&Tunables::DEFAULT);
        for state in [RunState::Idle, RunState::Ready, RunState::Pattern] {
            assert_eq!(
                sup.check(state, &sample(1000, true, true)),
                SafetyStatus::Fault(FaultKind::Collision)
            );
        }
        assert_eq!(
            sup.check(RunState::Homing, &sample(1000, true, true)),
            SafetyStatus::Ok
        );
    }

    #[test]
    fn test_reset_clears_streak() {
        let mut sup = SafetySupervisor::new(&Tunables::DEFAULT);
        for _ in 0..5 {
            sup.check(RunState::Ready, &sample(4000, false, false));
        }
        sup.reset();
        assert_eq!(sup.thermal_streak(), 0);
    }
}
