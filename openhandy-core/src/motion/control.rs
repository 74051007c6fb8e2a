//! Proportional position loop
//!
//! Output is a signed PWM command: the sign selects the direction (positive
//! drives toward higher counts), the magnitude is the duty cycle.

use crate::config::Tunables;

/// Gain multiplier for a target speed
///
/// Full gain at or above `threshold_pct`; below it the gain falls linearly
/// to `scale_min` at zero speed.
pub fn low_speed_scale(speed_pct: u8, threshold_pct: u8, scale_min: f32) -> f32 {
    if threshold_pct == 0 || speed_pct >= threshold_pct {
        return 1.0;
    }
    let ratio = speed_pct as f32 / threshold_pct as f32;
    scale_min + (1.0 - scale_min) * ratio
}

/// Speed percent needed to cover `distance` counts in `interval_ms`
///
/// Clamped to `1..=100`; a zero interval means full speed.
pub fn speed_for_interval(distance: i32, interval_ms: u32, base_cps: f32) -> u8 {
    if interval_ms == 0 || !(base_cps > 0.0) {
        return 100;
    }
    let pct = distance.unsigned_abs() as f32 * 1000.0 / (interval_ms as f32 * base_cps);
    pct.clamp(1.0, 100.0) as u8
}

/// Proportional controller parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionLoop {
    kp: f32,
    kp_speed_scale_min: f32,
    low_speed_threshold_pct: u8,
    min_pwm_run: u16,
    max_pwm: u16,
}

impl PositionLoop {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            kp: tunables.kp,
            kp_speed_scale_min: tunables.kp_speed_scale_min,
            low_speed_threshold_pct: tunables.low_speed_threshold_pct,
            min_pwm_run: tunables.min_pwm_run,
            max_pwm: tunables.max_pwm,
        }
    }

    /// Whether `error` is small enough to count as on target
    pub fn within_deadband(error: i32, deadband_counts: i32) -> bool {
        error == 0 || error.unsigned_abs() < deadband_counts.max(0) as u32
    }

    /// Signed PWM for a position error (`target - position`)
    ///
    /// Zero inside the deadband; otherwise the magnitude is clamped to
    /// `[min_pwm_run, max_pwm]`.
    pub fn output(&self, error: i32, deadband_counts: i32, speed_pct: u8) -> i32 {
        if Self::within_deadband(error, deadband_counts) {
            return 0;
        }

        let scale = low_speed_scale(
            speed_pct,
            self.low_speed_threshold_pct,
            self.kp_speed_scale_min,
        );
        let raw = self.kp * scale * error.unsigned_abs() as f32;
        let min = self.min_pwm_run.min(self.max_pwm) as f32;
        let magnitude = (raw + 0.5).clamp(min, self.max_pwm as f32) as i32;

        if error > 0 {
            magnitude
        } else {
            -magnitude
        }
    }

    pub fn max_pwm(&self) -> u16 {
        self.max_pwm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn loop_default() -> PositionLoop {
        PositionLoop::new(&Tunables::DEFAULT)
    }

    #[test]
    fn test_deadband_outputs_zero() {
        let pl = loop_default();
        assert_eq!(pl.output(0, 20, 100), 0);
        assert_eq!(pl.output(19, 20, 100), 0);
        assert_eq!(pl.output(-19, 20, 100), 0);
        assert_ne!(pl.output(20, 20, 100), 0);
    }

    #[test]
    fn test_magnitude_clamped() {
        let pl = loop_default();
        // 0.8 * 50 = 40, raised to min_pwm_run
        assert_eq!(pl.output(50, 20, 100), 120);
        // 0.8 * 500 = 400
        assert_eq!(pl.output(500, 20, 100), 400);
        assert_eq!(pl.output(-500, 20, 100), -400);
        // Saturates at max_pwm
        assert_eq!(pl.output(100_000, 20, 100), 1023);
    }

    #[test]
    fn test_low_speed_scale() {
        assert_eq!(low_speed_scale(100, 30, 0.4), 1.0);
        assert_eq!(low_speed_scale(30, 30, 0.4), 1.0);
        assert_eq!(low_speed_scale(0, 30, 0.4), 0.4);
        let mid = low_speed_scale(15, 30, 0.4);
        assert!((mid - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_speed_for_interval() {
        // 1000 counts in 1 s at 20 cps per percent
        assert_eq!(speed_for_interval(1000, 1000, 20.0), 50);
        assert_eq!(speed_for_interval(-1000, 1000, 20.0), 50);
        assert_eq!(speed_for_interval(100_000, 10, 20.0), 100);
        assert_eq!(speed_for_interval(0, 1000, 20.0), 1);
        assert_eq!(speed_for_interval(1000, 0, 20.0), 100);
    }

    #[test]
    fn test_low_speed_reduces_output() {
        let pl = loop_default();
        let fast = pl.output(500, 20, 100);
        let slow = pl.output(500, 20, 5);
        assert!(slow < fast);
        assert!(slow >= 120);
    }

    proptest! {
        #[test]
        fn prop_output_bounded_and_signed(
            error in -200_000i32..200_000,
            deadband in 0i32..200,
            speed in 0u8..=100,
        ) {
            let pl = loop_default();
            let out = pl.output(error, deadband, speed);

            prop_assert!(out.unsigned_abs() <= pl.max_pwm() as u32);
            if out != 0 {
                prop_assert_eq!(out.signum(), error.signum());
                prop_assert!(out.unsigned_abs() >= Tunables::DEFAULT.min_pwm_run as u32);
            } else {
                prop_assert!(PositionLoop::within_deadband(error, deadband));
            }
        }
    }
}
