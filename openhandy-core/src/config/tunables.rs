//! Control-loop tunables
//!
//! Loaded once at boot and immutable for the rest of the session. Every
//! field has a compiled default and a valid range; out-of-range values are
//! replaced by their default and reported as a [`ConfigFault`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use heapless::Vec;

/// Highest PWM duty the 10-bit motor output accepts
pub const PWM_RESOLUTION_MAX: u16 = 1023;

/// Highest raw reading of the 12-bit thermal ADC
pub const ADC_RESOLUTION_MAX: u16 = 4095;

/// Axis units per calibrated span
pub const AXIS_UNITS: f32 = 10_000.0;

/// Maximum number of faults a single validation pass can report
pub const MAX_CONFIG_FAULTS: usize = 24;

/// Which endstop is sought first during homing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HomeMode {
    /// Seek the lower endstop, then measure toward the upper one
    #[default]
    LowerFirst,
    /// Seek the upper endstop, then measure toward the lower one
    UpperFirst,
}

/// Configuration fields that can be individually substituted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigField {
    Kp,
    KpSpeedScaleMin,
    LowSpeedThresholdPct,
    MinPwmRun,
    MaxPwm,
    HomingPwm,
    StallTimeoutMs,
    OvershootLowerCounts,
    OvershootUpperCounts,
    ThermalThresholdAdc,
    ThermalTripTicks,
    AxisDeadband,
    PatternBaseCps,
    TravelMarginCounts,
    MinSpanCounts,
    Hostname,
    UdpPort,
    Netmask,
}

/// A tunable that was out of range and replaced with its default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigFault {
    pub field: ConfigField,
}

/// Faults collected by a validation pass
pub type ConfigFaults = Vec<ConfigFault, MAX_CONFIG_FAULTS>;

/// Tunable parameters of the motion core
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tunables {
    /// Proportional gain (PWM per count of error)
    pub kp: f32,
    /// Gain multiplier applied at the lowest speeds (0, 1]
    pub kp_speed_scale_min: f32,
    /// Below this speed percent the gain is scaled down
    pub low_speed_threshold_pct: u8,
    /// Smallest PWM that reliably moves the carriage
    pub min_pwm_run: u16,
    /// PWM ceiling
    pub max_pwm: u16,
    /// PWM used while seeking endstops
    pub homing_pwm: u16,
    /// Homing fails if the counter does not move for this long
    pub stall_timeout_ms: u32,
    /// Back-off distance after the lower endstop triggers
    pub overshoot_lower_counts: i32,
    /// Back-off distance after the upper endstop triggers
    pub overshoot_upper_counts: i32,
    /// Raw thermal ADC reading above which the motor is too hot
    pub thermal_threshold_adc: u16,
    /// Consecutive over-threshold samples before tripping
    pub thermal_trip_ticks: u8,
    /// Position deadband in axis units (1/10000 of the calibrated span)
    pub axis_deadband: f32,
    /// Lower endstop reads low when active
    pub lower_active_low: bool,
    /// Upper endstop reads low when active
    pub upper_active_low: bool,
    pub home_mode: HomeMode,
    /// Pattern travel rate in counts per second per speed percent
    pub pattern_base_cps: f32,
    /// Keep-out distance from each calibrated end
    pub travel_margin_counts: i32,
    /// Shortest span accepted by homing
    pub min_span_counts: i32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Tunables {
    /// Compiled defaults
    pub const DEFAULT: Tunables = Tunables {
        kp: 0.8,
        kp_speed_scale_min: 0.4,
        low_speed_threshold_pct: 30,
        min_pwm_run: 120,
        max_pwm: PWM_RESOLUTION_MAX,
        homing_pwm: 350,
        stall_timeout_ms: 1500,
        overshoot_lower_counts: 60,
        overshoot_upper_counts: 60,
        thermal_threshold_adc: 3000,
        thermal_trip_ticks: 10,
        axis_deadband: 40.0,
        lower_active_low: true,
        upper_active_low: true,
        home_mode: HomeMode::LowerFirst,
        pattern_base_cps: 20.0,
        travel_margin_counts: 20,
        min_span_counts: 500,
    };

    /// Replace every out-of-range field with its default
    ///
    /// Returns the corrected set and the list of substituted fields.
    pub fn validated(self) -> (Tunables, ConfigFaults) {
        let mut faults = ConfigFaults::new();
        let d = Tunables::DEFAULT;
        let mut t = self;

        let mut check = |ok: bool, field: ConfigField| {
            if !ok {
                // Capacity covers every field
                let _ = faults.push(ConfigFault { field });
            }
            ok
        };

        if !check(t.kp.is_finite() && t.kp > 0.0 && t.kp <= 50.0, ConfigField::Kp) {
            t.kp = d.kp;
        }
        if !check(
            t.kp_speed_scale_min.is_finite()
                && t.kp_speed_scale_min > 0.0
                && t.kp_speed_scale_min <= 1.0,
            ConfigField::KpSpeedScaleMin,
        ) {
            t.kp_speed_scale_min = d.kp_speed_scale_min;
        }
        if !check(
            (1..=100).contains(&t.low_speed_threshold_pct),
            ConfigField::LowSpeedThresholdPct,
        ) {
            t.low_speed_threshold_pct = d.low_speed_threshold_pct;
        }
        if !check(
            (1..=PWM_RESOLUTION_MAX).contains(&t.max_pwm),
            ConfigField::MaxPwm,
        ) {
            t.max_pwm = d.max_pwm;
        }
        if !check(t.min_pwm_run <= t.max_pwm, ConfigField::MinPwmRun) {
            t.min_pwm_run = d.min_pwm_run.min(t.max_pwm);
        }
        if !check(
            t.homing_pwm > 0 && t.homing_pwm <= t.max_pwm,
            ConfigField::HomingPwm,
        ) {
            t.homing_pwm = d.homing_pwm.min(t.max_pwm);
        }
        if !check(
            (100..=10_000).contains(&t.stall_timeout_ms),
            ConfigField::StallTimeoutMs,
        ) {
            t.stall_timeout_ms = d.stall_timeout_ms;
        }
        if !check(
            (0..=5_000).contains(&t.overshoot_lower_counts),
            ConfigField::OvershootLowerCounts,
        ) {
            t.overshoot_lower_counts = d.overshoot_lower_counts;
        }
        if !check(
            (0..=5_000).contains(&t.overshoot_upper_counts),
            ConfigField::OvershootUpperCounts,
        ) {
            t.overshoot_upper_counts = d.overshoot_upper_counts;
        }
        if !check(
            (1..=ADC_RESOLUTION_MAX).contains(&t.thermal_threshold_adc),
            ConfigField::ThermalThresholdAdc,
        ) {
            t.thermal_threshold_adc = d.thermal_threshold_adc;
        }
        if !check(t.thermal_trip_ticks > 0, ConfigField::ThermalTripTicks) {
            t.thermal_trip_ticks = d.thermal_trip_ticks;
        }
        if !check(
            t.axis_deadband.is_finite() && (0.0..=AXIS_UNITS).contains(&t.axis_deadband),
            ConfigField::AxisDeadband,
        ) {
            t.axis_deadband = d.axis_deadband;
        }
        if !check(
            t.pattern_base_cps.is_finite() && t.pattern_base_cps > 0.0,
            ConfigField::PatternBaseCps,
        ) {
            t.pattern_base_cps = d.pattern_base_cps;
        }
        if !check(
            (0..=1_000).contains(&t.travel_margin_counts),
            ConfigField::TravelMarginCounts,
        ) {
            t.travel_margin_counts = d.travel_margin_counts;
        }
        // The span must leave room for both margins
        if !check(
            t.min_span_counts > 2 * t.travel_margin_counts,
            ConfigField::MinSpanCounts,
        ) {
            t.min_span_counts = d.min_span_counts.max(2 * t.travel_margin_counts + 1);
        }

        (t, faults)
    }

    /// Longest a single homing phase may run while the carriage keeps moving
    pub fn homing_phase_limit_ms(&self) -> u32 {
        self.stall_timeout_ms.saturating_mul(16)
    }
}
