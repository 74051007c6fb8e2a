//! Simulated actuator for host tests
//!
//! A first-order plant: carriage speed is proportional to PWM duty, with no
//! inertia. Endstop sensors sit a little inside the hard mechanical stops
//! and report electrical levels according to their polarity, the same way
//! the real optical sensors do.

use crate::traits::{ActuatorHardware, AnalogChannel, DigitalInput, DigitalOutput};

/// Simulated plant and its output latches
#[derive(Debug, Clone)]
pub struct SimActuator {
    /// Carriage position in counts
    pub position: f32,
    /// Mechanical stops
    pub hard_min: f32,
    pub hard_max: f32,
    /// Lower sensor active at or below this position
    pub lower_trigger: f32,
    /// Upper sensor active at or above this position
    pub upper_trigger: f32,
    pub lower_active_low: bool,
    pub upper_active_low: bool,
    /// Carriage speed at full duty
    pub full_speed_cps: f32,
    pub pwm_full_scale: u16,
    pub thermal_raw: u16,
    /// Carriage cannot move
    pub jammed: bool,
    /// Override sensor states (lower, upper)
    pub forced_endstops: Option<(bool, bool)>,

    // Latched outputs
    pub pwm: u16,
    pub direction_up: bool,
    pub brake: bool,
    pub enabled: bool,
    /// Number of PWM writes seen
    pub pwm_writes: u32,
}

impl Default for SimActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimActuator {
    pub fn new() -> Self {
        Self {
            position: 3000.0,
            hard_min: 0.0,
            hard_max: 6000.0,
            lower_trigger: 150.0,
            upper_trigger: 5850.0,
            lower_active_low: true,
            upper_active_low: true,
            full_speed_cps: 4000.0,
            pwm_full_scale: 1023,
            thermal_raw: 1000,
            jammed: false,
            forced_endstops: None,
            pwm: 0,
            direction_up: false,
            brake: true,
            enabled: false,
            pwm_writes: 0,
        }
    }

    /// Advance the plant by `dt_ms`
    pub fn step(&mut self, dt_ms: u32) {
        if !self.enabled || self.brake || self.jammed || self.pwm == 0 {
            return;
        }

        let duty = self.pwm as f32 / self.pwm_full_scale as f32;
        let delta = duty * self.full_speed_cps * dt_ms as f32 / 1000.0;
        let next = if self.direction_up {
            self.position + delta
        } else {
            self.position - delta
        };
        self.position = next.clamp(self.hard_min, self.hard_max);
    }

    /// Physical state of the lower sensor
    pub fn lower_active(&self) -> bool {
        match self.forced_endstops {
            Some((lower, _)) => lower,
            None => self.position <= self.lower_trigger,
        }
    }

    /// Physical state of the upper sensor
    pub fn upper_active(&self) -> bool {
        match self.forced_endstops {
            Some((_, upper)) => upper,
            None => self.position >= self.upper_trigger,
        }
    }

    /// Whether the motor is stopped and held
    pub fn is_halted(&self) -> bool {
        self.pwm == 0 && self.brake
    }
}

impl ActuatorHardware for SimActuator {
    fn read_digital(&mut self, input: DigitalInput) -> bool {
        match input {
            DigitalInput::EndstopLower => self.lower_active() != self.lower_active_low,
            DigitalInput::EndstopUpper => self.upper_active() != self.upper_active_low,
        }
    }

    fn write_digital(&mut self, output: DigitalOutput, asserted: bool) {
        match output {
            DigitalOutput::Direction => self.direction_up = asserted,
            DigitalOutput::Brake => self.brake = asserted,
            DigitalOutput::Enable => self.enabled = asserted,
        }
    }

    fn read_analog(&mut self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::Thermal => self.thermal_raw,
        }
    }

    fn write_pwm(&mut self, duty: u16) {
        self.pwm = duty;
        self.pwm_writes += 1;
    }

    fn read_position_counter(&mut self) -> i32 {
        self.position as i32
    }
}
