//! Actuator hardware capability trait
//!
//! The motion controller sees the board only through this interface.
//! Production binds it to the GPIO/PWM/ADC drivers; tests bind a simulated
//! plant.

use crate::config::Tunables;

/// Carriage travel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Toward the upper endstop; the position counter increases
    Up,
    /// Toward the lower endstop; the position counter decreases
    Down,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Direction of a signed PWM command
    pub fn from_output(output: i32) -> Option<Self> {
        match output {
            o if o > 0 => Some(Direction::Up),
            o if o < 0 => Some(Direction::Down),
            _ => None,
        }
    }

    /// Apply the direction to a PWM magnitude
    pub fn signed(self, pwm: u16) -> i32 {
        match self {
            Direction::Up => pwm as i32,
            Direction::Down => -(pwm as i32),
        }
    }
}

/// Digital inputs, read as raw electrical levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DigitalInput {
    EndstopLower,
    EndstopUpper,
}

/// Digital outputs, written as logical states (`true` = asserted)
///
/// Drivers own the electrical polarity of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DigitalOutput {
    /// Asserted drives [`Direction::Up`]
    Direction,
    /// Asserted holds the motor
    Brake,
    /// Asserted powers the bridge
    Enable,
}

/// Analog inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogChannel {
    Thermal,
}

/// Hardware capabilities consumed by the motion controller
///
/// All methods are non-blocking; the controller calls them from inside a
/// fixed-period tick.
pub trait ActuatorHardware {
    /// Read the raw level of a digital input
    fn read_digital(&mut self, input: DigitalInput) -> bool;

    /// Assert or release a digital output
    fn write_digital(&mut self, output: DigitalOutput, asserted: bool);

    /// Read a raw analog sample
    fn read_analog(&mut self, channel: AnalogChannel) -> u16;

    /// Set the motor PWM duty (single channel)
    fn write_pwm(&mut self, duty: u16);

    /// Read the absolute position counter
    fn read_position_counter(&mut self) -> i32;
}

/// One tick's worth of sensor readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSample {
    /// Absolute position counter
    pub position: i32,
    /// Lower endstop active (polarity applied)
    pub lower_active: bool,
    /// Upper endstop active (polarity applied)
    pub upper_active: bool,
    /// Raw thermal ADC reading
    pub thermal_raw: u16,
}

impl SensorSample {
    /// Read every sensor once
    pub fn read<H: ActuatorHardware>(hw: &mut H, tunables: &Tunables) -> Self {
        let lower_level = hw.read_digital(DigitalInput::EndstopLower);
        let upper_level = hw.read_digital(DigitalInput::EndstopUpper);

        Self {
            position: hw.read_position_counter(),
            lower_active: lower_level != tunables.lower_active_low,
            upper_active: upper_level != tunables.upper_active_low,
            thermal_raw: hw.read_analog(AnalogChannel::Thermal),
        }
    }

    /// Whether the endstop in front of `direction` is active
    pub fn endstop_active(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.upper_active,
            Direction::Down => self.lower_active,
        }
    }

    pub fn both_endstops_active(&self) -> bool {
        self.lower_active && self.upper_active
    }
}
