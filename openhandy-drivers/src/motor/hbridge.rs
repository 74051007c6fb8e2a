//! H-bridge DC motor output
//!
//! One PWM channel for the duty cycle plus direction, brake and enable
//! lines. Each line can be wired active-low; the driver works in logical
//! states and inverts at the pin.
//!
//! Duty is given on the controller's 10-bit scale (`0..=1023`) and mapped
//! onto whatever resolution the PWM peripheral runs at.

use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal::pwm::SetDutyCycle;
use openhandy_core::config::tunables::PWM_RESOLUTION_MAX;
use openhandy_core::traits::Direction;

/// Line polarities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HBridgeConfig {
    /// Direction pin low drives [`Direction::Up`]
    pub direction_inverted: bool,
    /// Brake engaged when the pin is low
    pub brake_inverted: bool,
    /// Driver enabled when the pin is low
    pub enable_inverted: bool,
}

impl Default for HBridgeConfig {
    /// Actuator board wiring: active-low brake (BRAKEZ), the rest active-high
    fn default() -> Self {
        Self {
            direction_inverted: false,
            brake_inverted: true,
            enable_inverted: false,
        }
    }
}

/// H-bridge motor driver
pub struct HBridgeMotor<P, D, B, E> {
    pwm: P,
    direction_pin: D,
    brake_pin: B,
    enable_pin: E,
    config: HBridgeConfig,
    duty: u16,
    direction: Direction,
    braked: bool,
    enabled: bool,
}

impl<P, D, B, E> HBridgeMotor<P, D, B, E>
where
    P: SetDutyCycle,
    D: OutputPin,
    B: OutputPin,
    E: OutputPin,
{
    /// Create the driver with zero duty, brake engaged and the bridge disabled
    pub fn new(pwm: P, direction_pin: D, brake_pin: B, enable_pin: E, config: HBridgeConfig) -> Self {
        let mut motor = Self {
            pwm,
            direction_pin,
            brake_pin,
            enable_pin,
            config,
            duty: 0,
            direction: Direction::Down,
            braked: true,
            enabled: false,
        };
        motor.set_duty(0);
        motor.set_brake(true);
        motor.set_enabled(false);
        motor.set_direction(Direction::Down);
        motor
    }

    /// Set the duty cycle on the 10-bit scale
    pub fn set_duty(&mut self, duty: u16) {
        self.duty = duty.min(PWM_RESOLUTION_MAX);
        self.pwm
            .set_duty_cycle_fraction(self.duty, PWM_RESOLUTION_MAX)
            .ok();
    }

    /// Select the drive direction
    ///
    /// Reversing under load first drops the duty to zero.
    pub fn set_direction(&mut self, direction: Direction) {
        if direction != self.direction && self.duty > 0 {
            self.set_duty(0);
        }
        self.direction = direction;
        let high = (direction == Direction::Up) != self.config.direction_inverted;
        self.direction_pin.set_state(PinState::from(high)).ok();
    }

    pub fn set_brake(&mut self, engaged: bool) {
        self.braked = engaged;
        let high = engaged != self.config.brake_inverted;
        self.brake_pin.set_state(PinState::from(high)).ok();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        let high = enabled != self.config.enable_inverted;
        self.enable_pin.set_state(PinState::from(high)).ok();
    }

    /// Zero duty and engage the brake
    pub fn halt(&mut self) {
        self.set_duty(0);
        self.set_brake(true);
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_braked(&self) -> bool {
        self.braked
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::{MockPin, MockPwm};
    use super::*;

    type TestMotor = HBridgeMotor<MockPwm, MockPin, MockPin, MockPin>;

    fn motor() -> TestMotor {
        HBridgeMotor::new(
            MockPwm::default(),
            MockPin::default(),
            MockPin::default(),
            MockPin::default(),
            HBridgeConfig::default(),
        )
    }

    #[test]
    fn test_starts_halted() {
        let motor = motor();
        assert_eq!(motor.duty(), 0);
        assert_eq!(motor.pwm.duty, 0);
        assert!(motor.is_braked());
        // Active-low brake: engaged means pin low
        assert!(!motor.brake_pin.high);
        assert!(!motor.is_enabled());
        assert!(!motor.enable_pin.high);
    }

    #[test]
    fn test_duty_scaled_to_peripheral() {
        let mut motor = motor();
        motor.set_duty(PWM_RESOLUTION_MAX);
        assert_eq!(motor.pwm.duty, u16::MAX);

        motor.set_duty(2000);
        assert_eq!(motor.duty(), PWM_RESOLUTION_MAX);

        motor.set_duty(0);
        assert_eq!(motor.pwm.duty, 0);
    }

    #[test]
    fn test_direction_pin() {
        let mut motor = motor();
        motor.set_direction(Direction::Up);
        assert!(motor.direction_pin.high);
        motor.set_direction(Direction::Down);
        assert!(!motor.direction_pin.high);
    }

    #[test]
    fn test_reverse_drops_duty() {
        let mut motor = motor();
        motor.set_direction(Direction::Up);
        motor.set_duty(500);
        motor.set_direction(Direction::Down);
        assert_eq!(motor.duty(), 0);

        // Same direction keeps the duty
        motor.set_duty(500);
        motor.set_direction(Direction::Down);
        assert_eq!(motor.duty(), 500);
    }

    #[test]
    fn test_halt() {
        let mut motor = motor();
        motor.set_brake(false);
        assert!(motor.brake_pin.high);
        motor.set_duty(800);
        motor.halt();
        assert_eq!(motor.duty(), 0);
        assert!(motor.is_braked());
        assert!(!motor.brake_pin.high);
    }
}
