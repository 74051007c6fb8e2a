//! Actuator board
//!
//! Binds the H-bridge, the two optical endstops, the thermal ADC and the
//! hall position counter to the core's hardware capability set.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use openhandy_core::traits::{
    ActuatorHardware, AnalogChannel, DigitalInput, DigitalOutput, Direction,
};
use openhandy_hal::{AnalogInput, PositionCounter};

use crate::motor::HBridgeMotor;

/// Actuator board I/O
pub struct ActuatorBoard<'a, P, D, B, E, L, U, A> {
    motor: HBridgeMotor<P, D, B, E>,
    lower_endstop: L,
    upper_endstop: U,
    thermal: A,
    counter: &'a PositionCounter,
    read_errors: u32,
}

impl<'a, P, D, B, E, L, U, A> ActuatorBoard<'a, P, D, B, E, L, U, A>
where
    P: SetDutyCycle,
    D: OutputPin,
    B: OutputPin,
    E: OutputPin,
    L: InputPin,
    U: InputPin,
    A: AnalogInput,
{
    pub fn new(
        motor: HBridgeMotor<P, D, B, E>,
        lower_endstop: L,
        upper_endstop: U,
        thermal: A,
        counter: &'a PositionCounter,
    ) -> Self {
        Self {
            motor,
            lower_endstop,
            upper_endstop,
            thermal,
            counter,
            read_errors: 0,
        }
    }

    #[cfg(test)]
    fn motor(&self) -> &HBridgeMotor<P, D, B, E> {
        &self.motor
    }

    /// Failed pin or ADC reads so far
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }
}

impl<P, D, B, E, L, U, A> ActuatorHardware for ActuatorBoard<'_, P, D, B, E, L, U, A>
where
    P: SetDutyCycle,
    D: OutputPin,
    B: OutputPin,
    E: OutputPin,
    L: InputPin,
    U: InputPin,
    A: AnalogInput,
{
    /// A failed read reports a low level
    fn read_digital(&mut self, input: DigitalInput) -> bool {
        let level = match input {
            DigitalInput::EndstopLower => self.lower_endstop.is_high().ok(),
            DigitalInput::EndstopUpper => self.upper_endstop.is_high().ok(),
        };
        level.unwrap_or_else(|| {
            self.read_errors = self.read_errors.wrapping_add(1);
            false
        })
    }

    fn write_digital(&mut self, output: DigitalOutput, asserted: bool) {
        match output {
            DigitalOutput::Direction => self.motor.set_direction(if asserted {
                Direction::Up
            } else {
                Direction::Down
            }),
            DigitalOutput::Brake => self.motor.set_brake(asserted),
            DigitalOutput::Enable => self.motor.set_enabled(asserted),
        }
    }

    /// A failed conversion reports full scale
    fn read_analog(&mut self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::Thermal => self.thermal.read_raw().unwrap_or_else(|_| {
                self.read_errors = self.read_errors.wrapping_add(1);
                A::MAX_RAW
            }),
        }
    }

    fn write_pwm(&mut self, duty: u16) {
        self.motor.set_duty(duty);
    }

    fn read_position_counter(&mut self) -> i32 {
        self.counter.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::hbridge::mocks::{MockPin, MockPwm};
    use crate::motor::HBridgeConfig;
    use core::convert::Infallible;
    use openhandy_core::config::Tunables;
    use openhandy_core::motion::MotionController;
    use openhandy_core::state::RunState;
    use openhandy_core::ui::ManualUiState;
    use openhandy_hal::AdcError;

    static DEFAULTS: Tunables = Tunables::DEFAULT;

    struct Level(bool);

    impl embedded_hal::digital::ErrorType for Level {
        type Error = Infallible;
    }

    impl InputPin for Level {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    struct Adc(Option<u16>);

    impl AnalogInput for Adc {
        const MAX_RAW: u16 = 4095;

        fn read_raw(&mut self) -> Result<u16, AdcError> {
            self.0.ok_or(AdcError::Conversion)
        }
    }

    type TestBoard<'a> = ActuatorBoard<'a, MockPwm, MockPin, MockPin, MockPin, Level, Level, Adc>;

    fn board(counter: &PositionCounter, lower: bool, upper: bool, adc: Option<u16>) -> TestBoard<'_> {
        let motor = HBridgeMotor::new(
            MockPwm::default(),
            MockPin::default(),
            MockPin::default(),
            MockPin::default(),
            HBridgeConfig::default(),
        );
        ActuatorBoard::new(motor, Level(lower), Level(upper), Adc(adc), counter)
    }

    #[test]
    fn test_inputs() {
        let counter = PositionCounter::new();
        counter.advance(1234);
        let mut board = board(&counter, true, false, Some(1800));

        assert!(board.read_digital(DigitalInput::EndstopLower));
        assert!(!board.read_digital(DigitalInput::EndstopUpper));
        assert_eq!(board.read_analog(AnalogChannel::Thermal), 1800);
        assert_eq!(board.read_position_counter(), 1234);
        assert_eq!(board.read_errors(), 0);
    }

    #[test]
    fn test_adc_failure_reads_full_scale() {
        let counter = PositionCounter::new();
        let mut board = board(&counter, true, true, None);
        assert_eq!(board.read_analog(AnalogChannel::Thermal), 4095);
        assert_eq!(board.read_errors(), 1);
    }

    #[test]
    fn test_outputs() {
        let counter = PositionCounter::new();
        let mut board = board(&counter, true, true, Some(0));

        board.write_digital(DigitalOutput::Enable, true);
        board.write_digital(DigitalOutput::Brake, false);
        board.write_digital(DigitalOutput::Direction, true);
        board.write_pwm(600);

        let motor = board.motor();
        assert!(motor.is_enabled());
        assert!(!motor.is_braked());
        assert_eq!(motor.direction(), Direction::Up);
        assert_eq!(motor.duty(), 600);
    }

    #[test]
    fn test_controller_drives_board() {
        let counter = PositionCounter::new();
        counter.advance(3000);
        // Active-low sensors idle high
        let mut board = board(&counter, true, true, Some(1000));
        let mut ctrl = MotionController::new(&DEFAULTS);
        let ui = ManualUiState::new();

        ctrl.request_homing().unwrap();
        let report = ctrl.tick(&mut board, &ui, 0);
        assert_eq!(ctrl.state(), RunState::Homing);
        assert_eq!(report.output, -(DEFAULTS.homing_pwm as i32));

        let motor = board.motor();
        assert!(motor.is_enabled());
        assert!(!motor.is_braked());
        assert_eq!(motor.direction(), Direction::Down);
        assert_eq!(motor.duty(), DEFAULTS.homing_pwm);
    }

    #[test]
    fn test_thermal_trip_halts_board() {
        let counter = PositionCounter::new();
        let mut board = board(&counter, true, true, Some(4000));
        let mut ctrl = MotionController::new(&DEFAULTS);
        let ui = ManualUiState::new();

        ctrl.request_homing().unwrap();
        for tick in 0..DEFAULTS.thermal_trip_ticks as u32 {
            ctrl.tick(&mut board, &ui, tick * 5);
        }
        assert_eq!(ctrl.state(), RunState::ErrorThermal);

        let motor = board.motor();
        assert_eq!(motor.duty(), 0);
        assert!(motor.is_braked());
        assert!(!motor.is_enabled());
    }
}
