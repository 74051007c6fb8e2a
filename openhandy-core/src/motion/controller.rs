//! Motion controller
//!
//! Owns the run state, the calibration and the position target. One call
//! to [`MotionController::tick`] per control period runs, in order:
//!
//! 1. Sensor read (counter, endstops, thermal)
//! 2. Safety supervision; a fault zeroes PWM and engages the brake before
//!    anything else happens in that tick
//! 3. The step for the current state (homing, hold, command tracking or
//!    pattern tracking)
//! 4. Output write
//!
//! Commands from the network and the buttons are applied between ticks
//! through the `request_*`/`apply_*` methods. Every state change, whether
//! from a tick or a command, is reported in the next [`TickReport`].

use heapless::Vec;

use super::control::{speed_for_interval, PositionLoop};
use super::homing::{Homing, HomingResult, HomingStep};
use super::position::{Crop, Limits};
use crate::config::Tunables;
use crate::pattern::{self, PatternParams};
use crate::safety::{FaultKind, SafetyStatus, SafetySupervisor};
use crate::state::{Event, RunState};
use crate::status::StatusSnapshot;
use crate::traits::{ActuatorHardware, DigitalOutput, Direction, SensorSample};
use crate::ui::ManualUiState;

/// Transitions buffered between ticks
pub const MAX_PENDING_TRANSITIONS: usize = 8;

/// Why a request was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandRejected {
    /// The controller is latched in a fault state
    Faulted(RunState),
    /// A pattern owns the target
    PatternActive,
    /// The request does not apply in this state
    WrongState(RunState),
}

/// A state change and its cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: RunState,
    pub to: RunState,
    pub event: Event,
}

/// Outcome of one control tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Signed PWM written this tick
    pub output: i32,
    /// State changes since the previous report, oldest first
    pub transitions: Vec<Transition, MAX_PENDING_TRANSITIONS>,
    /// Calibration from a homing run that finished this tick
    pub homed: Option<HomingResult>,
}

/// The motion controller
pub struct MotionController<'a> {
    tunables: &'a Tunables,
    position_loop: PositionLoop,
    safety: SafetySupervisor,
    state: RunState,
    limits: Limits,
    home_offset: i32,
    homing: Option<Homing>,
    target: Option<i32>,
    /// Speed percent for command tracking, from the move interval
    command_speed_pct: u8,
    pattern_started_ms: u32,
    sample: SensorSample,
    output: i32,
    pending: Vec<Transition, MAX_PENDING_TRANSITIONS>,
}

impl<'a> MotionController<'a> {
    /// Create a controller in `Idle`
    pub fn new(tunables: &'a Tunables) -> Self {
        Self {
            tunables,
            position_loop: PositionLoop::new(tunables),
            safety: SafetySupervisor::new(tunables),
            state: RunState::Idle,
            limits: Limits::default(),
            home_offset: 0,
            homing: None,
            target: None,
            command_speed_pct: 100,
            pattern_started_ms: 0,
            sample: SensorSample::default(),
            output: 0,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Current target in axis counts
    pub fn target(&self) -> Option<i32> {
        self.target
    }

    /// Last sampled position relative to the home offset
    pub fn axis_position(&self) -> i32 {
        self.sample.position - self.home_offset
    }

    /// Start homing (startup or rehome); only honored from `Idle`
    pub fn request_homing(&mut self) -> Result<(), CommandRejected> {
        match self.state {
            RunState::Idle => {
                self.limits = Limits::default();
                self.homing = None;
                self.target = None;
                self.apply_event(Event::StartHoming);
                Ok(())
            }
            s if s.is_fault() => Err(CommandRejected::Faulted(s)),
            s => Err(CommandRejected::WrongState(s)),
        }
    }

    /// Clear a latched fault and return to `Idle`
    ///
    /// Calibration is discarded; the carriage must be homed again.
    pub fn reset(&mut self) -> Result<(), CommandRejected> {
        if !self.state.is_fault() {
            return Err(CommandRejected::WrongState(self.state));
        }
        self.safety.reset();
        self.limits = Limits::default();
        self.homing = None;
        self.target = None;
        self.apply_event(Event::Reset);
        Ok(())
    }

    /// Check whether [`Self::apply_axis_command`] would be honored now
    pub fn accepts_axis_command(&self) -> Result<(), CommandRejected> {
        match self.state {
            RunState::Ready | RunState::Running => Ok(()),
            RunState::Pattern => Err(CommandRejected::PatternActive),
            s if s.is_fault() => Err(CommandRejected::Faulted(s)),
            s => Err(CommandRejected::WrongState(s)),
        }
    }

    /// Set a new target from a normalized position
    ///
    /// `interval_ms` is the requested move duration; it sets the speed used
    /// by the low-speed gain schedule. Returns the clamped target.
    pub fn apply_axis_command(
        &mut self,
        fraction: f32,
        interval_ms: Option<u32>,
        crop: Crop,
    ) -> Result<i32, CommandRejected> {
        self.accepts_axis_command()?;

        let target =
            self.limits
                .command_target(fraction, crop, self.tunables.travel_margin_counts);
        self.command_speed_pct = match interval_ms {
            Some(ms) => speed_for_interval(
                target - self.axis_position(),
                ms,
                self.tunables.pattern_base_cps,
            ),
            None => 100,
        };
        self.target = Some(target);
        self.apply_event(Event::MotionCommanded);
        Ok(target)
    }

    /// Hold the current position
    ///
    /// The controller drops back to `Ready` once motion-on is also cleared.
    pub fn stop_motion(&mut self) -> Result<(), CommandRejected> {
        match self.state {
            RunState::Running | RunState::Pattern => {
                self.target = Some(self.axis_position());
                Ok(())
            }
            s if s.is_fault() => Err(CommandRejected::Faulted(s)),
            _ => Ok(()),
        }
    }

    /// Run one control period
    pub fn tick<H: ActuatorHardware>(
        &mut self,
        hw: &mut H,
        ui: &ManualUiState,
        now_ms: u32,
    ) -> TickReport {
        let sample = SensorSample::read(hw, self.tunables);
        self.sample = sample;

        if let SafetyStatus::Fault(kind) = self.safety.check(self.state, &sample) {
            self.halt(hw);
            self.apply_event(match kind {
                FaultKind::Collision => Event::Collision,
                FaultKind::Thermal => Event::ThermalTrip,
            });
            hw.write_digital(DigitalOutput::Enable, false);
            return self.report(None);
        }

        let mut homed = None;
        let output = match self.state {
            RunState::Homing => self.step_homing(now_ms, &mut homed),
            RunState::Ready => {
                self.step_ready(ui, now_ms);
                0
            }
            RunState::Running => self.step_running(),
            RunState::Pattern => self.step_pattern(ui, now_ms),
            RunState::Idle | RunState::Error | RunState::ErrorCollision | RunState::ErrorThermal => 0,
        };

        let output = if self.state.motor_allowed() {
            output
        } else {
            0
        };
        hw.write_digital(DigitalOutput::Enable, !self.state.is_fault());
        self.drive(hw, output);
        self.report(homed)
    }

    /// Build a status snapshot from the last tick
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            lower_endstop: self.sample.lower_active,
            upper_endstop: self.sample.upper_active,
            absolute_position: self.sample.position,
            axis_position: self.axis_position(),
            thermal_raw: self.sample.thermal_raw,
            limits: self.limits,
            target: self.target,
            output: self.output,
            collision_fault: self.state == RunState::ErrorCollision,
            thermal_fault: self.state == RunState::ErrorThermal,
        }
    }

    fn step_homing(&mut self, now_ms: u32, homed: &mut Option<HomingResult>) -> i32 {
        let tunables = self.tunables;
        let homing = self.homing.get_or_insert_with(|| Homing::new(tunables));

        match homing.step(&self.sample, now_ms) {
            HomingStep::Drive { direction, pwm } => direction.signed(pwm),
            HomingStep::Complete(result) => {
                self.homing = None;
                self.home_offset = result.home_offset;
                self.limits = Limits::from_span(result.span);
                self.target = None;
                *homed = Some(result);
                self.apply_event(Event::HomingComplete);
                0
            }
            HomingStep::Failed(failure) => {
                self.homing = None;
                self.apply_event(Event::HomingFailed(failure));
                0
            }
        }
    }

    fn step_ready(&mut self, ui: &ManualUiState, now_ms: u32) {
        if ui.motion_on() && ui.speed_percent() > 0 {
            self.start_pattern(now_ms);
        }
    }

    fn step_running(&mut self) -> i32 {
        let deadband = self.deadband_counts();
        let error = match self.target {
            Some(target) => target - self.axis_position(),
            None => 0,
        };

        if !PositionLoop::within_deadband(error, deadband) {
            return self
                .position_loop
                .output(error, deadband, self.command_speed_pct);
        }

        // With motion-on set, Ready starts the pattern on the next tick
        self.apply_event(Event::TargetReached);
        0
    }

    fn step_pattern(&mut self, ui: &ManualUiState, now_ms: u32) -> i32 {
        if !ui.motion_on() {
            self.target = Some(self.axis_position());
            self.apply_event(Event::TargetReached);
            return 0;
        }

        let deadband = self.deadband_counts();
        let speed_pct = ui.speed_percent();

        // Zero speed holds the last target
        if speed_pct > 0 {
            let params = PatternParams {
                mode: ui.pattern_mode(),
                speed_pct,
                band: self
                    .limits
                    .crop_band(ui.crop(), self.tunables.travel_margin_counts),
                base_cps: self.tunables.pattern_base_cps,
                deadband_counts: deadband,
            };
            let elapsed = now_ms.wrapping_sub(self.pattern_started_ms);
            self.target = Some(pattern::evaluate(&params, elapsed));
        }

        match self.target {
            Some(target) => {
                self.position_loop
                    .output(target - self.axis_position(), deadband, speed_pct)
            }
            None => 0,
        }
    }

    fn start_pattern(&mut self, now_ms: u32) {
        self.pattern_started_ms = now_ms;
        self.apply_event(Event::PatternEnabled);
    }

    fn deadband_counts(&self) -> i32 {
        self.limits.deadband_counts(self.tunables.axis_deadband)
    }

    /// Zero PWM and engage the brake
    fn halt<H: ActuatorHardware>(&mut self, hw: &mut H) {
        hw.write_pwm(0);
        hw.write_digital(DigitalOutput::Brake, true);
        self.output = 0;
        self.homing = None;
        self.target = None;
    }

    /// Write a signed PWM command; zero also engages the brake
    fn drive<H: ActuatorHardware>(&mut self, hw: &mut H, output: i32) {
        match Direction::from_output(output) {
            None => {
                hw.write_pwm(0);
                hw.write_digital(DigitalOutput::Brake, true);
            }
            Some(direction) => {
                hw.write_digital(DigitalOutput::Brake, false);
                hw.write_digital(DigitalOutput::Direction, direction == Direction::Up);
                hw.write_pwm(output.unsigned_abs().min(u16::MAX as u32) as u16);
            }
        }
        self.output = output;
    }

    fn apply_event(&mut self, event: Event) {
        let from = self.state;
        let to = from.transition(event);
        if from != to {
            self.state = to;
            // A full buffer only loses the report, never the transition
            let _ = self.pending.push(Transition { from, to, event });
        }
    }

    fn report(&mut self, homed: Option<HomingResult>) -> TickReport {
        TickReport {
            output: self.output,
            transitions: core::mem::take(&mut self.pending),
            homed,
        }
    }
}
