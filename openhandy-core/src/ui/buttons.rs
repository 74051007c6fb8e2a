//! Local button mapping

use super::manual::{ManualUiState, SPEED_STEP};
use crate::command::CommandChannel;
use crate::motion::{CommandRejected, MotionController};
use crate::state::RunState;

/// Presses held at least this long count as long presses
pub const LONG_PRESS_MS: u32 = 800;

/// Front panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Power,
    Up,
    Down,
    Left,
    Right,
    Wifi,
}

/// What a button press does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonAction {
    ToggleMotion,
    /// Reset a latched fault, or rehome from idle
    ResetOrRehome,
    SpeedStep(i8),
    PreviousPattern,
    NextPattern,
    Discover,
}

impl ButtonAction {
    /// Map a completed press to an action
    pub fn from_press(button: Button, held_ms: u32) -> Self {
        let long = held_ms >= LONG_PRESS_MS;
        match button {
            Button::Power if long => ButtonAction::ResetOrRehome,
            Button::Power => ButtonAction::ToggleMotion,
            Button::Up => ButtonAction::SpeedStep(SPEED_STEP),
            Button::Down => ButtonAction::SpeedStep(-SPEED_STEP),
            Button::Left => ButtonAction::PreviousPattern,
            Button::Right => ButtonAction::NextPattern,
            Button::Wifi => ButtonAction::Discover,
        }
    }

    /// Apply the action
    ///
    /// Motion-on cannot be switched on while a fault is latched.
    pub fn apply(
        self,
        controller: &mut MotionController<'_>,
        ui: &mut ManualUiState,
        commands: &mut CommandChannel,
        now_ms: u32,
    ) -> Result<(), CommandRejected> {
        match self {
            ButtonAction::ToggleMotion => {
                let state = controller.state();
                if state.is_fault() && !ui.motion_on() {
                    return Err(CommandRejected::Faulted(state));
                }
                if !ui.toggle_motion() {
                    controller.stop_motion().ok();
                }
            }
            ButtonAction::ResetOrRehome => match controller.state() {
                RunState::Idle => controller.request_homing()?,
                s if s.is_fault() => {
                    controller.reset()?;
                    ui.set_motion_on(false);
                }
                s => return Err(CommandRejected::WrongState(s)),
            },
            ButtonAction::SpeedStep(delta) => {
                ui.speed_step(delta);
            }
            ButtonAction::PreviousPattern => ui.set_pattern_mode(ui.pattern_mode().previous()),
            ButtonAction::NextPattern => ui.set_pattern_mode(ui.pattern_mode().next()),
            ButtonAction::Discover => commands.trigger_discovery(now_ms),
        }
        Ok(())
    }
}
