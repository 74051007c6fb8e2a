//! Manual control state
//!
//! Written by local buttons and remote admin requests, read by the motion
//! controller once per tick.

use crate::motion::Crop;
use crate::pattern::PatternMode;

/// Speed change per Up/Down press
pub const SPEED_STEP: i8 = 10;

/// Default speed percent at boot
pub const DEFAULT_SPEED_PCT: u8 = 50;

/// Rejected crop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CropError {
    /// Bounds outside `[0, 1]` or not finite
    OutOfRange,
    /// `lower >= upper`
    Inverted,
}

/// Manual speed, crop, pattern and motion-on settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManualUiState {
    speed_percent: u8,
    crop: Crop,
    pattern_mode: PatternMode,
    motion_on: bool,
}

impl Default for ManualUiState {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualUiState {
    pub const fn new() -> Self {
        Self {
            speed_percent: DEFAULT_SPEED_PCT,
            crop: Crop::FULL,
            pattern_mode: PatternMode::Sine,
            motion_on: false,
        }
    }

    pub fn speed_percent(&self) -> u8 {
        self.speed_percent
    }

    /// Set the speed, clamped to 100; returns the applied value
    pub fn set_speed_percent(&mut self, percent: u8) -> u8 {
        self.speed_percent = percent.min(100);
        self.speed_percent
    }

    /// Nudge the speed by `delta`, saturating at 0 and 100
    pub fn speed_step(&mut self, delta: i8) -> u8 {
        let stepped = (self.speed_percent as i16 + delta as i16).clamp(0, 100);
        self.speed_percent = stepped as u8;
        self.speed_percent
    }

    pub fn crop(&self) -> Crop {
        self.crop
    }

    /// Set the crop fractions; rejected values leave the crop unchanged
    pub fn set_cropping(&mut self, lower: f32, upper: f32) -> Result<Crop, CropError> {
        let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(lower) || !in_range(upper) {
            return Err(CropError::OutOfRange);
        }
        if lower >= upper {
            return Err(CropError::Inverted);
        }
        self.crop = Crop { lower, upper };
        Ok(self.crop)
    }

    pub fn pattern_mode(&self) -> PatternMode {
        self.pattern_mode
    }

    pub fn set_pattern_mode(&mut self, mode: PatternMode) {
        self.pattern_mode = mode;
    }

    pub fn motion_on(&self) -> bool {
        self.motion_on
    }

    pub fn set_motion_on(&mut self, on: bool) {
        self.motion_on = on;
    }

    /// Flip motion-on; returns the new value
    pub fn toggle_motion(&mut self) -> bool {
        self.motion_on = !self.motion_on;
        self.motion_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ui = ManualUiState::new();
        assert_eq!(ui.speed_percent(), 50);
        assert_eq!(ui.crop(), Crop::FULL);
        assert_eq!(ui.pattern_mode(), PatternMode::Sine);
        assert!(!ui.motion_on());
    }

    #[test]
    fn test_speed_step_saturates() {
        let mut ui = ManualUiState::new();
        assert_eq!(ui.speed_step(SPEED_STEP), 60);
        ui.set_speed_percent(95);
        assert_eq!(ui.speed_step(SPEED_STEP), 100);
        ui.set_speed_percent(5);
        assert_eq!(ui.speed_step(-SPEED_STEP), 0);
        assert_eq!(ui.speed_step(i8::MIN), 0);
    }

    #[test]
    fn test_set_speed_clamped() {
        let mut ui = ManualUiState::new();
        assert_eq!(ui.set_speed_percent(250), 100);
        assert_eq!(ui.set_speed_percent(0), 0);
    }

    #[test]
    fn test_cropping_validation() {
        let mut ui = ManualUiState::new();
        assert!(ui.set_cropping(0.2, 0.8).is_ok());
        assert_eq!(ui.set_cropping(0.8, 0.2), Err(CropError::Inverted));
        assert_eq!(ui.set_cropping(0.5, 0.5), Err(CropError::Inverted));
        assert_eq!(ui.set_cropping(-0.1, 0.5), Err(CropError::OutOfRange));
        assert_eq!(ui.set_cropping(0.1, f32::NAN), Err(CropError::OutOfRange));
        // Rejected settings leave the previous crop
        assert_eq!(
            ui.crop(),
            Crop {
                lower: 0.2,
                upper: 0.8
            }
        );
    }

    #[test]
    fn test_toggle_motion() {
        let mut ui = ManualUiState::new();
        assert!(ui.toggle_motion());
        assert!(!ui.toggle_motion());
    }
}
