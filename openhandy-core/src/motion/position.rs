//! Calibrated travel limits and target clamping
//!
//! Positions are encoder counts. The absolute count is free-running; the
//! axis position is the absolute count minus the home offset discovered by
//! homing, so a calibrated axis runs from `pos_min = 0` to `pos_max = span`.

use crate::config::tunables::AXIS_UNITS;

/// Usable sub-range of the calibrated span, as fractions `0 <= lower < upper <= 1`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Crop {
    pub lower: f32,
    pub upper: f32,
}

impl Crop {
    /// Full travel
    pub const FULL: Crop = Crop {
        lower: 0.0,
        upper: 1.0,
    };

    /// Check the ordering and range invariants
    pub fn is_valid(&self) -> bool {
        self.lower.is_finite()
            && self.upper.is_finite()
            && self.lower >= 0.0
            && self.upper <= 1.0
            && self.lower < self.upper
    }
}

impl Default for Crop {
    fn default() -> Self {
        Self::FULL
    }
}

/// An inclusive band of axis positions, `lower <= upper`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Band {
    pub lower: i32,
    pub upper: i32,
}

impl Band {
    pub fn span(&self) -> i32 {
        self.upper - self.lower
    }

    pub fn center(&self) -> i32 {
        self.lower + self.span() / 2
    }

    pub fn clamp(&self, position: i32) -> i32 {
        position.clamp(self.lower, self.upper)
    }

    pub fn contains(&self, position: i32) -> bool {
        (self.lower..=self.upper).contains(&position)
    }
}

/// Calibrated travel limits
///
/// Only homing creates valid limits; they are never edited afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Limits {
    pub pos_min: i32,
    pub pos_max: i32,
    pub valid: bool,
}

impl Limits {
    /// Limits for a freshly measured span
    ///
    /// Returns invalid limits for a non-positive span.
    pub fn from_span(span: i32) -> Self {
        Self {
            pos_min: 0,
            pos_max: span.max(0),
            valid: span > 0,
        }
    }

    pub fn span(&self) -> i32 {
        self.pos_max - self.pos_min
    }

    /// Map a normalized fraction onto the calibrated range
    pub fn map_fraction(&self, fraction: f32) -> i32 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.pos_min + (fraction * self.span() as f32 + 0.5) as i32
    }

    /// Positions a target may occupy under the given crop
    ///
    /// Both ends keep `margin` counts away from the calibrated limits. If
    /// the crop is narrower than the margins allow, the band collapses to
    /// its midpoint.
    pub fn crop_band(&self, crop: Crop, margin: i32) -> Band {
        let crop = if crop.is_valid() { crop } else { Crop::FULL };
        let safe_lower = self.pos_min + margin;
        let safe_upper = self.pos_max - margin;

        let lower = self.map_fraction(crop.lower).max(safe_lower);
        let upper = self.map_fraction(crop.upper).min(safe_upper);

        if lower <= upper {
            Band { lower, upper }
        } else {
            let mid = self.pos_min + self.span() / 2;
            Band {
                lower: mid,
                upper: mid,
            }
        }
    }

    /// Map a normalized command into the cropped band
    pub fn command_target(&self, fraction: f32, crop: Crop, margin: i32) -> i32 {
        self.crop_band(crop, margin).clamp(self.map_fraction(fraction))
    }

    /// Deadband in counts for a deadband expressed in axis units
    pub fn deadband_counts(&self, axis_deadband: f32) -> i32 {
        let counts = axis_deadband * self.span() as f32 / AXIS_UNITS;
        (counts + 0.5) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_span() {
        let limits = Limits::from_span(5000);
        assert!(limits.valid);
        assert_eq!(limits.pos_min, 0);
        assert_eq!(limits.pos_max, 5000);

        assert!(!Limits::from_span(0).valid);
        assert!(!Limits::from_span(-10).valid);
    }

    #[test]
    fn test_map_fraction() {
        let limits = Limits::from_span(1000);
        assert_eq!(limits.map_fraction(0.0), 0);
        assert_eq!(limits.map_fraction(0.5), 500);
        assert_eq!(limits.map_fraction(1.0), 1000);
        assert_eq!(limits.map_fraction(1.5), 1000);
        assert_eq!(limits.map_fraction(f32::NAN), 0);
    }

    #[test]
    fn test_crop_band_respects_margin() {
        let limits = Limits::from_span(1000);
        let band = limits.crop_band(Crop::FULL, 20);
        assert_eq!(band, Band { lower: 20, upper: 980 });

        let band = limits.crop_band(
            Crop {
                lower: 0.25,
                upper: 0.75,
            },
            20,
        );
        assert_eq!(band, Band { lower: 250, upper: 750 });
    }

    #[test]
    fn test_crop_band_collapses() {
        let limits = Limits::from_span(1000);
        let crop = Crop {
            lower: 0.0,
            upper: 0.01,
        };
        let band = limits.crop_band(crop, 20);
        assert_eq!(band, Band { lower: 500, upper: 500 });
    }

    #[test]
    fn test_invalid_crop_treated_as_full() {
        let limits = Limits::from_span(1000);
        let crop = Crop {
            lower: 0.8,
            upper: 0.2,
        };
        assert_eq!(limits.crop_band(crop, 0), Band { lower: 0, upper: 1000 });
    }

    #[test]
    fn test_command_target_midpoint() {
        let limits = Limits::from_span(1000);
        let crop = Crop {
            lower: 0.2,
            upper: 0.6,
        };
        assert_eq!(limits.command_target(0.5, crop, 20), 500);
        assert_eq!(limits.command_target(0.9, crop, 20), 600);
        assert_eq!(limits.command_target(0.0, crop, 20), 200);
    }

    #[test]
    fn test_deadband_counts() {
        let limits = Limits::from_span(5000);
        assert_eq!(limits.deadband_counts(40.0), 20);
        assert_eq!(limits.deadband_counts(0.0), 0);
    }

    proptest! {
        #[test]
        fn prop_command_target_within_limits(
            span in 100i32..100_000,
            fraction in -1.0f32..2.0,
            lower in 0.0f32..1.0,
            width in 0.001f32..1.0,
            margin in 0i32..40,
        ) {
            let limits = Limits::from_span(span);
            let crop = Crop { lower, upper: (lower + width).min(1.0) };
            let target = limits.command_target(fraction, crop, margin);

            prop_assert!(limits.pos_min < limits.pos_max);
            prop_assert!(target >= limits.pos_min && target <= limits.pos_max);
            prop_assert!(limits.crop_band(crop, margin).contains(target));
        }
    }
}
