//! Stroke pattern generation
//!
//! Maps (elapsed time, speed, crop band, mode) to a target position. The
//! controller feeds the result through the same position loop as any other
//! target.

pub mod generator;

pub use generator::{evaluate, period_ms, PatternParams};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pattern shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PatternMode {
    /// Sinusoid around the band center
    #[default]
    Sine,
    /// Triangle wave between the band ends
    Bounce,
    /// Triangle wave with a nested secondary oscillation
    DoubleBounce,
}

impl PatternMode {
    pub const COUNT: u8 = 3;

    /// Mode for a wire index (`0..=2`)
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(PatternMode::Sine),
            1 => Some(PatternMode::Bounce),
            2 => Some(PatternMode::DoubleBounce),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Next mode, wrapping
    pub fn next(self) -> Self {
        Self::from_index((self.index() + 1) % Self::COUNT).unwrap_or_default()
    }

    /// Previous mode, wrapping
    pub fn previous(self) -> Self {
        Self::from_index((self.index() + Self::COUNT - 1) % Self::COUNT).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_mapping() {
        for i in 0..PatternMode::COUNT {
            assert_eq!(PatternMode::from_index(i).unwrap().index(), i);
        }
        assert_eq!(PatternMode::from_index(3), None);
    }

    #[test]
    fn test_cycling_wraps() {
        assert_eq!(PatternMode::Sine.next(), PatternMode::Bounce);
        assert_eq!(PatternMode::DoubleBounce.next(), PatternMode::Sine);
        assert_eq!(PatternMode::Sine.previous(), PatternMode::DoubleBounce);
        assert_eq!(PatternMode::Bounce.previous(), PatternMode::Sine);
    }
}
