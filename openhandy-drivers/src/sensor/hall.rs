//! Three-phase hall sensor decoder
//!
//! The motor's hall sensors (HA, HB, HC) step through six valid states per
//! electrical revolution:
//!
//! ```text
//!   index   0    1    2    3    4    5
//!   CBA    001  011  010  110  100  101
//! ```
//!
//! Moving one index forward counts +1 (toward the upper endstop), one index
//! back counts -1. A jump of two indices means one edge was missed while the
//! reader was busy; its direction is still unambiguous, so it counts ±2 and
//! is tallied as skipped. States 000 and 111 cannot occur with healthy
//! sensors, and a jump of three indices has no direction; both are ignored
//! and counted as invalid.

/// Raw hall levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HallState {
    pub a: bool,
    pub b: bool,
    pub c: bool,
}

impl HallState {
    pub fn new(a: bool, b: bool, c: bool) -> Self {
        Self { a, b, c }
    }

    /// Position in the commutation sequence, `None` for 000 and 111
    pub fn index(self) -> Option<u8> {
        let bits = (self.c as u8) << 2 | (self.b as u8) << 1 | self.a as u8;
        match bits {
            0b001 => Some(0),
            0b011 => Some(1),
            0b010 => Some(2),
            0b110 => Some(3),
            0b100 => Some(4),
            0b101 => Some(5),
            _ => None,
        }
    }
}

/// Incremental decoder
#[derive(Debug, Clone, Default)]
pub struct HallDecoder {
    last: Option<u8>,
    invalid: u32,
    skipped: u32,
    /// Reverse the counting direction
    inverted: bool,
}

impl HallDecoder {
    pub const fn new(inverted: bool) -> Self {
        Self {
            last: None,
            invalid: 0,
            skipped: 0,
            inverted,
        }
    }

    /// Feed the current levels; returns the count delta (-2 to +2)
    pub fn update(&mut self, state: HallState) -> i32 {
        let Some(index) = state.index() else {
            self.invalid = self.invalid.wrapping_add(1);
            return 0;
        };

        let Some(last) = self.last.replace(index) else {
            return 0;
        };

        let delta = match (index + 6 - last) % 6 {
            0 => 0,
            1 => 1,
            5 => -1,
            2 => {
                self.skipped = self.skipped.wrapping_add(1);
                2
            }
            4 => {
                self.skipped = self.skipped.wrapping_add(1);
                -2
            }
            _ => {
                self.invalid = self.invalid.wrapping_add(1);
                0
            }
        };

        if self.inverted {
            -delta
        } else {
            delta
        }
    }

    /// Invalid states and directionless jumps seen so far
    pub fn invalid_count(&self) -> u32 {
        self.invalid
    }

    /// Two-index jumps recovered so far
    pub fn skipped_count(&self) -> u32 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEQUENCE: [HallState; 6] = [
        HallState { a: true, b: false, c: false },
        HallState { a: true, b: true, c: false },
        HallState { a: false, b: true, c: false },
        HallState { a: false, b: true, c: true },
        HallState { a: false, b: false, c: true },
        HallState { a: true, b: false, c: true },
    ];

    #[test]
    fn test_sequence_indices() {
        for (i, state) in SEQUENCE.iter().enumerate() {
            assert_eq!(state.index(), Some(i as u8));
        }
        assert_eq!(HallState::new(false, false, false).index(), None);
        assert_eq!(HallState::new(true, true, true).index(), None);
    }

    #[test]
    fn test_forward_and_reverse() {
        let mut decoder = HallDecoder::new(false);
        assert_eq!(decoder.update(SEQUENCE[0]), 0);

        let mut total = 0;
        for state in SEQUENCE.iter().cycle().skip(1).take(12) {
            total += decoder.update(*state);
        }
        assert_eq!(total, 12);

        // Walk back
        for state in SEQUENCE.iter().rev().take(6) {
            total += decoder.update(*state);
        }
        assert_eq!(total, 6);
        assert_eq!(decoder.invalid_count(), 0);
    }

    #[test]
    fn test_invalid_states_ignored() {
        let mut decoder = HallDecoder::new(false);
        decoder.update(SEQUENCE[0]);
        assert_eq!(decoder.update(HallState::new(false, false, false)), 0);
        assert_eq!(decoder.update(HallState::new(true, true, true)), 0);
        // Tracking continues from the last valid state
        assert_eq!(decoder.update(SEQUENCE[1]), 1);
        assert_eq!(decoder.invalid_count(), 2);
    }

    #[test]
    fn test_missed_edge_still_counted() {
        let mut decoder = HallDecoder::new(false);
        decoder.update(SEQUENCE[0]);
        // 0 -> 2 with index 1 never observed
        assert_eq!(decoder.update(SEQUENCE[2]), 2);
        assert_eq!(decoder.update(SEQUENCE[3]), 1);
        // 3 -> 1 backwards
        assert_eq!(decoder.update(SEQUENCE[1]), -2);
        // Wraps across the end of the sequence
        assert_eq!(decoder.update(SEQUENCE[5]), -2);
        assert_eq!(decoder.skipped_count(), 3);
        assert_eq!(decoder.invalid_count(), 0);
    }

    #[test]
    fn test_opposite_state_ignored() {
        let mut decoder = HallDecoder::new(false);
        decoder.update(SEQUENCE[0]);
        assert_eq!(decoder.update(SEQUENCE[3]), 0);
        assert_eq!(decoder.invalid_count(), 1);
        assert_eq!(decoder.update(SEQUENCE[4]), 1);
    }

    #[test]
    fn test_sampled_every_other_state_keeps_total() {
        let mut decoder = HallDecoder::new(false);
        decoder.update(SEQUENCE[0]);
        let mut total = 0;
        for state in SEQUENCE.iter().cycle().skip(2).step_by(2).take(9) {
            total += decoder.update(*state);
        }
        assert_eq!(total, 18);
    }

    #[test]
    fn test_inverted() {
        let mut decoder = HallDecoder::new(true);
        decoder.update(SEQUENCE[0]);
        assert_eq!(decoder.update(SEQUENCE[1]), -1);
    }

    proptest! {
        #[test]
        fn prop_delta_is_bounded(levels in proptest::collection::vec(any::<(bool, bool, bool)>(), 1..100)) {
            let mut decoder = HallDecoder::new(false);
            for (a, b, c) in levels {
                let delta = decoder.update(HallState::new(a, b, c));
                prop_assert!((-2..=2).contains(&delta));
            }
        }
    }
}
