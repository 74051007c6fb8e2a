//! Endstop homing procedure
//!
//! Homing runs in four phases:
//!
//! 1. Seek the first endstop (chosen by [`HomeMode`]) at `homing_pwm`
//! 2. Back off until that endstop's overshoot is covered and its sensor clears
//! 3. Seek the opposite endstop
//! 4. Back off from it the same way
//!
//! The two clear points bound the usable travel. The lower clear point
//! becomes the home offset (axis position zero), the distance between them
//! the span.
//!
//! Every phase fails on a stall (no counter movement for `stall_timeout_ms`)
//! and on a watchdog of 16 stall timeouts, so homing always ends within
//! `4 * 16 * stall_timeout_ms`.

use crate::config::{HomeMode, Tunables};
use crate::traits::{Direction, SensorSample};

/// Homing phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingPhase {
    SeekFirst,
    BackOffFirst,
    SeekSecond,
    BackOffSecond,
}

/// Reasons homing can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingFailure {
    /// Counter did not move for the stall timeout
    Stall(HomingPhase),
    /// Phase kept moving without reaching its goal
    PhaseTimeout(HomingPhase),
    /// Both endstops reported active at once
    BothEndstops,
    /// Measured span below the configured minimum
    SpanTooShort(i32),
}

/// Calibration measured by a successful homing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HomingResult {
    /// Absolute count of axis position zero
    pub home_offset: i32,
    /// Usable travel in counts
    pub span: i32,
}

/// What the controller should do after a homing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingStep {
    /// Keep driving
    Drive { direction: Direction, pwm: u16 },
    Complete(HomingResult),
    Failed(HomingFailure),
}

/// Homing procedure state
#[derive(Debug, Clone)]
pub struct Homing {
    phase: HomingPhase,
    first: Direction,
    pwm: u16,
    stall_timeout_ms: u32,
    phase_limit_ms: u32,
    overshoot_lower: i32,
    overshoot_upper: i32,
    min_span: i32,
    /// Set on the first step of each phase
    phase_started_ms: Option<u32>,
    last_position: i32,
    last_move_ms: u32,
    /// Absolute count where the current endstop triggered
    trigger_position: i32,
    /// Clear point after the first back-off
    first_clear: i32,
}

impl Homing {
    pub fn new(tunables: &Tunables) -> Self {
        let first = match tunables.home_mode {
            HomeMode::LowerFirst => Direction::Down,
            HomeMode::UpperFirst => Direction::Up,
        };

        Self {
            phase: HomingPhase::SeekFirst,
            first,
            pwm: tunables.homing_pwm,
            stall_timeout_ms: tunables.stall_timeout_ms,
            phase_limit_ms: tunables.homing_phase_limit_ms(),
            overshoot_lower: tunables.overshoot_lower_counts,
            overshoot_upper: tunables.overshoot_upper_counts,
            min_span: tunables.min_span_counts,
            phase_started_ms: None,
            last_position: 0,
            last_move_ms: 0,
            trigger_position: 0,
            first_clear: 0,
        }
    }

    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    /// Advance the procedure with this tick's sensor readings
    pub fn step(&mut self, sample: &SensorSample, now_ms: u32) -> HomingStep {
        if sample.both_endstops_active() {
            return HomingStep::Failed(HomingFailure::BothEndstops);
        }

        let started = match self.phase_started_ms {
            Some(t) => t,
            None => {
                self.begin_phase(self.phase, sample.position, now_ms);
                now_ms
            }
        };

        if sample.position != self.last_position {
            self.last_position = sample.position;
            self.last_move_ms = now_ms;
        }
        if now_ms.wrapping_sub(self.last_move_ms) >= self.stall_timeout_ms {
            return HomingStep::Failed(HomingFailure::Stall(self.phase));
        }
        if now_ms.wrapping_sub(started) >= self.phase_limit_ms {
            return HomingStep::Failed(HomingFailure::PhaseTimeout(self.phase));
        }

        match self.phase {
            HomingPhase::SeekFirst => self.seek(sample, now_ms, self.first),
            HomingPhase::SeekSecond => self.seek(sample, now_ms, self.first.opposite()),
            HomingPhase::BackOffFirst => self.back_off(sample, now_ms, self.first),
            HomingPhase::BackOffSecond => self.back_off(sample, now_ms, self.first.opposite()),
        }
    }

    /// Drive toward the endstop in `toward` until it triggers
    fn seek(&mut self, sample: &SensorSample, now_ms: u32, toward: Direction) -> HomingStep {
        if !sample.endstop_active(toward) {
            return self.drive(toward);
        }

        self.trigger_position = sample.position;
        let next = match self.phase {
            HomingPhase::SeekFirst => HomingPhase::BackOffFirst,
            _ => HomingPhase::BackOffSecond,
        };
        self.begin_phase(next, sample.position, now_ms);
        self.drive(toward.opposite())
    }

    /// Drive away from the endstop at `from` until it is cleared
    fn back_off(&mut self, sample: &SensorSample, now_ms: u32, from: Direction) -> HomingStep {
        let overshoot = match from {
            Direction::Down => self.overshoot_lower,
            Direction::Up => self.overshoot_upper,
        };
        let moved = (sample.position - self.trigger_position).abs();
        if moved < overshoot || sample.endstop_active(from) {
            return self.drive(from.opposite());
        }

        if self.phase == HomingPhase::BackOffFirst {
            self.first_clear = sample.position;
            self.begin_phase(HomingPhase::SeekSecond, sample.position, now_ms);
            return self.drive(from.opposite());
        }

        let (lower_clear, upper_clear) = match self.first {
            Direction::Down => (self.first_clear, sample.position),
            Direction::Up => (sample.position, self.first_clear),
        };
        let span = upper_clear - lower_clear;
        if span < self.min_span {
            return HomingStep::Failed(HomingFailure::SpanTooShort(span));
        }

        HomingStep::Complete(HomingResult {
            home_offset: lower_clear,
            span,
        })
    }

    fn begin_phase(&mut self, phase: HomingPhase, position: i32, now_ms: u32) {
        self.phase = phase;
        self.phase_started_ms = Some(now_ms);
        self.last_position = position;
        self.last_move_ms = now_ms;
    }

    fn drive(&self, direction: Direction) -> HomingStep {
        HomingStep::Drive {
            direction,
            pwm: self.pwm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TICK_MS: u32 = 5;

    /// Minimal track: sensors active at or beyond each end, carriage moves
    /// a fixed number of counts per tick unless jammed.
    struct Track {
        position: i32,
        lower_at: i32,
        upper_at: i32,
        counts_per_tick: i32,
        jammed: bool,
    }

    impl Track {
        fn sample(&self) -> SensorSample {
            SensorSample {
                position: self.position,
                lower_active: self.position <= self.lower_at,
                upper_active: self.position >= self.upper_at,
                thermal_raw: 0,
            }
        }

        fn apply(&mut self, step: HomingStep) {
            if let HomingStep::Drive { direction, .. } = step {
                if !self.jammed {
                    self.position += match direction {
                        Direction::Up => self.counts_per_tick,
                        Direction::Down => -self.counts_per_tick,
                    };
                }
            }
        }
    }

    fn run(homing: &mut Homing, track: &mut Track, max_ticks: u32) -> (HomingStep, u32) {
        let mut now = 0;
        for _ in 0..max_ticks {
            let step = homing.step(&track.sample(), now);
            if !matches!(step, HomingStep::Drive { .. }) {
                return (step, now);
            }
            track.apply(step);
            now += TICK_MS;
        }
        panic!("homing did not finish");
    }

    fn track() -> Track {
        Track {
            position: 3000,
            lower_at: 100,
            upper_at: 5900,
            counts_per_tick: 5,
            jammed: false,
        }
    }

    #[test]
    fn test_lower_first_measures_span() {
        let mut homing = Homing::new(&Tunables::DEFAULT);
        let mut track = track();
        let (step, _) = run(&mut homing, &mut track, 100_000);

        match step {
            HomingStep::Complete(result) => {
                // Clear points sit just beyond each overshoot
                assert!(result.home_offset > 100 + 60 - 5);
                assert!(result.home_offset <= 100 + 60 + 5);
                let upper_clear = result.home_offset + result.span;
                assert!(upper_clear < 5900 - 60 + 5);
                assert!(upper_clear >= 5900 - 60 - 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_upper_first_same_span() {
        let t = Tunables {
            home_mode: HomeMode::UpperFirst,
            ..Tunables::DEFAULT
        };
        let mut homing = Homing::new(&t);
        assert_eq!(
            homing.step(&track().sample(), 0),
            HomingStep::Drive {
                direction: Direction::Up,
                pwm: 350
            }
        );

        let mut track = track();
        let (step, _) = run(&mut Homing::new(&t), &mut track, 100_000);
        assert!(matches!(step, HomingStep::Complete(r) if r.span > 5500));
    }

    #[test]
    fn test_first_drive_toward_lower() {
        let mut homing = Homing::new(&Tunables::DEFAULT);
        assert_eq!(
            homing.step(&track().sample(), 0),
            HomingStep::Drive {
                direction: Direction::Down,
                pwm: 350
            }
        );
        assert_eq!(homing.phase(), HomingPhase::SeekFirst);
    }

    #[test]
    fn test_stall_fails() {
        let mut homing = Homing::new(&Tunables::DEFAULT);
        let mut track = Track {
            jammed: true,
            ..track()
        };
        let (step, at) = run(&mut homing, &mut track, 10_000);
        assert_eq!(
            step,
            HomingStep::Failed(HomingFailure::Stall(HomingPhase::SeekFirst))
        );
        assert_eq!(at, 1500);
    }

    #[test]
    fn test_short_span_fails() {
        let mut homing = Homing::new(&Tunables::DEFAULT);
        let mut track = Track {
            lower_at: 1000,
            upper_at: 1400,
            position: 1200,
            ..track()
        };
        let (step, _) = run(&mut homing, &mut track, 100_000);
        assert!(matches!(
            step,
            HomingStep::Failed(HomingFailure::SpanTooShort(_))
        ));
    }

    #[test]
    fn test_both_endstops_fails() {
        let mut homing = Homing::new(&Tunables::DEFAULT);
        let sample = SensorSample {
            lower_active: true,
            upper_active: true,
            ..SensorSample::default()
        };
        assert_eq!(
            homing.step(&sample, 0),
            HomingStep::Failed(HomingFailure::BothEndstops)
        );
    }

    #[test]
    fn test_missing_endstop_hits_watchdog() {
        let mut homing = Homing::new(&Tunables::DEFAULT);
        let mut track = Track {
            lower_at: i32::MIN,
            ..track()
        };
        let (step, at) = run(&mut homing, &mut track, 100_000);
        assert_eq!(
            step,
            HomingStep::Failed(HomingFailure::PhaseTimeout(HomingPhase::SeekFirst))
        );
        assert_eq!(at, Tunables::DEFAULT.homing_phase_limit_ms());
    }

    proptest! {
        #[test]
        fn prop_homing_terminates(
            start in 0i32..6000,
            upper_at in 200i32..6000,
            counts_per_tick in 0i32..12,
        ) {
            let t = Tunables::DEFAULT;
            let mut homing = Homing::new(&t);
            let mut track = Track {
                position: start,
                lower_at: 100,
                upper_at,
                counts_per_tick,
                jammed: false,
            };

            let bound = 4 * t.homing_phase_limit_ms();
            let (step, at) = run(&mut homing, &mut track, bound / TICK_MS + 1);
            prop_assert!(at <= bound);
            if let HomingStep::Complete(result) = step {
                prop_assert!(result.span >= t.min_span_counts);
            }
        }
    }
}
