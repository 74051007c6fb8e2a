//! Pattern target evaluation
//!
//! Every pattern is a pure function of elapsed time: the phase is taken
//! from `elapsed_ms % period_ms` in integer arithmetic, so the same inputs
//! always give the same target and resuming mid-cycle never drifts.

use core::f32::consts::PI;

#[allow(unused_imports)]
use micromath::F32Ext;

use super::PatternMode;
use crate::motion::Band;

/// Share of the double-bounce travel given to the nested oscillation
const DOUBLE_BOUNCE_INNER: f32 = 0.2;

/// Inner oscillations per double-bounce period
const DOUBLE_BOUNCE_RATIO: f32 = 4.0;

/// Inputs to a pattern evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternParams {
    pub mode: PatternMode,
    /// Speed percent `0..=100`
    pub speed_pct: u8,
    /// Cropped travel band
    pub band: Band,
    /// Counts per second per speed percent
    pub base_cps: f32,
    /// Bands this narrow hold the center
    pub deadband_counts: i32,
}

/// Full cycle duration for a speed and travel span
///
/// One cycle covers the span twice (out and back) at
/// `base_cps * speed_pct` counts per second. `None` when the pattern is
/// stationary (zero speed or empty span).
pub fn period_ms(speed_pct: u8, span: i32, base_cps: f32) -> Option<u32> {
    if speed_pct == 0 || span <= 0 || !(base_cps > 0.0) {
        return None;
    }
    let cps = base_cps * speed_pct as f32;
    let ms = (2.0 * span as f32 * 1000.0 / cps).round();
    Some((ms as u32).max(1))
}

/// Triangle wave over one unit phase, `0 -> 1 -> 0`
fn triangle(phase: f32) -> f32 {
    if phase < 0.5 {
        2.0 * phase
    } else {
        2.0 - 2.0 * phase
    }
}

/// Normalized position in `[0, 1]` for a unit phase
fn shape(mode: PatternMode, phase: f32) -> f32 {
    match mode {
        PatternMode::Sine => 0.5 + 0.5 * (2.0 * PI * phase).sin(),
        PatternMode::Bounce => triangle(phase),
        PatternMode::DoubleBounce => {
            let inner = (DOUBLE_BOUNCE_RATIO * phase).fract();
            (1.0 - DOUBLE_BOUNCE_INNER) * triangle(phase) + DOUBLE_BOUNCE_INNER * triangle(inner)
        }
    }
}

/// Target position at `elapsed_ms` into the pattern
pub fn evaluate(params: &PatternParams, elapsed_ms: u32) -> i32 {
    let band = params.band;
    let span = band.span();
    if span <= params.deadband_counts {
        return band.center();
    }

    let Some(period) = period_ms(params.speed_pct, span, params.base_cps) else {
        return band.center();
    };

    let phase = (elapsed_ms % period) as f32 / period as f32;
    let unit = shape(params.mode, phase).clamp(0.0, 1.0);
    band.clamp(band.lower + (unit * span as f32).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(mode: PatternMode, speed_pct: u8) -> PatternParams {
        PatternParams {
            mode,
            speed_pct,
            band: Band {
                lower: 1000,
                upper: 3000,
            },
            base_cps: 20.0,
            deadband_counts: 20,
        }
    }

    #[test]
    fn test_period_scales_with_speed() {
        // 2 * 2000 counts at 20 * 100 cps
        assert_eq!(period_ms(100, 2000, 20.0), Some(2000));
        assert_eq!(period_ms(50, 2000, 20.0), Some(4000));
        assert_eq!(period_ms(0, 2000, 20.0), None);
        assert_eq!(period_ms(50, 0, 20.0), None);
    }

    #[test]
    fn test_bounce_traces_triangle() {
        let p = params(PatternMode::Bounce, 50);
        assert_eq!(evaluate(&p, 0), 1000);
        assert_eq!(evaluate(&p, 1000), 2000);
        assert_eq!(evaluate(&p, 2000), 3000);
        assert_eq!(evaluate(&p, 3000), 2000);
        assert_eq!(evaluate(&p, 4000), 1000);
    }

    #[test]
    fn test_bounce_speed_halves_frequency() {
        let fast = params(PatternMode::Bounce, 100);
        let slow = params(PatternMode::Bounce, 50);
        // The slow pattern reaches the top when the fast one is back down
        assert_eq!(evaluate(&fast, 2000), 1000);
        assert_eq!(evaluate(&slow, 2000), 3000);
    }

    #[test]
    fn test_sine_starts_centered() {
        let p = params(PatternMode::Sine, 50);
        assert_eq!(evaluate(&p, 0), 2000);
        let quarter = evaluate(&p, 1000);
        assert!((quarter - 3000).abs() <= 5);
        let three_quarter = evaluate(&p, 3000);
        assert!((three_quarter - 1000).abs() <= 5);
    }

    #[test]
    fn test_double_bounce_nested() {
        let p = params(PatternMode::DoubleBounce, 50);
        assert_eq!(evaluate(&p, 0), 1000);
        // Peak of the outer cycle lands on a trough of the inner one
        assert_eq!(evaluate(&p, 2000), 1000 + 1600);
        // The inner cycle lifts the first half of each quarter
        assert_eq!(evaluate(&p, 250), 1400);
        assert_eq!(evaluate(&p, 500), 1800);
        assert_eq!(evaluate(&p, 1000), 1800);
    }

    #[test]
    fn test_narrow_band_holds_center() {
        let mut p = params(PatternMode::Sine, 50);
        p.band = Band {
            lower: 1000,
            upper: 1010,
        };
        assert_eq!(evaluate(&p, 123), 1005);
    }

    #[test]
    fn test_zero_speed_holds_center() {
        let p = params(PatternMode::Bounce, 0);
        assert_eq!(evaluate(&p, 0), 2000);
        assert_eq!(evaluate(&p, 777), 2000);
    }

    fn mode_strategy() -> impl Strategy<Value = PatternMode> {
        prop_oneof![
            Just(PatternMode::Sine),
            Just(PatternMode::Bounce),
            Just(PatternMode::DoubleBounce),
        ]
    }

    proptest! {
        #[test]
        fn prop_pure_and_periodic(
            mode in mode_strategy(),
            speed in 1u8..=100,
            lower in 0i32..5000,
            width in 0i32..5000,
            t in 0u32..1_000_000,
        ) {
            let p = PatternParams {
                mode,
                speed_pct: speed,
                band: Band { lower, upper: lower + width },
                base_cps: 20.0,
                deadband_counts: 20,
            };

            let a = evaluate(&p, t);
            prop_assert_eq!(a, evaluate(&p, t));
            prop_assert!(p.band.contains(a));

            if let Some(period) = period_ms(speed, width, 20.0) {
                prop_assert_eq!(a, evaluate(&p, t + period));
            }
        }
    }
}
