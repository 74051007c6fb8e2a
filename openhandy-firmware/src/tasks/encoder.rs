//! Hall encoder task
//!
//! Wakes on any edge of the three hall sensors and advances the shared
//! position counter. This task is the counter's only writer. An edge that
//! lands before the wait is armed shows up as a two-step jump, which the
//! decoder still counts.

use defmt::*;
use embassy_futures::select::select3;
use embassy_rp::gpio::Input;

use openhandy_drivers::sensor::{HallDecoder, HallState};

use crate::channels::POSITION;

/// Decoder anomalies between repeated log lines
const INVALID_WARN_EVERY: u32 = 100;

/// Hall encoder task
#[embassy_executor::task]
pub async fn encoder_task(
    mut ha: Input<'static>,
    mut hb: Input<'static>,
    mut hc: Input<'static>,
    inverted: bool,
) {
    info!("Encoder task started");

    let mut decoder = HallDecoder::new(inverted);
    let mut warned_at = 0u32;
    let mut skipped_at = 0u32;

    loop {
        let state = HallState::new(ha.is_high(), hb.is_high(), hc.is_high());
        let delta = decoder.update(state);
        if delta != 0 {
            POSITION.advance(delta);
        }

        let invalid = decoder.invalid_count();
        if invalid.wrapping_sub(warned_at) >= INVALID_WARN_EVERY {
            warn!("Hall decoder: {} invalid transitions", invalid);
            warned_at = invalid;
        }

        let skipped = decoder.skipped_count();
        if skipped.wrapping_sub(skipped_at) >= INVALID_WARN_EVERY {
            debug!("Hall decoder: {} missed edges recovered", skipped);
            skipped_at = skipped;
        }

        select3(
            ha.wait_for_any_edge(),
            hb.wait_for_any_edge(),
            hc.wait_for_any_edge(),
        )
        .await;
    }
}
