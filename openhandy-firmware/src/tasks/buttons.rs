//! Front panel button tasks
//!
//! One task instance per button. Buttons pull to ground when pressed.
//! A press is reported when released, or as soon as it becomes a long
//! press.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{with_timeout, Duration, Instant, Timer};

use openhandy_core::ui::{Button, ButtonAction, LONG_PRESS_MS};

use crate::channels::BUTTON_CHANNEL;

/// Contact bounce settle time
const DEBOUNCE_MS: u64 = 20;

/// Presses shorter than this are treated as noise
const MIN_PRESS_MS: u64 = 50;

/// Button task - debounce and classify presses
#[embassy_executor::task(pool_size = 6)]
pub async fn button_task(mut pin: Input<'static>, button: Button) {
    info!("Button task started: {:?}", button);

    loop {
        pin.wait_for_falling_edge().await;
        let press_start = Instant::now();

        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
        if !pin.is_low() {
            continue;
        }

        let released = with_timeout(
            Duration::from_millis(LONG_PRESS_MS as u64),
            pin.wait_for_rising_edge(),
        )
        .await;

        let held_ms = match released {
            Ok(()) => {
                let held = press_start.elapsed().as_millis();
                if held < MIN_PRESS_MS {
                    continue;
                }
                held as u32
            }
            Err(_) => LONG_PRESS_MS,
        };

        let action = ButtonAction::from_press(button, held_ms);
        debug!("Button {:?} held {} ms: {:?}", button, held_ms, action);
        if BUTTON_CHANNEL.try_send(action).is_err() {
            warn!("Button channel full, {:?} dropped", action);
        }

        if released.is_err() {
            pin.wait_for_high().await;
        }
        Timer::after(Duration::from_millis(MIN_PRESS_MS)).await;
    }
}
