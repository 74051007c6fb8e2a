//! Control task
//!
//! Owns the motion controller and runs it on a fixed 5 ms tick. Each tick:
//!
//! 1. Drain up to [`INBOX_DRAIN_PER_TICK`] datagrams into the command channel
//! 2. Apply pending button actions
//! 3. Step the controller (safety, homing, position loop, patterns)
//! 4. Queue due discovery announcements
//!
//! Nothing in the tick awaits, so command handling can never stall the
//! position loop.

use defmt::*;
use embassy_rp::gpio::{Input, Output};
use embassy_rp::pwm::Pwm;
use embassy_time::{Duration, Instant, Ticker};

use openhandy_core::command::{CommandChannel, IngestOutcome};
use openhandy_core::config::Tunables;
use openhandy_core::motion::{MotionController, TickReport};
use openhandy_core::status::LedMode;
use openhandy_core::ui::ManualUiState;
use openhandy_drivers::board::ActuatorBoard;
use openhandy_hal_rp2040::Rp2040AnalogInput;

use crate::channels::{
    take_inbox_overflow, take_inbox_truncated, BUTTON_CHANNEL, DISCOVERY_OUT, DISCOVERY_REQUEST, INBOX, STATUS,
};

/// Control period
pub const CONTROL_TICK_MS: u64 = 5;

/// Datagrams taken from the inbox per tick
const INBOX_DRAIN_PER_TICK: usize = 4;

/// Protocol counters are logged this often
const STATS_INTERVAL_MS: u32 = 10_000;

/// The actuator board as wired on the Pico W carrier
pub type Board = ActuatorBoard<
    'static,
    Pwm<'static>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
    Input<'static>,
    Input<'static>,
    Rp2040AnalogInput<'static>,
>;

/// Control task - fixed-rate motion control
#[embassy_executor::task]
pub async fn control_task(tunables: &'static Tunables, mut board: Board) {
    info!("Control task started");

    let mut controller = MotionController::new(tunables);
    let mut ui = ManualUiState::new();
    let mut commands = CommandChannel::new();
    let mut led = LedMode::Booting;
    let mut last_stats_ms = 0u32;

    match controller.request_homing() {
        Ok(()) => info!("Boot homing started"),
        Err(e) => error!("Boot homing refused: {:?}", e),
    }

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_TICK_MS));
    let start = Instant::now();

    loop {
        ticker.next().await;
        let now_ms = start.elapsed().as_millis() as u32;

        for _ in 0..take_inbox_overflow() {
            commands.record_overflow();
            warn!("Inbox full, datagram dropped");
        }
        for _ in 0..take_inbox_truncated() {
            log_outcome(commands.record_oversized());
        }

        for _ in 0..INBOX_DRAIN_PER_TICK {
            let Ok(datagram) = INBOX.try_receive() else {
                break;
            };
            let outcome = commands.ingest(&datagram, &mut controller, &mut ui, now_ms);
            log_outcome(outcome);
        }

        while let Ok(action) = BUTTON_CHANNEL.try_receive() {
            match action.apply(&mut controller, &mut ui, &mut commands, now_ms) {
                Ok(()) => debug!("Button {:?} applied", action),
                Err(e) => warn!("Button {:?} rejected: {:?}", action, e),
            }
        }

        if DISCOVERY_REQUEST.try_take().is_some() {
            commands.trigger_discovery(now_ms);
        }

        let report = controller.tick(&mut board, &ui, now_ms);
        log_report(&controller, &report);

        if commands.poll_discovery(now_ms) {
            info!("Discovery announcement due");
            if DISCOVERY_OUT.try_send(()).is_err() {
                debug!("Discovery outbox full");
            }
        }

        let mode = LedMode::for_state(controller.state(), commands.discovery_active());
        if mode != led {
            debug!("LED mode {:?}", mode);
            led = mode;
        }

        if now_ms.wrapping_sub(last_stats_ms) >= STATS_INTERVAL_MS {
            last_stats_ms = now_ms;
            debug!(
                "Protocol: {:?}, sensor read errors: {}",
                commands.stats(),
                board.read_errors()
            );
        }

        STATUS.signal(controller.snapshot());
    }
}

fn log_outcome(outcome: IngestOutcome) {
    match outcome {
        IngestOutcome::Applied => trace!("Datagram applied"),
        IngestOutcome::Ignored(reason) => debug!("Datagram ignored: {:?}", reason),
        IngestOutcome::Rejected(e) => warn!("Datagram rejected: {:?}", e),
        IngestOutcome::Dropped(e) => warn!("Datagram dropped: {:?}", e),
    }
}

fn log_report(controller: &MotionController<'_>, report: &TickReport) {
    for t in report.transitions.iter() {
        if t.to.is_fault() {
            error!(
                "Fault {:?} -> {:?} ({:?}): {:?}",
                t.from,
                t.to,
                t.event,
                controller.snapshot()
            );
        } else {
            info!("State {:?} -> {:?} ({:?})", t.from, t.to, t.event);
        }
    }

    if let Some(result) = report.homed {
        info!(
            "Homed: span {} counts, offset {}",
            result.span, result.home_offset
        );
    }
}
