//! Command ingestion
//!
//! Applies decoded network datagrams to the controller and the manual UI
//! state, and paces the discovery burst. Nothing here blocks: the firmware
//! hands over one datagram at a time between control ticks.

use openhandy_protocol::{
    decode_datagram, AxisId, DecodeError, DeviceCommand, DiscoveryBurst, Extension, Inbound,
    MotionRequest, MotionRequestError, TCodeCommand,
};

use crate::motion::{CommandRejected, MotionController};
use crate::pattern::PatternMode;
use crate::ui::ManualUiState;

/// Diagnostic counters for the command port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProtocolStats {
    /// Datagrams handed to [`CommandChannel::ingest`]
    pub received: u32,
    pub applied: u32,
    pub ignored: u32,
    /// Well-formed but refused in the current state
    pub rejected: u32,
    /// Malformed
    pub dropped: u32,
    /// Lost before ingestion because the inbox was full
    pub overflowed: u32,
}

/// Why a well-formed datagram had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IgnoreReason {
    /// Axis other than the stroke axis
    OtherAxis(AxisId),
    /// Identify or limits query
    DeviceQuery(DeviceCommand),
    /// Reset while no fault is latched
    NotFaulted,
}

/// Result of ingesting one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IngestOutcome {
    Applied,
    Ignored(IgnoreReason),
    Rejected(CommandRejected),
    Dropped(DecodeError),
}

/// Network command channel state
#[derive(Debug, Clone, Default)]
pub struct CommandChannel {
    stats: ProtocolStats,
    burst: DiscoveryBurst,
}

impl CommandChannel {
    pub const fn new() -> Self {
        Self {
            stats: ProtocolStats {
                received: 0,
                applied: 0,
                ignored: 0,
                rejected: 0,
                dropped: 0,
                overflowed: 0,
            },
            burst: DiscoveryBurst::new(),
        }
    }

    /// Decode one datagram and apply it
    ///
    /// Malformed payloads are dropped whole and never touch the controller.
    pub fn ingest(
        &mut self,
        payload: &[u8],
        controller: &mut MotionController<'_>,
        ui: &mut ManualUiState,
        now_ms: u32,
    ) -> IngestOutcome {
        self.stats.received = self.stats.received.wrapping_add(1);

        let outcome = match decode_datagram(payload) {
            Ok(Inbound::TCode(commands)) => Self::apply_tcode(&commands, controller, ui),
            Ok(Inbound::Motion(request)) => self.apply_request(request, controller, ui, now_ms),
            Err(err) => IngestOutcome::Dropped(err),
        };

        let counter = match outcome {
            IngestOutcome::Applied => &mut self.stats.applied,
            IngestOutcome::Ignored(_) => &mut self.stats.ignored,
            IngestOutcome::Rejected(_) => &mut self.stats.rejected,
            IngestOutcome::Dropped(_) => &mut self.stats.dropped,
        };
        *counter = counter.wrapping_add(1);
        outcome
    }

    /// Start or restart the discovery burst
    pub fn trigger_discovery(&mut self, now_ms: u32) {
        self.burst.trigger(now_ms);
    }

    /// Returns true when a discovery announcement is due
    pub fn poll_discovery(&mut self, now_ms: u32) -> bool {
        self.burst.poll(now_ms)
    }

    pub fn discovery_active(&self) -> bool {
        self.burst.is_active()
    }

    pub fn stats(&self) -> ProtocolStats {
        self.stats
    }

    /// Count a datagram too large to reach [`Self::ingest`]
    ///
    /// It was received and is dropped as malformed.
    pub fn record_oversized(&mut self) -> IngestOutcome {
        self.stats.received = self.stats.received.wrapping_add(1);
        self.stats.dropped = self.stats.dropped.wrapping_add(1);
        IngestOutcome::Dropped(DecodeError::TooLong)
    }

    /// Count a datagram lost to a full inbox
    pub fn record_overflow(&mut self) {
        self.stats.overflowed = self.stats.overflowed.wrapping_add(1);
    }

    fn apply_tcode(
        commands: &[TCodeCommand],
        controller: &mut MotionController<'_>,
        ui: &mut ManualUiState,
    ) -> IngestOutcome {
        let state = controller.state();
        if state.is_fault() {
            return IngestOutcome::Rejected(CommandRejected::Faulted(state));
        }

        // A refused stroke command rejects the datagram before anything applies
        let has_stroke = commands
            .iter()
            .any(|c| matches!(c, TCodeCommand::Axis(axis) if axis.axis == AxisId::STROKE));
        if has_stroke {
            if let Err(rejected) = controller.accepts_axis_command() {
                return IngestOutcome::Rejected(rejected);
            }
        }

        let mut outcome = None;
        for command in commands {
            let result = match *command {
                TCodeCommand::Axis(axis) if axis.axis == AxisId::STROKE => {
                    let interval = match axis.extension {
                        Some(Extension::Interval(ms)) => Some(ms),
                        Some(Extension::Speed(_)) | None => None,
                    };
                    controller
                        .apply_axis_command(axis.value, interval, ui.crop())
                        .map(|_| IngestOutcome::Applied)
                }
                TCodeCommand::Axis(axis) => Ok(IngestOutcome::Ignored(IgnoreReason::OtherAxis(
                    axis.axis,
                ))),
                TCodeCommand::Device(DeviceCommand::Stop) => {
                    ui.set_motion_on(false);
                    controller.stop_motion().map(|_| IngestOutcome::Applied)
                }
                TCodeCommand::Device(query) => {
                    Ok(IngestOutcome::Ignored(IgnoreReason::DeviceQuery(query)))
                }
            };

            match result {
                Err(rejected) => return IngestOutcome::Rejected(rejected),
                Ok(IngestOutcome::Applied) => outcome = Some(IngestOutcome::Applied),
                Ok(ignored) => {
                    if outcome.is_none() {
                        outcome = Some(ignored);
                    }
                }
            }
        }

        // decode_datagram never yields an empty command list
        outcome.unwrap_or(IngestOutcome::Dropped(DecodeError::Empty))
    }

    fn apply_request(
        &mut self,
        request: MotionRequest,
        controller: &mut MotionController<'_>,
        ui: &mut ManualUiState,
        now_ms: u32,
    ) -> IngestOutcome {
        match request {
            MotionRequest::SetPattern(index) => match PatternMode::from_index(index) {
                Some(mode) => {
                    ui.set_pattern_mode(mode);
                    IngestOutcome::Applied
                }
                None => IngestOutcome::Dropped(DecodeError::Motion(
                    MotionRequestError::InvalidParameter,
                )),
            },
            MotionRequest::SetSpeed(percent) => {
                ui.set_speed_percent(percent);
                IngestOutcome::Applied
            }
            MotionRequest::SpeedStep(delta) => {
                ui.speed_step(delta);
                IngestOutcome::Applied
            }
            MotionRequest::SetCrop { lower, upper } => {
                match ui.set_cropping(lower as f32 / 100.0, upper as f32 / 100.0) {
                    Ok(_) => IngestOutcome::Applied,
                    Err(_) => IngestOutcome::Dropped(DecodeError::Motion(
                        MotionRequestError::InvalidParameter,
                    )),
                }
            }
            MotionRequest::Start => {
                let state = controller.state();
                if state.is_fault() {
                    return IngestOutcome::Rejected(CommandRejected::Faulted(state));
                }
                ui.set_motion_on(true);
                IngestOutcome::Applied
            }
            MotionRequest::Stop => {
                ui.set_motion_on(false);
                // Nothing moves in a fault state, so there is nothing to hold
                let _ = controller.stop_motion();
                IngestOutcome::Applied
            }
            MotionRequest::Rehome => match controller.request_homing() {
                Ok(()) => IngestOutcome::Applied,
                Err(rejected) => IngestOutcome::Rejected(rejected),
            },
            MotionRequest::Reset => match controller.reset() {
                Ok(()) => {
                    ui.set_motion_on(false);
                    IngestOutcome::Applied
                }
                Err(_) => IngestOutcome::Ignored(IgnoreReason::NotFaulted),
            },
            MotionRequest::Discover => {
                self.trigger_discovery(now_ms);
                IngestOutcome::Applied
            }
        }
    }
}
