//! Inbound datagram classification
//!
//! A single UDP datagram carries either one motion request or one or more
//! lines of TCode. Any malformed content drops the whole datagram.

use heapless::Vec;

use crate::motion::{MotionRequest, MotionRequestError, MOTION_PATH_PREFIX};
use crate::tcode::{self, TCodeCommand, TCodeError};

/// Largest datagram the decoder accepts
pub const MAX_DATAGRAM_LEN: usize = 256;

/// Maximum number of TCode commands taken from one datagram
pub const MAX_COMMANDS_PER_DATAGRAM: usize = 16;

/// Errors that can occur while decoding a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Datagram has no printable content
    Empty,
    /// Datagram exceeds [`MAX_DATAGRAM_LEN`]
    TooLong,
    /// Datagram is not valid UTF-8
    NotUtf8,
    /// TCode content failed to parse
    TCode(TCodeError),
    /// Motion request failed to parse
    Motion(MotionRequestError),
}

impl From<TCodeError> for DecodeError {
    fn from(e: TCodeError) -> Self {
        DecodeError::TCode(e)
    }
}

impl From<MotionRequestError> for DecodeError {
    fn from(e: MotionRequestError) -> Self {
        DecodeError::Motion(e)
    }
}

/// Decoded datagram content
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Inbound {
    TCode(Vec<TCodeCommand, MAX_COMMANDS_PER_DATAGRAM>),
    Motion(MotionRequest),
}

/// Decode a raw datagram payload
pub fn decode_datagram(payload: &[u8]) -> Result<Inbound, DecodeError> {
    if payload.len() > MAX_DATAGRAM_LEN {
        return Err(DecodeError::TooLong);
    }

    let text = core::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }

    if text.starts_with(MOTION_PATH_PREFIX) || text.contains("action=") {
        return Ok(Inbound::Motion(MotionRequest::parse(text)?));
    }

    let mut commands = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        for command in tcode::parse_line(line)? {
            commands
                .push(command)
                .map_err(|_| DecodeError::TCode(TCodeError::TooManyCommands))?;
        }
    }

    Ok(Inbound::TCode(commands))
}
