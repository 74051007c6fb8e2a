//! TCode command parsing
//!
//! Command format (one or more per line, separated by whitespace):
//! - Axis: `<type><channel><digits>[I<ms>|S<speed>]`, e.g. `L05000I250`
//! - Device: `D0`, `D1`, `D2`, `DSTOP`
//!
//! Axis digits are read as a decimal fraction: `L05` is 0.5, `L0999` is
//! 0.999. The number of digits only sets the precision.

use heapless::Vec;

/// Maximum number of commands accepted on a single line
pub const MAX_COMMANDS_PER_LINE: usize = 8;

/// Maximum number of magnitude or extension digits
pub const MAX_DIGITS: usize = 9;

/// Errors that can occur while parsing a TCode line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TCodeError {
    /// Line contains no commands
    Empty,
    /// First character is not a known command type
    UnknownCommand,
    /// Axis command without a channel digit
    MissingChannel,
    /// Axis command without magnitude digits
    MissingValue,
    /// More digits than the parser accepts
    TooManyDigits,
    /// Trailing characters that are not a valid `I`/`S` extension
    InvalidExtension,
    /// More commands than fit in one line buffer
    TooManyCommands,
}

/// Axis family, named after the first character of the command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisKind {
    /// `L` - linear
    Linear,
    /// `R` - rotation
    Rotate,
    /// `V` - vibration
    Vibrate,
    /// `A` - auxiliary
    Auxiliary,
}

/// Axis identifier (family + channel digit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisId {
    pub kind: AxisKind,
    pub channel: u8,
}

impl AxisId {
    /// The stroke axis driven by this actuator (`L0`)
    pub const STROKE: AxisId = AxisId {
        kind: AxisKind::Linear,
        channel: 0,
    };
}

/// Optional move modifier following the magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Extension {
    /// Reach the target over this many milliseconds
    Interval(u32),
    /// Move at this speed (units per 100 ms)
    Speed(u32),
}

/// A decoded axis command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisCommand {
    pub axis: AxisId,
    /// Normalized target in `[0, 1]`
    pub value: f32,
    pub extension: Option<Extension>,
}

/// Device-level commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceCommand {
    /// `D0` - identify device and firmware
    Identify,
    /// `D1` - report protocol version
    ProtocolVersion,
    /// `D2` - list available axes
    ListAxes,
    /// `DSTOP` - stop all motion
    Stop,
}

/// A single decoded TCode command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TCodeCommand {
    Axis(AxisCommand),
    Device(DeviceCommand),
}

/// Parse a whole line into its commands
///
/// A line containing any malformed command is rejected as a whole.
pub fn parse_line(line: &str) -> Result<Vec<TCodeCommand, MAX_COMMANDS_PER_LINE>, TCodeError> {
    let mut commands = Vec::new();

    for token in line.split_ascii_whitespace() {
        let command = parse_command(token)?;
        commands
            .push(command)
            .map_err(|_| TCodeError::TooManyCommands)?;
    }

    if commands.is_empty() {
        return Err(TCodeError::Empty);
    }

    Ok(commands)
}

/// Parse a single whitespace-free command token
pub fn parse_command(token: &str) -> Result<TCodeCommand, TCodeError> {
    let bytes = token.as_bytes();
    let Some(&first) = bytes.first() else {
        return Err(TCodeError::Empty);
    };

    let kind = match first.to_ascii_uppercase() {
        b'D' => return parse_device(&bytes[1..]).map(TCodeCommand::Device),
        b'L' => AxisKind::Linear,
        b'R' => AxisKind::Rotate,
        b'V' => AxisKind::Vibrate,
        b'A' => AxisKind::Auxiliary,
        _ => return Err(TCodeError::UnknownCommand),
    };

    let channel = match bytes.get(1) {
        Some(c) if c.is_ascii_digit() => c - b'0',
        _ => return Err(TCodeError::MissingChannel),
    };

    let rest = &bytes[2..];
    let (digits, tail) = split_digits(rest);
    if digits.is_empty() {
        return Err(TCodeError::MissingValue);
    }
    let value = fraction_from_digits(digits)?;
    let extension = parse_extension(tail)?;

    Ok(TCodeCommand::Axis(AxisCommand {
        axis: AxisId { kind, channel },
        value,
        extension,
    }))
}

fn parse_device(rest: &[u8]) -> Result<DeviceCommand, TCodeError> {
    if rest.eq_ignore_ascii_case(b"STOP") {
        return Ok(DeviceCommand::Stop);
    }
    match rest {
        b"0" => Ok(DeviceCommand::Identify),
        b"1" => Ok(DeviceCommand::ProtocolVersion),
        b"2" => Ok(DeviceCommand::ListAxes),
        _ => Err(TCodeError::UnknownCommand),
    }
}

fn parse_extension(tail: &[u8]) -> Result<Option<Extension>, TCodeError> {
    let Some(&marker) = tail.first() else {
        return Ok(None);
    };

    let (digits, trailing) = split_digits(&tail[1..]);
    if digits.is_empty() || !trailing.is_empty() {
        return Err(TCodeError::InvalidExtension);
    }
    let value = integer_from_digits(digits)?;

    match marker.to_ascii_uppercase() {
        b'I' => Ok(Some(Extension::Interval(value))),
        b'S' => Ok(Some(Extension::Speed(value))),
        _ => Err(TCodeError::InvalidExtension),
    }
}

/// Split a byte slice at the first non-digit
fn split_digits(bytes: &[u8]) -> (&[u8], &[u8]) {
    let end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    bytes.split_at(end)
}

fn integer_from_digits(digits: &[u8]) -> Result<u32, TCodeError> {
    if digits.len() > MAX_DIGITS {
        return Err(TCodeError::TooManyDigits);
    }
    // At most 9 digits, so this cannot overflow a u32
    Ok(digits
        .iter()
        .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0')))
}

fn fraction_from_digits(digits: &[u8]) -> Result<f32, TCodeError> {
    let numerator = integer_from_digits(digits)?;
    let denominator = 10u32.pow(digits.len() as u32);
    Ok(numerator as f32 / denominator as f32)
}
