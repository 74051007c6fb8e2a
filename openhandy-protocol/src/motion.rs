//! Motion admin requests
//!
//! Query-string style requests, either bare or with the HTTP path prefix:
//!
//! ```text
//! action=setpattern&mode=1
//! /api/motion?action=setspeed&sp=40
//! action=setcrop&lo=10&hi=90
//! ```

/// Path prefix accepted in front of the query string
pub const MOTION_PATH_PREFIX: &str = "/api/motion?";

/// Highest valid pattern mode index (sine, bounce, double bounce)
pub const MAX_PATTERN_MODE: u8 = 2;

/// Errors that can occur while parsing a motion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionRequestError {
    /// No `action=` parameter
    MissingAction,
    /// `action=` names an unknown verb
    UnknownAction,
    /// A parameter required by the action is absent
    MissingParameter,
    /// A parameter is not a number or is out of range
    InvalidParameter,
}

/// A decoded motion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionRequest {
    /// Select pattern mode `0..=2`
    SetPattern(u8),
    /// Set speed percent `0..=100`
    SetSpeed(u8),
    /// Nudge speed percent by a signed step
    SpeedStep(i8),
    /// Set stroke crop, percent of span, `lower < upper`
    SetCrop { lower: u8, upper: u8 },
    /// Turn motion on
    Start,
    /// Turn motion off
    Stop,
    /// Re-run homing
    Rehome,
    /// Clear a latched error
    Reset,
    /// Start a discovery burst
    Discover,
}

impl MotionRequest {
    /// Parse a request string
    pub fn parse(input: &str) -> Result<Self, MotionRequestError> {
        let input = input.trim();
        let query = input.strip_prefix(MOTION_PATH_PREFIX).unwrap_or(input);

        let action = param(query, "action").ok_or(MotionRequestError::MissingAction)?;

        match action {
            "setpattern" => {
                let mode = number::<u8>(query, "mode")?;
                if mode > MAX_PATTERN_MODE {
                    return Err(MotionRequestError::InvalidParameter);
                }
                Ok(MotionRequest::SetPattern(mode))
            }
            "setspeed" => {
                let sp = number::<u8>(query, "sp")?;
                if sp > 100 {
                    return Err(MotionRequestError::InvalidParameter);
                }
                Ok(MotionRequest::SetSpeed(sp))
            }
            "speedstep" => Ok(MotionRequest::SpeedStep(number::<i8>(query, "delta")?)),
            "setcrop" => {
                let lower = number::<u8>(query, "lo")?;
                let upper = number::<u8>(query, "hi")?;
                if upper > 100 || lower >= upper {
                    return Err(MotionRequestError::InvalidParameter);
                }
                Ok(MotionRequest::SetCrop { lower, upper })
            }
            "start" => Ok(MotionRequest::Start),
            "stop" => Ok(MotionRequest::Stop),
            "rehome" => Ok(MotionRequest::Rehome),
            "reset" => Ok(MotionRequest::Reset),
            "discover" => Ok(MotionRequest::Discover),
            _ => Err(MotionRequestError::UnknownAction),
        }
    }
}

/// Find the value of `key` in an `a=b&c=d` query
fn param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k.trim() == key).then(|| v.trim())
    })
}

fn number<T: core::str::FromStr>(query: &str, key: &str) -> Result<T, MotionRequestError> {
    param(query, key)
        .ok_or(MotionRequestError::MissingParameter)?
        .parse()
        .map_err(|_| MotionRequestError::InvalidParameter)
}
