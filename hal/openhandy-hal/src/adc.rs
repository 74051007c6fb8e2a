//! Analog input abstraction

/// Errors from an analog conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// Conversion did not complete or reported an error
    Conversion,
}

/// One analog channel
///
/// Reads are blocking and short enough to run inside a control tick.
pub trait AnalogInput {
    /// Full-scale raw value
    const MAX_RAW: u16;

    /// Read the raw conversion result
    fn read_raw(&mut self) -> Result<u16, AdcError>;
}
