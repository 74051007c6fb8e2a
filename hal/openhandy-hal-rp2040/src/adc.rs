//! Blocking ADC input
//!
//! RP2040 has a single 12-bit ADC. Inputs 0-3 sit on GPIO26-29; the
//! thermal sensor of the actuator board is wired to GPIO26.

use embassy_rp::adc::{Adc, Blocking, Channel};
use openhandy_hal::{AdcError, AnalogInput};

/// One ADC channel with exclusive use of the converter
pub struct Rp2040AnalogInput<'d> {
    adc: Adc<'d, Blocking>,
    channel: Channel<'d>,
}

impl<'d> Rp2040AnalogInput<'d> {
    pub fn new(adc: Adc<'d, Blocking>, channel: Channel<'d>) -> Self {
        Self { adc, channel }
    }
}

impl AnalogInput for Rp2040AnalogInput<'_> {
    const MAX_RAW: u16 = 4095;

    fn read_raw(&mut self) -> Result<u16, AdcError> {
        self.adc
            .blocking_read(&mut self.channel)
            .map_err(|_| AdcError::Conversion)
    }
}
