//! The eight gate outputs and the DAC, presented to the library as [`Outputs`].

use crate::dac::Max5825;
use defmt::*;
use embassy_stm32::gpio::{Level, Output};
use embedded_hal::i2c::I2c;
use octogate_lib::{NUM_GATES, dispatch::Outputs};

/// The channel outputs of the module.
pub struct Board<I2C> {
    gates: [Output<'static>; NUM_GATES],
    dac: Max5825<I2C>,
}

impl<I2C: I2c> Board<I2C> {
    /// Takes ownership of the gate pins, in channel order, and an initialized DAC.
    pub fn new(gates: [Output<'static>; NUM_GATES], dac: Max5825<I2C>) -> Self {
        Self { gates, dac }
    }
}

impl<I2C: I2c> Outputs for Board<I2C> {
    fn set_gate(&mut self, channel: usize, on: bool) {
        self.gates[channel].set_level(Level::from(on));
    }

    fn write_dac(&mut self, channel: usize, value: u16) {
        if self.dac.write(channel as u8, value).is_err() {
            error!("Failed to write {} to DAC channel {}", value, channel);
        }
    }
}
