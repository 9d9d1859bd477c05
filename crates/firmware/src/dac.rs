//! Driver for the MAX5825, an eight-channel 12-bit DAC on the I²C bus.

use embedded_hal::i2c::I2c;

/// 7-bit bus address with both address pins tied low.
const ADDRESS: u8 = 0x10;

/// Selects the internal voltage reference.
const REF: u8 = 0x20;
/// Internal reference at 2.5 V, kept powered.
const REF_INTERNAL_2V5: u8 = 0b101;
/// Writes and loads one channel's code.
const CODE_LOAD: u8 = 0xB0;
/// Writes every channel's code and loads them all.
const CODE_LOAD_ALL: u8 = 0xA0;

/// A MAX5825 behind any blocking `embedded-hal` I²C bus.
pub struct Max5825<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Max5825<I2C> {
    /// Takes ownership of the bus. The chip is not touched until [`init`](Self::init).
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Selects the internal reference and drives every channel to zero.
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        self.i2c.write(ADDRESS, &[REF | REF_INTERNAL_2V5, 0, 0])?;
        self.i2c.write(ADDRESS, &[CODE_LOAD_ALL, 0, 0])
    }

    /// Outputs `value` on `channel`. The chip keeps only the top 12 bits.
    pub fn write(&mut self, channel: u8, value: u16) -> Result<(), I2C::Error> {
        let [high, low] = value.to_be_bytes();
        self.i2c
            .write(ADDRESS, &[CODE_LOAD | (channel & 0x0F), high, low & 0xF0])
    }
}
