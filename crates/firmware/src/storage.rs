//! Keeps the mapping table in the last sector of the internal flash.

use embassy_stm32::flash::{Blocking, Error, Flash, WRITE_SIZE};
use octogate_lib::{device::MapStorage, mapping::TABLE_BYTES};

/// Start of the last 256 KiB sector of the F767's 2 MiB single-bank flash, relative to the start of flash.
const SECTOR_OFFSET: u32 = 0x1C_0000;
const SECTOR_SIZE: u32 = 256 * 1024;

/// The table rounded up to a whole number of flash writes.
const RECORD_BYTES: usize = TABLE_BYTES.div_ceil(WRITE_SIZE) * WRITE_SIZE;

/// [`MapStorage`] on the microcontroller's own flash.
///
/// Every save erases the whole sector, so nothing else may live there.
pub struct FlashStorage {
    flash: Flash<'static, Blocking>,
}

impl FlashStorage {
    /// Wraps the flash peripheral.
    pub fn new(flash: Flash<'static, Blocking>) -> Self {
        Self { flash }
    }
}

impl MapStorage for FlashStorage {
    type Error = Error;

    fn read(&mut self, bytes: &mut [u8; TABLE_BYTES]) -> Result<(), Self::Error> {
        self.flash.blocking_read(SECTOR_OFFSET, bytes)
    }

    fn write(&mut self, bytes: &[u8; TABLE_BYTES]) -> Result<(), Self::Error> {
        let mut record = [0xFF; RECORD_BYTES];
        record[..TABLE_BYTES].copy_from_slice(bytes);

        self.flash
            .blocking_erase(SECTOR_OFFSET, SECTOR_OFFSET + SECTOR_SIZE)?;
        self.flash.blocking_write(SECTOR_OFFSET, &record)
    }
}
