//! Host-side stand-ins for the hardware, shared by the unit tests.

use crate::{
    NUM_GATES,
    device::MapStorage,
    dispatch::{GATES, Gates, Outputs},
    mapping::TABLE_BYTES,
};

/// Remembers the last state written to every gate and DAC channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordingOutputs {
    pub gates: [Option<bool>; NUM_GATES],
    pub dac: [Option<u16>; NUM_GATES],
    pub dac_writes: [usize; NUM_GATES],
    /// The last mask passed to [`Outputs::set_gates`], with its state.
    pub bulk_gates: Option<(Gates, bool)>,
}

impl RecordingOutputs {
    pub fn is_untouched(&self) -> bool {
        self.gates.iter().all(Option::is_none) && self.dac_writes.iter().all(|writes| *writes == 0)
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Outputs for RecordingOutputs {
    fn set_gate(&mut self, channel: usize, on: bool) {
        self.gates[channel] = Some(on);
    }

    fn set_gates(&mut self, gates: Gates, on: bool) {
        self.bulk_gates = Some((gates, on));
        for (channel, gate) in GATES.iter().enumerate() {
            if gates.contains(*gate) {
                self.set_gate(channel, on);
            }
        }
    }

    fn write_dac(&mut self, channel: usize, value: u16) {
        self.dac[channel] = Some(value);
        self.dac_writes[channel] += 1;
    }
}

/// Which [`MemoryStorage`] operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    Read,
    Write,
}

/// Table storage kept in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStorage {
    pub bytes: [u8; TABLE_BYTES],
    pub reads: usize,
    pub writes: usize,
    /// Makes every access fail, like a worn-out flash sector.
    pub failing: bool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        // Erased flash.
        Self {
            bytes: [0xFF; TABLE_BYTES],
            reads: 0,
            writes: 0,
            failing: false,
        }
    }
}

impl MapStorage for MemoryStorage {
    type Error = StorageError;

    fn read(&mut self, bytes: &mut [u8; TABLE_BYTES]) -> Result<(), Self::Error> {
        if self.failing {
            return Err(StorageError::Read);
        }
        self.reads += 1;
        *bytes = self.bytes;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8; TABLE_BYTES]) -> Result<(), Self::Error> {
        if self.failing {
            return Err(StorageError::Write);
        }
        self.writes += 1;
        self.bytes = *bytes;
        Ok(())
    }
}
