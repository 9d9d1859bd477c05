//! Bulk transfer of the whole mapping table as a single SysEx frame.
//!
//! The frame is `0xF0`, then every byte of the persisted table split into two 7-bit-safe bytes (the low seven
//! bits, then bit 7), then `0xF7`. There is no manufacturer ID and no checksum.

use crate::mapping::{MappingTable, TABLE_BYTES};

/// Length of a complete bulk frame, markers included.
pub const FRAME_BYTES: usize = TABLE_BYTES * 2 + 2;

const START: u8 = 0xF0;
const END: u8 = 0xF7;

/// Reasons a bulk frame is rejected. The table is never partially applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BulkError {
    /// The frame is not exactly [`FRAME_BYTES`] long.
    Length,
    /// The first byte is not `0xF0`.
    StartMarker,
    /// The last byte is not `0xF7`.
    EndMarker,
}

/// Decodes a bulk frame into a table.
pub fn decode(frame: &[u8]) -> Result<MappingTable, BulkError> {
    if frame.len() != FRAME_BYTES {
        return Err(BulkError::Length);
    }
    if frame[0] != START {
        return Err(BulkError::StartMarker);
    }
    if frame[FRAME_BYTES - 1] != END {
        return Err(BulkError::EndMarker);
    }

    let mut bytes = [0; TABLE_BYTES];
    for (byte, pair) in bytes
        .iter_mut()
        .zip(frame[1..FRAME_BYTES - 1].chunks_exact(2))
    {
        *byte = pair[0] | (pair[1] << 7);
    }
    Ok(MappingTable::from_bytes(&bytes))
}

/// Encodes a table as a bulk frame.
pub fn encode(table: &MappingTable) -> [u8; FRAME_BYTES] {
    let mut frame = [0; FRAME_BYTES];
    frame[0] = START;
    frame[FRAME_BYTES - 1] = END;
    for (pair, byte) in frame[1..FRAME_BYTES - 1]
        .chunks_exact_mut(2)
        .zip(table.to_bytes())
    {
        pair[0] = byte & 0x7F;
        pair[1] = byte >> 7;
    }
    frame
}
