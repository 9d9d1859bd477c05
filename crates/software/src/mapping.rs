//! The mapping table: one entry per channel describing which MIDI messages drive that channel's gate and DAC.
//!
//! Entries are stored exactly as they are persisted, seven raw bytes each, so that whatever comes back from storage
//! (including garbage) round-trips unchanged. Interpretation happens through [`MappingEntry::mapping`], which
//! yields a [`Mapping`] carrying only the fields the entry's behavior actually uses.

use crate::{NUM_GATES, configuration::CycleConfig};
use core::ops::{Index, IndexMut};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

pub mod preset;

/// Size of one persisted entry.
pub const ENTRY_BYTES: usize = 7;

/// Size of the persisted table.
pub const TABLE_BYTES: usize = ENTRY_BYTES * NUM_GATES;

/// Bit 4 of a status byte. Gate triggers ignore it, which equates note-on with note-off and pairs up adjacent
/// MIDI channels.
const GATE_STATUS_MASK: u8 = 0xEF;

/// The behaviors a channel can be assigned. The discriminants are the values persisted in the first byte of
/// each entry.
#[derive(Debug, Clone, Copy, ToPrimitive, FromPrimitive, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MapType {
    /// A note opens the gate and its velocity is written to the DAC.
    Velocity = 0,
    /// A note opens the gate; a controller writes its value to the DAC.
    ControlChange = 1,
    /// Any note on a channel opens the gate and its pitch is written to the DAC.
    Pitch = 2,
    /// A note opens the gate and outputs a pitch captured earlier from a second MIDI channel.
    PitchSampleAndHold = 3,
    /// A note opens the gate; a "step" note advances a random sequence straight to the DAC and a "reset" note
    /// rewinds it.
    RandomSequence = 4,
    /// Like [`MapType::RandomSequence`], except the DAC only takes the current step when the gate opens.
    RandomSequenceSampleAndHold = 5,
}
impl CycleConfig for MapType {}

impl MapType {
    /// Returns `true` for the two random sequence behaviors, whose channels own an LFSR register and a seed.
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            Self::RandomSequence | Self::RandomSequenceSampleAndHold
        )
    }
}

/// A MIDI status/first-data-byte pair that a channel listens for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Trigger {
    /// Expected status byte.
    pub command: u8,
    /// Expected first data byte, typically a note or controller number.
    pub value: u8,
}

impl Trigger {
    /// Constructs a [`Trigger`].
    pub const fn new(command: u8, value: u8) -> Self {
        Self { command, value }
    }

    /// Exact match on both status and first data byte.
    pub fn matches(&self, status: u8, data1: u8) -> bool {
        status == self.command && data1 == self.value
    }

    /// Gate match: status compared with bit 4 cleared on both sides, first data byte compared exactly.
    pub fn matches_gate(&self, status: u8, data1: u8) -> bool {
        gate_status_matches(status, self.command) && data1 == self.value
    }
}

/// Compares two status bytes the way gate triggers do, ignoring bit 4 of both.
pub fn gate_status_matches(status: u8, command: u8) -> bool {
    status & GATE_STATUS_MASK == command & GATE_STATUS_MASK
}

/// One channel's configuration, laid out as it is persisted.
///
/// `map_type` is kept as a raw byte: values outside [`MapType`] are legal here and simply leave the channel inert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingEntry {
    /// Raw [`MapType`] discriminant.
    pub map_type: u8,
    /// Status byte that drives the gate.
    pub gate_command: u8,
    /// First data byte that drives the gate, when the behavior requires an exact note.
    pub gate_value: u8,
    /// Status byte of the secondary trigger (controller, pitch source or sequence step).
    pub cv_command_1: u8,
    /// First data byte of the secondary trigger.
    pub cv_value_1: u8,
    /// Status byte of the sequence reset trigger.
    pub cv_command_2: u8,
    /// First data byte of the sequence reset trigger.
    pub cv_value_2: u8,
}

impl MappingEntry {
    /// Constructs a [`MappingEntry`] from its seven fields in storage order.
    pub const fn new(
        map_type: MapType,
        gate: Trigger,
        cv_1: Trigger,
        cv_2: Trigger,
    ) -> Self {
        Self {
            map_type: map_type as u8,
            gate_command: gate.command,
            gate_value: gate.value,
            cv_command_1: cv_1.command,
            cv_value_1: cv_1.value,
            cv_command_2: cv_2.command,
            cv_value_2: cv_2.value,
        }
    }

    /// Returns the entry's [`MapType`], or `None` for a byte outside the known behaviors.
    pub fn map_type(&self) -> Option<MapType> {
        MapType::from_u8(self.map_type)
    }

    /// Interprets the entry, or returns `None` if its type byte is unknown.
    pub fn mapping(&self) -> Option<Mapping> {
        let gate = Trigger::new(self.gate_command, self.gate_value);
        let cv_1 = Trigger::new(self.cv_command_1, self.cv_value_1);
        let cv_2 = Trigger::new(self.cv_command_2, self.cv_value_2);

        Some(match self.map_type()? {
            MapType::Velocity => Mapping::Velocity { gate },
            MapType::ControlChange => Mapping::ControlChange {
                gate,
                controller: cv_1,
            },
            MapType::Pitch => Mapping::Pitch {
                gate_command: self.gate_command,
            },
            MapType::PitchSampleAndHold => Mapping::PitchSampleAndHold {
                gate,
                pitch_command: self.cv_command_1,
            },
            MapType::RandomSequence => Mapping::RandomSequence {
                gate,
                step: cv_1,
                reset: cv_2,
                sample_and_hold: false,
            },
            MapType::RandomSequenceSampleAndHold => Mapping::RandomSequence {
                gate,
                step: cv_1,
                reset: cv_2,
                sample_and_hold: true,
            },
        })
    }

    /// Serializes the entry in storage order.
    pub fn to_bytes(&self) -> [u8; ENTRY_BYTES] {
        [
            self.map_type,
            self.gate_command,
            self.gate_value,
            self.cv_command_1,
            self.cv_value_1,
            self.cv_command_2,
            self.cv_value_2,
        ]
    }

    /// Deserializes an entry. No validation is performed.
    pub fn from_bytes(bytes: [u8; ENTRY_BYTES]) -> Self {
        let [
            map_type,
            gate_command,
            gate_value,
            cv_command_1,
            cv_value_1,
            cv_command_2,
            cv_value_2,
        ] = bytes;
        Self {
            map_type,
            gate_command,
            gate_value,
            cv_command_1,
            cv_value_1,
            cv_command_2,
            cv_value_2,
        }
    }
}

/// The interpretation of a [`MappingEntry`], carrying only the fields its behavior reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mapping {
    /// See [`MapType::Velocity`].
    Velocity {
        /// Note that opens the gate.
        gate: Trigger,
    },
    /// See [`MapType::ControlChange`].
    ControlChange {
        /// Note that opens the gate.
        gate: Trigger,
        /// Controller whose value is written to the DAC; matched exactly, status included.
        controller: Trigger,
    },
    /// See [`MapType::Pitch`].
    Pitch {
        /// Status byte whose notes open the gate and set the pitch.
        gate_command: u8,
    },
    /// See [`MapType::PitchSampleAndHold`].
    PitchSampleAndHold {
        /// Note that opens the gate.
        gate: Trigger,
        /// Status byte whose notes set the held pitch.
        pitch_command: u8,
    },
    /// See [`MapType::RandomSequence`] and [`MapType::RandomSequenceSampleAndHold`].
    RandomSequence {
        /// Note that opens the gate.
        gate: Trigger,
        /// Note that advances the sequence.
        step: Trigger,
        /// Note that rewinds the sequence to the channel's seed.
        reset: Trigger,
        /// Whether the DAC is only updated when the gate opens.
        sample_and_hold: bool,
    },
}

/// The per-channel mapping table. Always exactly [`NUM_GATES`] entries, indexed by channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingTable {
    entries: [MappingEntry; NUM_GATES],
}

impl MappingTable {
    /// Constructs a table from its entries in channel order.
    pub const fn new(entries: [MappingEntry; NUM_GATES]) -> Self {
        Self { entries }
    }

    /// Returns an [`Iterator`] over the entries in channel order.
    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    /// Replaces every entry with the given table's, e.g. a [`preset`].
    pub fn copy_from(&mut self, other: &MappingTable) {
        self.entries = other.entries;
    }

    /// Serializes the table as consecutive 7-byte records.
    pub fn to_bytes(&self) -> [u8; TABLE_BYTES] {
        let mut bytes = [0; TABLE_BYTES];
        for (chunk, entry) in bytes.chunks_exact_mut(ENTRY_BYTES).zip(self.entries.iter()) {
            chunk.copy_from_slice(&entry.to_bytes());
        }
        bytes
    }

    /// Deserializes a table. Any byte pattern is accepted.
    pub fn from_bytes(bytes: &[u8; TABLE_BYTES]) -> Self {
        let mut entries = [MappingEntry::default(); NUM_GATES];
        for (entry, chunk) in entries.iter_mut().zip(bytes.chunks_exact(ENTRY_BYTES)) {
            let mut record = [0; ENTRY_BYTES];
            record.copy_from_slice(chunk);
            *entry = MappingEntry::from_bytes(record);
        }
        Self { entries }
    }
}

impl Index<usize> for MappingTable {
    type Output = MappingEntry;

    fn index(&self, channel: usize) -> &Self::Output {
        &self.entries[channel]
    }
}

impl IndexMut<usize> for MappingTable {
    fn index_mut(&mut self, channel: usize) -> &mut Self::Output {
        &mut self.entries[channel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_velocity_with_zero_triggers() {
        let table = MappingTable::default();
        assert!(table.iter().all(|entry| {
            entry.map_type() == Some(MapType::Velocity) && entry.to_bytes() == [0; ENTRY_BYTES]
        }));
    }

    #[test]
    fn bytes_round_trip_every_field() {
        let mut bytes = [0_u8; TABLE_BYTES];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(37).wrapping_add(5);
        }
        let table = MappingTable::from_bytes(&bytes);
        assert_eq!(bytes, table.to_bytes(), "Expected left but got right");
    }

    #[test]
    fn entries_are_stored_in_field_order() {
        let entry = MappingEntry::new(
            MapType::RandomSequence,
            Trigger::new(0x97, 36),
            Trigger::new(0x97, 44),
            Trigger::new(0x97, 45),
        );
        assert_eq!([4, 0x97, 36, 0x97, 44, 0x97, 45], entry.to_bytes());

        let mut table = MappingTable::default();
        table[2] = entry;
        assert_eq!(
            [4, 0x97, 36, 0x97, 44, 0x97, 45],
            table.to_bytes()[2 * ENTRY_BYTES..3 * ENTRY_BYTES]
        );
    }

    #[test]
    fn unknown_type_is_kept_but_not_interpreted() {
        let entry = MappingEntry::from_bytes([0xFF; ENTRY_BYTES]);
        assert_eq!(None, entry.map_type());
        assert_eq!(None, entry.mapping());
        assert_eq!([0xFF; ENTRY_BYTES], entry.to_bytes());
    }

    #[test]
    fn sample_and_hold_sequence_is_flagged() {
        let entry = MappingEntry::new(
            MapType::RandomSequenceSampleAndHold,
            Trigger::new(0x97, 36),
            Trigger::new(0x97, 44),
            Trigger::new(0x97, 45),
        );
        assert_eq!(
            Some(Mapping::RandomSequence {
                gate: Trigger::new(0x97, 36),
                step: Trigger::new(0x97, 44),
                reset: Trigger::new(0x97, 45),
                sample_and_hold: true,
            }),
            entry.mapping(),
            "Expected left but got right"
        );
    }

    mod triggers {
        use super::*;

        #[test]
        fn gate_match_ignores_bit_four() {
            let trigger = Trigger::new(0x90, 36);
            assert!(trigger.matches_gate(0x90, 36));
            assert!(trigger.matches_gate(0x80, 36), "note-off should close the gate");
            assert!(!trigger.matches_gate(0x91, 36));
            assert!(!trigger.matches_gate(0x90, 37));
        }

        #[test]
        fn gate_match_masks_the_stored_command_too() {
            let trigger = Trigger::new(0x80, 36);
            assert!(trigger.matches_gate(0x90, 36));
        }

        #[test]
        fn exact_match_respects_every_bit() {
            let trigger = Trigger::new(0xB0, 69);
            assert!(trigger.matches(0xB0, 69));
            assert!(!trigger.matches(0xA0, 69));
            assert!(!trigger.matches(0xB0, 70));
        }
    }
}
