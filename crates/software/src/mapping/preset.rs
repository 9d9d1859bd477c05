//! Built-in, read-only mapping tables.

use super::{MapType, MappingEntry, MappingTable, Trigger};

const NOTE_ON_CH1: u8 = 0x90;
const NOTE_ON_CH2: u8 = 0x91;
const NOTE_ON_CH8: u8 = 0x97;
const CONTROL_CHANGE_CH1: u8 = 0xB0;

const NONE: Trigger = Trigger::new(0, 0);

const fn velocity(command: u8, note: u8) -> MappingEntry {
    MappingEntry::new(MapType::Velocity, Trigger::new(command, note), NONE, NONE)
}

const fn velocity_with_controller(note: u8, controller: u8) -> MappingEntry {
    MappingEntry::new(
        MapType::Velocity,
        Trigger::new(NOTE_ON_CH1, note),
        Trigger::new(CONTROL_CHANGE_CH1, controller),
        NONE,
    )
}

const fn sequence(map_type: MapType, gate: u8, step: u8) -> MappingEntry {
    MappingEntry::new(
        map_type,
        Trigger::new(NOTE_ON_CH8, gate),
        Trigger::new(NOTE_ON_CH8, step),
        Trigger::new(NOTE_ON_CH8, step + 1),
    )
}

const fn pitch(command: u8) -> MappingEntry {
    MappingEntry::new(MapType::Pitch, Trigger::new(command, 0), NONE, NONE)
}

/// Eight velocity gates on consecutive notes 24 through 31 of MIDI channel 1, the classic drum-trigger layout.
pub const VELOCITY: MappingTable = MappingTable::new([
    velocity(NOTE_ON_CH1, 24),
    velocity(NOTE_ON_CH1, 25),
    velocity(NOTE_ON_CH1, 26),
    velocity(NOTE_ON_CH1, 27),
    velocity(NOTE_ON_CH1, 28),
    velocity(NOTE_ON_CH1, 29),
    velocity(NOTE_ON_CH1, 30),
    velocity(NOTE_ON_CH1, 31),
]);

/// The gates of [`VELOCITY`] with controllers 69 through 76 recorded as each channel's secondary trigger.
///
/// The entries keep the velocity behavior, so the controllers are only carried along for a later switch to
/// [`MapType::ControlChange`].
pub const CONTROL_CHANGE: MappingTable = MappingTable::new([
    velocity_with_controller(24, 69),
    velocity_with_controller(25, 70),
    velocity_with_controller(26, 71),
    velocity_with_controller(27, 72),
    velocity_with_controller(28, 73),
    velocity_with_controller(29, 74),
    velocity_with_controller(30, 75),
    velocity_with_controller(31, 76),
]);

/// Layout for the Arturia BeatStep Pro: the drum track on channel 8 drives two sampled-and-held and two free-running
/// random sequences (gate note, step note, reset note on the following key) plus two velocity gates, while the
/// two melodic sequencers on channels 1 and 2 drive pitch channels.
pub const BEATSTEP_PRO: MappingTable = MappingTable::new([
    sequence(MapType::RandomSequenceSampleAndHold, 36, 44),
    sequence(MapType::RandomSequenceSampleAndHold, 37, 46),
    sequence(MapType::RandomSequence, 38, 48),
    sequence(MapType::RandomSequence, 39, 50),
    velocity(NOTE_ON_CH8, 40),
    velocity(NOTE_ON_CH8, 41),
    pitch(NOTE_ON_CH1),
    pitch(NOTE_ON_CH2),
]);
