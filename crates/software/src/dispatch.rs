//! Interpretation of incoming MIDI events against the mapping table.

use crate::{
    NUM_GATES,
    lfsr::{advance, advance_alt},
    log,
    mapping::{Mapping, MappingTable, gate_status_matches},
    midi_event::MidiEvent,
    pitch::pitch,
};
use bitmask_enum::bitmask;

/// A set of gate outputs, one bit per channel.
#[bitmask(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gates {
    /// Channel 0.
    Gate0,
    /// Channel 1.
    Gate1,
    /// Channel 2.
    Gate2,
    /// Channel 3.
    Gate3,
    /// Channel 4.
    Gate4,
    /// Channel 5.
    Gate5,
    /// Channel 6.
    Gate6,
    /// Channel 7.
    Gate7,
}

/// Each channel's gate, indexed by channel.
pub const GATES: [Gates; NUM_GATES] = [
    Gates::Gate0,
    Gates::Gate1,
    Gates::Gate2,
    Gates::Gate3,
    Gates::Gate4,
    Gates::Gate5,
    Gates::Gate6,
    Gates::Gate7,
];

impl Gates {
    /// Returns the set holding every channel's gate.
    pub fn every_channel() -> Self {
        GATES.iter().fold(Self::none(), |gates, gate| gates | *gate)
    }
}

/// The hardware a [`dispatch`] acts upon.
pub trait Outputs {
    /// Drives one channel's gate.
    fn set_gate(&mut self, channel: usize, on: bool);

    /// Drives several gates at once.
    fn set_gates(&mut self, gates: Gates, on: bool) {
        for (channel, gate) in GATES.iter().enumerate() {
            if gates.contains(*gate) {
                self.set_gate(channel, on);
            }
        }
    }

    /// Writes a 16-bit code to one DAC channel. Converters with less resolution drop the low bits.
    fn write_dac(&mut self, channel: usize, value: u16);
}

/// Per-channel state that outlives a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelState {
    /// The value held for a sample-and-hold gate. For sequence channels this is also the live LFSR register.
    pub dac_buffer: [u16; NUM_GATES],
    /// The value a sequence channel's register rewinds to on its reset trigger.
    pub seeds: [u16; NUM_GATES],
}

impl Default for ChannelState {
    fn default() -> Self {
        let mut seeds = [0; NUM_GATES];
        for (i, seed) in seeds.iter_mut().enumerate() {
            *seed = ((i as u16) + 1) << 4;
        }
        Self {
            dac_buffer: [0; NUM_GATES],
            seeds,
        }
    }
}

/// Scales a 7-bit data byte to the top of the 16-bit DAC range. Out-of-range bytes wrap rather than saturate.
fn data_code(data: u8) -> u16 {
    u16::from(data) << 9
}

/// Evaluates one event against every channel's mapping, in channel order, and drives the outputs accordingly.
///
/// Channels whose type byte is unknown, and events that match nothing, are silently ignored.
pub fn dispatch<O: Outputs>(
    event: &MidiEvent,
    table: &MappingTable,
    state: &mut ChannelState,
    outputs: &mut O,
) {
    let MidiEvent {
        status,
        data1,
        data2,
    } = *event;
    let note_on = event.is_note_on();

    for (channel, entry) in table.iter().enumerate() {
        let Some(mapping) = entry.mapping() else {
            continue;
        };

        match mapping {
            Mapping::Velocity { gate } => {
                if gate.matches_gate(status, data1) {
                    outputs.set_gate(channel, note_on);
                    outputs.write_dac(channel, if note_on { data_code(data2) } else { 0 });
                }
            }
            Mapping::ControlChange { gate, controller } => {
                if gate.matches_gate(status, data1) {
                    outputs.set_gate(channel, note_on);
                }
                if controller.matches(status, data1) {
                    outputs.write_dac(channel, data_code(data2));
                }
            }
            Mapping::Pitch { gate_command } => {
                if gate_status_matches(status, gate_command) {
                    if let Some(code) = pitch(data1) {
                        outputs.set_gate(channel, note_on);
                        outputs.write_dac(channel, code);
                    }
                }
            }
            Mapping::PitchSampleAndHold {
                gate,
                pitch_command,
            } => {
                if gate.matches_gate(status, data1) {
                    outputs.set_gate(channel, note_on);
                    outputs.write_dac(channel, state.dac_buffer[channel]);
                }
                if gate_status_matches(status, pitch_command) {
                    if let Some(code) = pitch(data1) {
                        state.dac_buffer[channel] = code;
                    }
                }
            }
            Mapping::RandomSequence {
                gate,
                step,
                reset,
                sample_and_hold,
            } => {
                if gate.matches_gate(status, data1) {
                    outputs.set_gate(channel, note_on);
                    if sample_and_hold {
                        outputs.write_dac(channel, state.dac_buffer[channel]);
                    }
                }
                if step.matches(status, data1) {
                    state.dac_buffer[channel] = advance(state.dac_buffer[channel]);
                    if !sample_and_hold {
                        outputs.write_dac(channel, state.dac_buffer[channel]);
                    }
                } else if reset.matches(status, data1) {
                    state.dac_buffer[channel] = state.seeds[channel];
                }
            }
        }
    }
}

/// Derives a fresh seed for every sequence channel, so the next reset starts a different sequence. The running
/// registers are left alone.
pub fn new_seeds(table: &MappingTable, state: &mut ChannelState) {
    for (channel, entry) in table.iter().enumerate() {
        if entry.map_type().is_some_and(|map_type| map_type.is_sequence()) {
            let seed = state.seeds[channel];
            // The alternate taps send 1 to 0, which would freeze the sequence.
            state.seeds[channel] = match advance_alt(seed) {
                0 => advance(seed),
                next => next,
            };
        }
    }
    log::info!("New seeds: {}", state.seeds);
}

/// Rewinds every sequence channel's register to its seed. Called whenever the table changes so that no sequence
/// is left running from a zero register.
pub fn reset_sequences(table: &MappingTable, state: &mut ChannelState) {
    for (channel, entry) in table.iter().enumerate() {
        if entry.map_type().is_some_and(|map_type| map_type.is_sequence()) {
            state.dac_buffer[channel] = state.seeds[channel];
        }
    }
}
