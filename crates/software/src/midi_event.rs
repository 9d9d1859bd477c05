//! Complete MIDI messages and how they reach the device.

#[cfg(feature = "defmt")]
use wmidi::MidiMessage;

mod parser;
pub use parser::*;

/// Status byte high nibble of a Note On message.
const NOTE_ON: u8 = 0x90;

/// Status byte high nibble of a Control Change message.
const CONTROL_CHANGE: u8 = 0xB0;

/// One complete MIDI channel message, kept as raw bytes.
///
/// Mapping decisions are made on the raw status byte (see [`Trigger`](crate::mapping::Trigger)) rather than on a
/// decoded message, because gate matching deliberately blurs the distinction between some statuses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Status byte.
    pub status: u8,
    /// First data byte.
    pub data1: u8,
    /// Second data byte; zero for one-data-byte messages.
    pub data2: u8,
}

impl MidiEvent {
    /// Constructs a [`MidiEvent`].
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Returns `true` for a Note On on any channel, whatever its velocity.
    pub fn is_note_on(&self) -> bool {
        self.status & 0xF0 == NOTE_ON
    }

    /// Returns `true` for a Control Change on any channel.
    pub fn is_control_change(&self) -> bool {
        self.status & 0xF0 == CONTROL_CHANGE
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MidiEvent {
    fn format(&self, fmt: defmt::Formatter) {
        let bytes = [self.status, self.data1, self.data2];
        match MidiMessage::from_bytes(&bytes) {
            Ok(MidiMessage::NoteOn(channel, note, velocity)) => defmt::write!(
                fmt,
                "NoteOn: channel {}, note {}, velocity: {}",
                channel.number(),
                note.to_str(),
                u8::from(velocity)
            ),
            Ok(MidiMessage::NoteOff(channel, note, velocity)) => defmt::write!(
                fmt,
                "NoteOff: channel {}, note {}, velocity: {}",
                channel.number(),
                note.to_str(),
                u8::from(velocity)
            ),
            Ok(MidiMessage::ControlChange(channel, control_function, control_value)) => {
                defmt::write!(
                    fmt,
                    "ControlChange: channel {}, controller {}, value: {}",
                    channel.number(),
                    u8::from(control_function),
                    u8::from(control_value)
                )
            }
            _ => defmt::write!(fmt, "MidiEvent {{ data: {:x} }}", bytes),
        }
    }
}

/// Single-slot hand-off between whoever parses MIDI and whoever consumes it.
///
/// There is no queue: posting over an unconsumed event replaces it. In play mode events are consumed as soon as
/// they are posted so nothing is lost; in learn mode they are consumed once per control tick, and an event
/// overwritten in between is dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mailbox {
    event: MidiEvent,
    ready: bool,
}

impl Mailbox {
    /// Stores an event, replacing any unconsumed one.
    pub fn post(&mut self, event: MidiEvent) {
        self.event = event;
        self.ready = true;
    }

    /// Consumes the stored event, if a fresh one is waiting.
    pub fn take(&mut self) -> Option<MidiEvent> {
        if self.ready {
            self.ready = false;
            Some(self.event)
        } else {
            None
        }
    }

    /// Discards any unconsumed event.
    pub fn clear(&mut self) {
        self.ready = false;
    }

    /// Returns `true` if an unconsumed event is waiting.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}
