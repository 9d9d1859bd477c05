//! Framing of a raw MIDI byte stream into [`MidiEvent`]s and SysEx frames.

use super::MidiEvent;
use crate::bulk::FRAME_BYTES;
use core::mem;
use tinyvec::ArrayVec;

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// Status class whose messages carry a single data byte. They are framed but never delivered.
const SINGLE_DATA_BYTE: u8 = 0xD0;

/// A complete unit of input produced by the [`Parser`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Received {
    /// A channel message.
    Event(MidiEvent),
    /// A system-exclusive frame, markers included.
    SysEx(SysEx),
}

/// A system-exclusive frame, collected up to the size of a bulk mapping transfer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SysEx {
    bytes: ArrayVec<[u8; FRAME_BYTES]>,
    overflowed: bool,
}

impl SysEx {
    fn push(&mut self, byte: u8) {
        if self.bytes.try_push(byte).is_some() {
            self.overflowed = true;
        }
    }

    /// Returns the collected bytes. For an overflowed frame these are only the first [`FRAME_BYTES`].
    pub fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Returns `true` if the frame was longer than [`FRAME_BYTES`].
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }
}

impl From<&[u8]> for SysEx {
    fn from(bytes: &[u8]) -> Self {
        let mut sysex = Self::default();
        bytes.iter().for_each(|&byte| sysex.push(byte));
        sysex
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SysEx {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "SysEx {{ len: {}, overflowed: {} }}",
            self.bytes.len(),
            self.overflowed
        );
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Idle,
    FirstData {
        status: u8,
    },
    SecondData {
        status: u8,
        data1: u8,
    },
    SysEx,
}

/// Assembles bytes received from a serial MIDI input into complete messages.
///
/// Only what the device acts upon is framed: channel messages and SysEx. There is no running status, so data bytes
/// that arrive without a fresh status byte are dropped. A status byte arriving mid-message abandons the message,
/// and system real-time bytes are skipped wherever they appear.
#[derive(Debug, Default, Clone)]
pub struct Parser {
    state: State,
    sysex: SysEx,
}

impl Parser {
    /// Constructs a new [`Parser`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one byte, returning whatever it completes.
    pub fn feed(&mut self, byte: u8) -> Option<Received> {
        match byte {
            0xF8..=0xFF => None,
            SYSEX_START => {
                self.sysex = SysEx::default();
                self.sysex.push(byte);
                self.state = State::SysEx;
                None
            }
            SYSEX_END => {
                let in_sysex = self.state == State::SysEx;
                self.state = State::Idle;
                in_sysex.then(|| {
                    self.sysex.push(byte);
                    Received::SysEx(mem::take(&mut self.sysex))
                })
            }
            0xF1..=0xF6 => {
                self.state = State::Idle;
                None
            }
            0x80..=0xEF => {
                self.state = State::FirstData { status: byte };
                None
            }
            data => self.data(data),
        }
    }

    fn data(&mut self, data: u8) -> Option<Received> {
        match self.state {
            State::Idle => None,
            State::FirstData { status } if status & 0xF0 == SINGLE_DATA_BYTE => {
                self.state = State::Idle;
                None
            }
            State::FirstData { status } => {
                self.state = State::SecondData {
                    status,
                    data1: data,
                };
                None
            }
            State::SecondData { status, data1 } => {
                self.state = State::Idle;
                Some(Received::Event(MidiEvent::new(status, data1, data)))
            }
            State::SysEx => {
                self.sysex.push(data);
                None
            }
        }
    }
}

/// Returns the MIDI bytes carried by a 32-bit USB-MIDI Event Packet, based on its Code Index Number.
///
/// The zeroth byte is the packet header; its low nibble says how many of the remaining three bytes are meaningful.
/// Malformed or reserved packets yield an empty slice.
pub fn usb_midi_payload(packet: &[u8]) -> &[u8] {
    if packet.len() != 4 {
        return &[];
    }
    let len = match packet[0] & 0x0F {
        0x5 | 0xF => 1,
        0x2 | 0x6 | 0xC | 0xD => 2,
        0x3 | 0x4 | 0x7..=0xB | 0xE => 3,
        _ => 0,
    };
    &packet[1..1 + len]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut Parser, bytes: &[u8]) -> Option<Received> {
        bytes.iter().fold(None, |last, &byte| parser.feed(byte).or(last))
    }

    #[test]
    fn three_byte_message_completes_on_last_byte() {
        let mut parser = Parser::new();
        assert_eq!(None, parser.feed(0x90));
        assert_eq!(None, parser.feed(36));
        assert_eq!(
            Some(Received::Event(MidiEvent::new(0x90, 36, 100))),
            parser.feed(100),
            "Expected left but got right"
        );
    }

    #[test]
    fn channel_pressure_is_consumed_without_an_event() {
        let mut parser = Parser::new();
        assert_eq!(None, feed_all(&mut parser, &[0xD3, 64]));
        assert_eq!(
            None,
            parser.feed(0x40),
            "Expected the byte after channel pressure to be dropped"
        );
        assert_eq!(
            Some(Received::Event(MidiEvent::new(0x93, 60, 100))),
            feed_all(&mut parser, &[0x93, 60, 100])
        );
    }

    #[test]
    fn no_running_status() {
        let mut parser = Parser::new();
        feed_all(&mut parser, &[0x90, 36, 100]);
        assert_eq!(None, parser.feed(37));
        assert_eq!(None, parser.feed(100));
    }

    #[test]
    fn status_byte_restarts_framing() {
        let mut parser = Parser::new();
        assert_eq!(
            Some(Received::Event(MidiEvent::new(0xB0, 7, 127))),
            feed_all(&mut parser, &[0x90, 36, 0xB0, 7, 127])
        );
    }

    #[test]
    fn real_time_bytes_do_not_interrupt_messages() {
        let mut parser = Parser::new();
        assert_eq!(
            Some(Received::Event(MidiEvent::new(0x80, 36, 0))),
            feed_all(&mut parser, &[0x80, 0xF8, 36, 0xFE, 0])
        );
    }

    #[test]
    fn system_common_aborts_message() {
        let mut parser = Parser::new();
        assert_eq!(None, feed_all(&mut parser, &[0x90, 36, 0xF2, 100]));
    }

    mod sysex {
        use super::*;

        #[test]
        fn frame_includes_markers() {
            let mut parser = Parser::new();
            match feed_all(&mut parser, &[0xF0, 1, 2, 3, 0xF7]) {
                Some(Received::SysEx(sysex)) => {
                    assert_eq!(&[0xF0, 1, 2, 3, 0xF7], sysex.as_slice());
                    assert!(!sysex.is_overflowed());
                }
                other => panic!("Expected a SysEx frame, got {:?}", other),
            }
        }

        #[test]
        fn oversized_frame_is_flagged() {
            let mut parser = Parser::new();
            parser.feed(0xF0);
            for _ in 0..FRAME_BYTES {
                parser.feed(0x01);
            }
            match parser.feed(0xF7) {
                Some(Received::SysEx(sysex)) => {
                    assert!(sysex.is_overflowed());
                    assert_eq!(FRAME_BYTES, sysex.as_slice().len());
                }
                other => panic!("Expected a SysEx frame, got {:?}", other),
            }
        }

        #[test]
        fn end_marker_without_start_is_ignored() {
            let mut parser = Parser::new();
            assert_eq!(None, parser.feed(0xF7));
        }

        #[test]
        fn channel_status_abandons_frame() {
            let mut parser = Parser::new();
            assert_eq!(None, feed_all(&mut parser, &[0xF0, 1, 2, 0x90, 0xF7]));
        }
    }

    mod usb {
        use super::*;

        #[test]
        fn note_on_packet_carries_three_bytes() {
            assert_eq!(&[0x90, 60, 100], usb_midi_payload(&[0x09, 0x90, 60, 100]));
        }

        #[test]
        fn sysex_end_packets_drop_padding() {
            assert_eq!(&[0xF7], usb_midi_payload(&[0x05, 0xF7, 0, 0]));
            assert_eq!(&[0x01, 0xF7], usb_midi_payload(&[0x06, 0x01, 0xF7, 0]));
        }

        #[test]
        fn reserved_and_short_packets_are_empty() {
            assert!(usb_midi_payload(&[0x00, 0x90, 60, 100]).is_empty());
            assert!(usb_midi_payload(&[0x09, 0x90]).is_empty());
        }
    }
}
