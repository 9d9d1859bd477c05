//! This crate contains architecture-agnostic logic for the Octogate, an eight-channel Eurorack interface which
//! translates [MIDI](https://midi.org/midi-1-0) messages into [CV/gate](https://en.wikipedia.org/wiki/CV/gate)
//! signals. Each of the eight channels pairs a gate output with a DAC channel, and a per-channel [`MappingEntry`]
//! decides which MIDI messages open the gate and what the DAC should output: velocity, controller values, pitch,
//! sampled-and-held pitch or a pseudo-random step sequence.
//!
//! The mapping table is built on the device itself through a "MIDI learn" procedure driven by a single push button
//! and an LED, or received in bulk as a SysEx frame. Hardware lives behind the [`Outputs`](dispatch::Outputs) and
//! [`MapStorage`](device::MapStorage) traits so that everything here can be exercised on a host.
//!
//! [`MappingEntry`]: mapping::MappingEntry

#![deny(missing_docs)]
#![no_std]

mod log;

#[cfg(test)]
mod testing;

pub mod bulk;
pub mod button;
pub mod configuration;
pub mod device;
pub mod dispatch;
pub mod learn;
pub mod led;
pub mod lfsr;
pub mod mapping;
pub mod midi_event;
pub mod pitch;

/// Number of gate outputs, which is also the number of DAC channels and of mapping table entries.
pub const NUM_GATES: usize = 8;

/// Period of the main control loop, in milliseconds. Button debouncing, LED animation and learn mode all count
/// time in ticks of this length.
pub const TICK_MS: u32 = 10;
