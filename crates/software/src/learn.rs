//! MIDI learn: building the mapping table from live input, one channel at a time.
//!
//! The user picks a behavior for the channel being learned by tapping the button, which cycles through the
//! [`MapType`]s, then plays the notes (and, for controller channels, moves the controller) that should drive it.
//! Behaviors that need more than one trigger walk through additional phases; the LED tells the user which behavior
//! is selected and how far along they are.

use crate::{
    NUM_GATES,
    configuration::CycleConfig,
    led::LedPattern,
    mapping::{MapType, MappingEntry},
    midi_event::MidiEvent,
};

/// Which trigger the session is waiting for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LearnPhase {
    /// The note that drives the gate, which also fixes the entry's [`MapType`].
    #[default]
    Gate,
    /// The controller whose value is written to the DAC.
    AwaitingController,
    /// A note on the MIDI channel whose pitches are sampled.
    AwaitingPitch,
    /// The note that advances the random sequence.
    AwaitingStep,
    /// The note that rewinds the random sequence.
    AwaitingReset,
}

impl LearnPhase {
    /// How deep into an entry this phase is; drives the LED's blink speed.
    fn depth(&self) -> u8 {
        match self {
            Self::Gate => 0,
            Self::AwaitingController | Self::AwaitingPitch | Self::AwaitingStep => 1,
            Self::AwaitingReset => 2,
        }
    }
}

/// Progress through a learn session.
///
/// Transitions are pure: [`learn`](Self::learn) and [`cycle_type`](Self::cycle_type) return the next session and
/// leave applying the result to the caller. Captured fields are held here until the entry is complete, so the
/// table never holds a half-learned channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LearnSession {
    index: usize,
    map_type: MapType,
    phase: LearnPhase,
    entry: MappingEntry,
}

impl Default for LearnSession {
    fn default() -> Self {
        Self {
            index: 0,
            map_type: MapType::Velocity,
            phase: LearnPhase::Gate,
            entry: MappingEntry::default(),
        }
    }
}

impl LearnSession {
    /// Offers an event to the session. Returns the next session and, if the event completed the current channel,
    /// its entry. Events that do not qualify for the current phase leave the session unchanged.
    pub fn learn(self, event: &MidiEvent) -> (Self, Option<MappingEntry>) {
        let mut entry = self.entry;

        let next_phase = match self.phase {
            LearnPhase::Gate if event.is_note_on() => {
                entry.map_type = self.map_type as u8;
                entry.gate_command = event.status;
                match self.map_type {
                    MapType::Velocity => {
                        entry.gate_value = event.data1;
                        None
                    }
                    MapType::ControlChange => {
                        entry.gate_value = event.data1;
                        Some(LearnPhase::AwaitingController)
                    }
                    MapType::Pitch => None,
                    MapType::PitchSampleAndHold => {
                        entry.gate_value = event.data1;
                        Some(LearnPhase::AwaitingPitch)
                    }
                    MapType::RandomSequence | MapType::RandomSequenceSampleAndHold => {
                        entry.gate_value = event.data1;
                        Some(LearnPhase::AwaitingStep)
                    }
                }
            }
            LearnPhase::AwaitingController if event.is_control_change() => {
                entry.cv_command_1 = event.status;
                entry.cv_value_1 = event.data1;
                None
            }
            LearnPhase::AwaitingPitch if event.is_note_on() => {
                entry.cv_command_1 = event.status;
                None
            }
            LearnPhase::AwaitingStep if event.is_note_on() => {
                entry.cv_command_1 = event.status;
                entry.cv_value_1 = event.data1;
                Some(LearnPhase::AwaitingReset)
            }
            LearnPhase::AwaitingReset if event.is_note_on() => {
                entry.cv_command_2 = event.status;
                entry.cv_value_2 = event.data1;
                None
            }
            _ => return (self, None),
        };

        match next_phase {
            Some(phase) => (
                Self {
                    phase,
                    entry,
                    ..self
                },
                None,
            ),
            None => (
                Self {
                    index: self.index + 1,
                    ..Self::default()
                },
                Some(entry),
            ),
        }
    }

    /// Selects the next behavior for the current channel and starts its capture over.
    pub fn cycle_type(self) -> Self {
        Self {
            index: self.index,
            map_type: self.map_type.cycle(),
            ..Self::default()
        }
    }

    /// Returns `true` once every channel has been learned.
    pub fn is_complete(&self) -> bool {
        self.index >= NUM_GATES
    }

    /// The channel being learned.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The behavior being learned for the current channel.
    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    /// The trigger the session is waiting for.
    pub fn phase(&self) -> LearnPhase {
        self.phase
    }

    /// One flash per [`MapType`] position, quickening as the entry's later triggers are captured.
    pub fn led_pattern(&self) -> LedPattern {
        LedPattern::Blink {
            count: self.map_type as u8 + 1,
            speed: self.phase.depth(),
        }
    }
}
