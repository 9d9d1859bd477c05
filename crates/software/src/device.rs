//! The device as a whole: what it does with incoming MIDI and with the button, depending on its mode.

use crate::{
    bulk,
    button::ButtonState,
    configuration::CycleConfig,
    dispatch::{ChannelState, Gates, Outputs, dispatch, new_seeds, reset_sequences},
    learn::LearnSession,
    led::LedPattern,
    log,
    mapping::{MappingTable, TABLE_BYTES, preset},
    midi_event::{Mailbox, MidiEvent, SysEx},
};
use num_derive::{FromPrimitive, ToPrimitive};

/// Length of the all-gates flash, in ticks.
pub const FLASH_TICKS: u8 = 5;

/// Non-volatile storage for the mapping table.
pub trait MapStorage {
    /// Error reported by the underlying medium.
    type Error;

    /// Fills `bytes` with the stored table. Whatever is stored is returned as-is.
    fn read(&mut self, bytes: &mut [u8; TABLE_BYTES]) -> Result<(), Self::Error>;

    /// Replaces the stored table.
    fn write(&mut self, bytes: &[u8; TABLE_BYTES]) -> Result<(), Self::Error>;
}

/// The actions offered by the menu, in the order a short press steps through them. Each is shown on the gate
/// output of the same index.
#[derive(Debug, Clone, Copy, ToPrimitive, FromPrimitive, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuItem {
    /// Start a learn session.
    Learn,
    /// Write the table to storage.
    Save,
    /// Replace the table with the stored one.
    Load,
    /// Replace the table with the built-in preset.
    LoadPreset,
    /// Leave the menu without doing anything.
    Exit,
}
impl CycleConfig for MenuItem {}

/// What the device is doing. Only [`Mode::Play`] dispatches MIDI to the outputs, and only [`Mode::Learn`] writes
/// the table entry by entry, so the two never touch the table at the same time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// MIDI drives the outputs. A short press re-seeds the sequences and a long press opens the menu.
    #[default]
    Play,
    /// The menu is open with the given item selected.
    Menu(MenuItem),
    /// A learn session is running.
    Learn(LearnSession),
}

/// Everything the device knows, together with the outputs it drives.
pub struct Device<O: Outputs> {
    table: MappingTable,
    channels: ChannelState,
    mailbox: Mailbox,
    mode: Mode,
    outputs: O,
    flash_ticks: u8,
    save_pending: bool,
}

impl<O: Outputs> Device<O> {
    /// Constructs a [`Device`] in play mode with an empty table. Call [`load`](Self::load) to restore the stored
    /// table.
    pub fn new(outputs: O) -> Self {
        Self {
            table: MappingTable::default(),
            channels: ChannelState::default(),
            mailbox: Mailbox::default(),
            mode: Mode::default(),
            outputs,
            flash_ticks: 0,
            save_pending: false,
        }
    }

    /// Returns the current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the mapping table.
    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Returns the outputs.
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Returns the outputs mutably.
    pub fn outputs_mut(&mut self) -> &mut O {
        &mut self.outputs
    }

    /// Replaces the table with the stored one, without any validation, and rewinds the sequences.
    pub fn load<S: MapStorage>(&mut self, storage: &mut S) -> Result<(), S::Error> {
        let mut bytes = [0; TABLE_BYTES];
        storage.read(&mut bytes)?;
        self.table = MappingTable::from_bytes(&bytes);
        reset_sequences(&self.table, &mut self.channels);
        log::info!("Loaded mapping table");
        Ok(())
    }

    fn save<S: MapStorage>(&mut self, storage: &mut S) -> Result<(), S::Error> {
        storage.write(&self.table.to_bytes())?;
        log::info!("Saved mapping table");
        Ok(())
    }

    fn flash_all_gates(&mut self) {
        self.outputs.set_gates(Gates::every_channel(), true);
        self.flash_ticks = FLASH_TICKS;
    }

    /// Accepts one complete MIDI event. In play mode it is acted upon immediately; in learn mode it waits for the
    /// next [`tick`](Self::tick), replacing any event already waiting; in the menu it is dropped.
    pub fn receive(&mut self, event: MidiEvent) {
        self.mailbox.post(event);
        match self.mode {
            Mode::Play => {
                if let Some(event) = self.mailbox.take() {
                    dispatch(&event, &self.table, &mut self.channels, &mut self.outputs);
                }
            }
            Mode::Menu(_) => self.mailbox.clear(),
            Mode::Learn(_) => {}
        }
    }

    /// Accepts a SysEx frame, which replaces the whole table if it is a well-formed bulk transfer. The new table is
    /// written to storage on the next [`tick`](Self::tick). A malformed frame flashes every gate and changes
    /// nothing. Frames are ignored outside play mode.
    pub fn receive_sysex(&mut self, sysex: &SysEx) {
        if self.mode != Mode::Play {
            log::warning!("Ignoring SysEx outside play mode");
            return;
        }

        let decoded = if sysex.is_overflowed() {
            Err(bulk::BulkError::Length)
        } else {
            bulk::decode(sysex.as_slice())
        };
        match decoded {
            Ok(table) => {
                self.table = table;
                reset_sequences(&self.table, &mut self.channels);
                self.save_pending = true;
                log::info!("Received mapping table");
            }
            Err(_error) => {
                log::warning!("Rejected bulk transfer: {}", _error);
                self.flash_all_gates();
            }
        }
    }

    /// Runs one iteration of the control loop, given the debounced button state. Storage is only touched when the
    /// table needs saving or loading. A failure is returned after the rest of the tick has run, the deferred save's
    /// failure first.
    pub fn tick<S: MapStorage>(&mut self, button: ButtonState, storage: &mut S) -> Result<(), S::Error> {
        if self.flash_ticks > 0 {
            self.flash_ticks -= 1;
            if self.flash_ticks == 0 {
                self.outputs.set_gates(Gates::every_channel(), false);
            }
        }

        let deferred = if self.save_pending {
            self.save_pending = false;
            self.save(storage)
        } else {
            Ok(())
        };

        let result = match self.mode {
            Mode::Play => {
                match button {
                    ButtonState::Released => new_seeds(&self.table, &mut self.channels),
                    ButtonState::Held => self.open_menu(),
                    _ => {}
                }
                Ok(())
            }
            Mode::Menu(item) => match button {
                ButtonState::Released => {
                    let next = item.cycle();
                    self.outputs.set_gate(item as usize, false);
                    self.outputs.set_gate(next as usize, true);
                    self.mode = Mode::Menu(next);
                    Ok(())
                }
                ButtonState::Held => self.select(item, storage),
                _ => Ok(()),
            },
            Mode::Learn(session) => self.learn(session, button, storage),
        };

        deferred.and(result)
    }

    fn open_menu(&mut self) {
        self.mode = Mode::Menu(MenuItem::Learn);
        self.mailbox.clear();
        self.outputs.set_gate(MenuItem::Learn as usize, true);
        log::info!("Opened menu");
    }

    fn select<S: MapStorage>(&mut self, item: MenuItem, storage: &mut S) -> Result<(), S::Error> {
        self.outputs.set_gate(item as usize, false);
        log::info!("Selected {}", item);

        match item {
            MenuItem::Learn => {
                self.mode = Mode::Learn(LearnSession::default());
                self.mailbox.clear();
                Ok(())
            }
            MenuItem::Save => {
                self.mode = Mode::Play;
                self.save(storage)
            }
            MenuItem::Load => {
                self.mode = Mode::Play;
                self.load(storage)
            }
            MenuItem::LoadPreset => {
                self.mode = Mode::Play;
                self.table.copy_from(&preset::BEATSTEP_PRO);
                reset_sequences(&self.table, &mut self.channels);
                Ok(())
            }
            MenuItem::Exit => {
                self.mode = Mode::Play;
                Ok(())
            }
        }
    }

    fn learn<S: MapStorage>(
        &mut self,
        mut session: LearnSession,
        button: ButtonState,
        storage: &mut S,
    ) -> Result<(), S::Error> {
        if let Some(event) = self.mailbox.take() {
            let channel = session.index();
            let (next, learned) = session.learn(&event);
            if let Some(entry) = learned {
                self.table[channel] = entry;
                self.outputs.set_gate(channel, true);
                log::info!("Learned channel {}: {}", channel, entry);
            }
            session = next;
        }

        if button == ButtonState::Released {
            session = session.cycle_type();
        }

        if session.is_complete() || button == ButtonState::Held {
            self.mode = Mode::Play;
            self.mailbox.clear();
            self.flash_all_gates();
            reset_sequences(&self.table, &mut self.channels);
            log::info!("Finished learning after {} channels", session.index());
            self.save(storage)
        } else {
            self.mode = Mode::Learn(session);
            Ok(())
        }
    }

    /// What the LED should show: dark while playing, lit in the menu and blinking while learning.
    pub fn led_pattern(&self) -> LedPattern {
        match self.mode {
            Mode::Play => LedPattern::Off,
            Mode::Menu(_) => LedPattern::On,
            Mode::Learn(session) => session.led_pattern(),
        }
    }
}
