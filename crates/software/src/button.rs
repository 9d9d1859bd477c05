//! Debouncing and long-press detection for the front panel pushbutton.

use crate::TICK_MS;

/// Time the button must stay down before a press counts, in ticks.
pub const DEBOUNCE_TICKS: u16 = (50 / TICK_MS) as u16;

/// Time the button must stay down before a press counts as a long press, in ticks.
pub const LONG_PRESS_TICKS: u16 = (2000 / TICK_MS) as u16;

/// The debounced state of the button, as reported once per tick.
///
/// Consumers act on the two one-tick events: [`Released`](ButtonState::Released) after a short press and
/// [`Held`](ButtonState::Held) when a press crosses the long-press threshold.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    /// Not pressed.
    #[default]
    Idle,
    /// Down, but not yet for long enough to count.
    Debouncing,
    /// Down after debouncing; a release from here is a short press.
    Pressed,
    /// The press has just become a long press.
    Held,
    /// Still down after a long press; releasing from here reports nothing.
    Down,
    /// A short press has just ended.
    Released,
}

/// Turns raw, bouncing pin readings sampled once per tick into [`ButtonState`]s.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Button {
    state: ButtonState,
    timer: u16,
}

impl Button {
    /// Feeds one reading (`true` while the button is down) and returns the resulting state.
    pub fn update(&mut self, down: bool) -> ButtonState {
        self.state = match self.state {
            ButtonState::Idle | ButtonState::Released => {
                self.timer = 0;
                if down {
                    ButtonState::Debouncing
                } else {
                    ButtonState::Idle
                }
            }
            ButtonState::Debouncing if !down => ButtonState::Idle,
            ButtonState::Debouncing => {
                self.timer += 1;
                if self.timer >= DEBOUNCE_TICKS {
                    self.timer = 0;
                    ButtonState::Pressed
                } else {
                    ButtonState::Debouncing
                }
            }
            ButtonState::Pressed if !down => ButtonState::Released,
            ButtonState::Pressed => {
                self.timer += 1;
                if self.timer >= LONG_PRESS_TICKS {
                    ButtonState::Held
                } else {
                    ButtonState::Pressed
                }
            }
            ButtonState::Held | ButtonState::Down if !down => ButtonState::Idle,
            ButtonState::Held | ButtonState::Down => ButtonState::Down,
        };
        self.state
    }

    /// Returns the state reported by the last [`update`](Self::update).
    pub fn state(&self) -> ButtonState {
        self.state
    }
}
