//! The front panel LED.

use crate::TICK_MS;

/// Half-period of the slowest blink, in milliseconds.
const SLOWEST_BLINK_MS: u32 = 200;

/// What the LED should be showing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedPattern {
    /// Dark.
    #[default]
    Off,
    /// Lit.
    On,
    /// Groups of `count` flashes separated by a dark pause as long as the group. Each increment of `speed` halves
    /// the flash length.
    Blink {
        /// Flashes per group.
        count: u8,
        /// Zero for the slowest blink.
        speed: u8,
    },
}

/// Animates an [`LedPattern`] one tick at a time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Blinker {
    pattern: LedPattern,
    timer: u16,
    lit: bool,
    flashes: u8,
    pausing: bool,
}

impl Blinker {
    /// Advances the animation by one tick and returns whether the LED should be lit. A pattern different from the
    /// previous tick's starts over from the beginning.
    pub fn tick(&mut self, pattern: LedPattern) -> bool {
        if pattern != self.pattern {
            *self = Self {
                pattern,
                ..Self::default()
            };
        }

        match pattern {
            LedPattern::Off => false,
            LedPattern::On => true,
            LedPattern::Blink { count, speed } => {
                let half_period = ((SLOWEST_BLINK_MS >> speed.min(31)) / TICK_MS).max(1) as u16;
                self.timer += 1;
                if self.pausing {
                    if self.timer >= half_period * u16::from(count) {
                        self.timer = 0;
                        self.pausing = false;
                    }
                } else if self.timer >= half_period {
                    self.timer = 0;
                    self.lit = !self.lit;
                    if !self.lit {
                        self.flashes += 1;
                        if self.flashes >= count {
                            self.flashes = 0;
                            self.pausing = true;
                        }
                    }
                }
                self.lit
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(blinker: &mut Blinker, pattern: LedPattern, out: &mut [bool]) {
        for lit in out.iter_mut() {
            *lit = blinker.tick(pattern);
        }
    }

    /// Counts dark-to-lit transitions.
    fn flashes(trace: &[bool]) -> usize {
        trace.windows(2).filter(|pair| !pair[0] && pair[1]).count()
    }

    #[test]
    fn steady_patterns() {
        let mut blinker = Blinker::default();
        assert!(!blinker.tick(LedPattern::Off));
        assert!(blinker.tick(LedPattern::On));
    }

    #[test]
    fn two_slow_flashes_then_a_pause() {
        let mut blinker = Blinker::default();
        let pattern = LedPattern::Blink { count: 2, speed: 0 };
        // Half-period of 20 ticks: two flashes take 80 ticks, then 40 ticks dark.
        let mut trace = [false; 120];
        record(&mut blinker, pattern, &mut trace);

        assert_eq!(2, flashes(&trace), "Expected left but got right");
        assert!(trace[19..39].iter().all(|lit| *lit));
        assert!(trace[80..120].iter().all(|lit| !*lit), "Should pause after the group");
    }

    #[test]
    fn group_repeats() {
        let mut blinker = Blinker::default();
        let pattern = LedPattern::Blink { count: 2, speed: 0 };
        let mut trace = [false; 240];
        record(&mut blinker, pattern, &mut trace);
        assert_eq!(4, flashes(&trace));
    }

    #[test]
    fn faster_speed_halves_the_flash() {
        let mut blinker = Blinker::default();
        let pattern = LedPattern::Blink { count: 1, speed: 1 };
        let mut trace = [false; 30];
        record(&mut blinker, pattern, &mut trace);
        assert_eq!(10, trace.iter().filter(|lit| **lit).count());
        assert_eq!(1, flashes(&trace));
    }

    #[test]
    fn pattern_change_restarts_animation() {
        let mut blinker = Blinker::default();
        let mut trace = [false; 25];
        record(&mut blinker, LedPattern::Blink { count: 3, speed: 0 }, &mut trace);
        assert!(trace[24], "Should be mid-flash");

        assert!(!blinker.tick(LedPattern::Blink { count: 1, speed: 0 }));
    }
}
