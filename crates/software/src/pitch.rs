//! One volt per octave pitch table for the DAC.
//!
//! Index `n` holds the 16-bit DAC code for `n` semitones above the bottom of the output range, so MIDI note numbers
//! 0 through 60 cover five octaves. The converter only resolves the top 12 bits of each code. The values are
//! hand-tuned against the output stage rather than computed, hence the occasional uneven step.

/// Number of entries in [`PITCH_LOOKUP`]; MIDI note numbers at or above this are out of range for pitch channels.
pub const PITCH_TABLE_SIZE: usize = 61;

/// DAC codes for each playable note.
#[rustfmt::skip]
pub const PITCH_LOOKUP: [u16; PITCH_TABLE_SIZE] = [
    0x0000, 0x0440, 0x0880, 0x0CD0, 0x1110, 0x1550, 0x19A0, 0x1DE0, 0x2220, 0x2660, 0x2AA0, 0x2EF0,
    0x3330, 0x3770, 0x3BC0, 0x4000, 0x4440, 0x4880, 0x4CC0, 0x5110, 0x5550, 0x5990, 0x5DE0, 0x6220,
    0x6660, 0x6AA0, 0x6EE0, 0x7330, 0x7770, 0x7BB0, 0x8000, 0x8440, 0x8880, 0x8CC0, 0x9100, 0x9550,
    0x9990, 0x9DD0, 0xA220, 0xA660, 0xAAA0, 0xAEE0, 0xB320, 0xB770, 0xBBB0, 0xBFF0, 0xC440, 0xC880,
    0xCCC0, 0xD100, 0xD550, 0xD990, 0xDDD0, 0xE210, 0xE660, 0xEAA0, 0xEEE0, 0xF320, 0xF760, 0xFBB0,
    0xFFF0,
];

/// Returns the DAC code for a note number, or `None` when the note lies outside the table.
pub fn pitch(note: u8) -> Option<u16> {
    PITCH_LOOKUP.get(usize::from(note)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rises_monotonically() {
        assert!(PITCH_LOOKUP.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn octaves_land_on_fifths_of_full_scale() {
        assert_eq!(Some(0x3330), pitch(12));
        assert_eq!(Some(0x6660), pitch(24));
        assert_eq!(Some(0xCCC0), pitch(48));
        assert_eq!(Some(0xFFF0), pitch(60));
    }

    #[test]
    fn notes_beyond_the_table_have_no_pitch() {
        assert_eq!(None, pitch(61));
        assert_eq!(None, pitch(127));
    }
}
