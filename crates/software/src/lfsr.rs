//! 16-bit linear-feedback shift registers used to generate reproducible "random" step sequences.
//!
//! Both generators shift the register one bit to the right and insert the feedback bit at bit 15. They differ only
//! in their taps: [`advance`] drives the audible sequences, while [`advance_alt`] is reserved for producing fresh
//! seeds so that a new seed is decorrelated from the sequence currently playing.
//!
//! Zero is a fixed point of both generators; callers must never seed a register with zero.

/// Feedback taps of the sequence generator. This polynomial is maximal-length: every non-zero state lies on a
/// single cycle of 65 535 steps.
const SEQUENCE_TAPS: [u8; 4] = [0, 2, 3, 5];

/// Feedback taps of the seed generator.
const SEED_TAPS: [u8; 4] = [1, 3, 4, 8];

fn shift(state: u16, taps: &[u8; 4]) -> u16 {
    let bit = taps.iter().fold(0, |acc, &tap| acc ^ (state >> tap)) & 1;
    (state >> 1) | (bit << 15)
}

/// Returns the next step of a random sequence.
pub fn advance(state: u16) -> u16 {
    shift(state, &SEQUENCE_TAPS)
}

/// Returns the next seed in the seed generator's series.
///
/// Unlike [`advance`], bit 0 is not among the taps, so this is not a bijection: a handful of states (`1`, for one)
/// collapse to zero. Callers that feed its output back in as a seed must reject a zero result.
pub fn advance_alt(state: u16) -> u16 {
    shift(state, &SEED_TAPS)
}
