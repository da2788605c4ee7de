//! # Base-40 Pitch
//!
//! Pitch values in the base-40 system: every octave has 40 slots, enough for each
//! diatonic class to carry up to two flats or sharps without colliding with its
//! neighbours. Intervals are plain subtraction and enharmonic spellings stay distinct.
//!
//! ## Example
//! ```rust
//! use scorepage::pitch::Base40;
//!
//! let c_sharp = Base40::from_diatonic(28, 1);
//! assert_eq!(c_sharp.value(), 163);
//! assert_eq!(c_sharp.name(), "C#4");
//! assert_eq!(c_sharp.midi(), Some(61));
//! ```

use std::fmt;

/// Number of diatonic slots tracked for accidentals (ten octaves).
pub const DIATONIC_SLOTS: usize = 70;

/// Base-40 value of each natural pitch class, C through B, in octave 0.
const NATURALS: [i32; 7] = [2, 8, 14, 19, 25, 31, 37];

const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

const SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Order in which sharps enter a key signature (F C G D A E B).
const SHARP_ORDER: [usize; 7] = [3, 0, 4, 1, 5, 2, 6];

/// Order in which flats enter a key signature (B E A D G C F).
const FLAT_ORDER: [usize; 7] = [6, 2, 5, 1, 4, 0, 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Base40(i32);

impl Base40 {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Pitch of diatonic slot `diatonic` (7 per octave, 28 = C4) with `alteration`
    /// semitones. Alterations beyond a double sharp or flat are clamped.
    pub fn from_diatonic(diatonic: usize, alteration: i8) -> Self {
        let octave = (diatonic / 7) as i32;
        let class = diatonic % 7;
        let alteration = i32::from(alteration.clamp(-2, 2));
        Self(octave * 40 + NATURALS[class] + alteration)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn octave(self) -> i32 {
        self.0.div_euclid(40)
    }

    /// Diatonic class (0 = C) and alteration, if the value names a spelled pitch.
    /// The five slots between naturals that no double accidental reaches give `None`.
    pub fn spelling(self) -> Option<(usize, i8)> {
        let within = self.0.rem_euclid(40);
        NATURALS
            .iter()
            .enumerate()
            .find_map(|(class, &natural)| {
                let alteration = within - natural;
                (-2..=2).contains(&alteration).then_some((class, alteration as i8))
            })
    }

    /// Name such as `C4`, `F#5` or `Bbb3`; an unspellable value prints as its number.
    pub fn name(self) -> String {
        match self.spelling() {
            Some((class, alteration)) => {
                let accidental = match alteration {
                    -2 => "bb",
                    -1 => "b",
                    1 => "#",
                    2 => "##",
                    _ => "",
                };
                format!("{}{}{}", LETTERS[class], accidental, self.octave())
            }
            None => self.0.to_string(),
        }
    }

    /// MIDI key number, middle C = 60. `None` for an unspellable value.
    pub fn midi(self) -> Option<i32> {
        let (class, alteration) = self.spelling()?;
        Some(12 * (self.octave() + 1) + SEMITONES[class] + i32::from(alteration))
    }
}

impl fmt::Display for Base40 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Alteration of each diatonic class (0 = C) under a key signature of `fifths`
/// sharps (positive) or flats (negative).
pub fn key_alterations(fifths: i8) -> [i8; 7] {
    let mut classes = [0i8; 7];
    let count = usize::from(fifths.unsigned_abs()).min(7);
    let (order, alteration) = if fifths >= 0 { (SHARP_ORDER, 1) } else { (FLAT_ORDER, -1) };
    for &class in &order[..count] {
        classes[class] = alteration;
    }
    classes
}

/// Diatonic slot of a vertical position under a clef that puts middle C at
/// `middle_c`. Positions beyond the tracked range are clamped to it.
pub fn diatonic_index(vpos: f64, middle_c: i32) -> usize {
    let index = 28 + vpos.round() as i64 - i64::from(middle_c);
    index.clamp(0, DIATONIC_SLOTS as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c() {
        let c4 = Base40::from_diatonic(28, 0);
        assert_eq!(c4.value(), 162);
        assert_eq!(c4.name(), "C4");
        assert_eq!(c4.midi(), Some(60));
    }

    #[test]
    fn test_enharmonics_stay_distinct() {
        let b_sharp = Base40::from_diatonic(27, 1);
        let c4 = Base40::from_diatonic(28, 0);
        assert_ne!(b_sharp, c4);
        assert_eq!(b_sharp.midi(), c4.midi());
        assert_eq!(b_sharp.name(), "B#3");
    }

    #[test]
    fn test_double_flat_name() {
        assert_eq!(Base40::from_diatonic(34, -2).name(), "Bbb4");
        assert_eq!(Base40::from_diatonic(31, 2).name(), "F##4");
    }

    #[test]
    fn test_key_alterations() {
        // D major: F# C#
        assert_eq!(key_alterations(2), [1, 0, 0, 1, 0, 0, 0]);
        // E-flat major: Bb Eb Ab
        assert_eq!(key_alterations(-3), [0, 0, -1, 0, 0, -1, -1]);
        assert_eq!(key_alterations(0), [0; 7]);
    }

    #[test]
    fn test_diatonic_index_in_treble_and_bass() {
        // Bottom line of a treble staff is E4.
        assert_eq!(diatonic_index(3.0, 1), 30);
        // Top line of a bass staff is A3.
        assert_eq!(diatonic_index(11.0, 13), 26);
        assert_eq!(diatonic_index(-500.0, 1), 0);
        assert_eq!(diatonic_index(500.0, 1), DIATONIC_SLOTS - 1);
    }

    #[test]
    fn test_unspellable_value() {
        assert_eq!(Base40::new(6).name(), "Dbb0");
        assert_eq!(Base40::new(5).spelling(), None);
        assert_eq!(Base40::new(5).midi(), None);
    }
}
