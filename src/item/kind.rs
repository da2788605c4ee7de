//! Item-type codes and the typed view of an item's fixed parameters.
//!
//! The legacy format dispatches everything on P1. [`ItemType`] names those codes and
//! [`ItemKind`] decodes the per-type field layout once, so analyzers match on a
//! variant instead of indexing raw fields.

/// Item-type code stored in fixed parameter 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Note,
    Rest,
    Clef,
    Line,
    Slur,
    Beam,
    Trill,
    Staff,
    Symbol,
    Number,
    User,
    Special,
    BadLiteral,
    Barline,
    ImportedGraphic,
    Text,
    KeySignature,
    TimeSignature,
    Unknown(i32),
}

impl ItemType {
    pub fn from_code(code: f64) -> Self {
        match code as i32 {
            1 => ItemType::Note,
            2 => ItemType::Rest,
            3 => ItemType::Clef,
            4 => ItemType::Line,
            5 => ItemType::Slur,
            6 => ItemType::Beam,
            7 => ItemType::Trill,
            8 => ItemType::Staff,
            9 => ItemType::Symbol,
            10 => ItemType::Number,
            11 => ItemType::User,
            12 => ItemType::Special,
            13 => ItemType::BadLiteral,
            14 => ItemType::Barline,
            15 => ItemType::ImportedGraphic,
            16 => ItemType::Text,
            17 => ItemType::KeySignature,
            18 => ItemType::TimeSignature,
            other => ItemType::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ItemType::Note => 1,
            ItemType::Rest => 2,
            ItemType::Clef => 3,
            ItemType::Line => 4,
            ItemType::Slur => 5,
            ItemType::Beam => 6,
            ItemType::Trill => 7,
            ItemType::Staff => 8,
            ItemType::Symbol => 9,
            ItemType::Number => 10,
            ItemType::User => 11,
            ItemType::Special => 12,
            ItemType::BadLiteral => 13,
            ItemType::Barline => 14,
            ItemType::ImportedGraphic => 15,
            ItemType::Text => 16,
            ItemType::KeySignature => 17,
            ItemType::TimeSignature => 18,
            ItemType::Unknown(code) => code,
        }
    }

    /// Types that carry a byte payload after 13 fixed fields.
    pub fn has_payload(self) -> bool {
        matches!(self, ItemType::Text | ItemType::ImportedGraphic)
    }

    /// Notes and rests: the only types that occupy rhythmic time.
    pub fn is_duration_type(self) -> bool {
        matches!(self, ItemType::Note | ItemType::Rest)
    }
}

/// Written accidental, from the units digit of a note's P5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accidental {
    #[default]
    None,
    Flat,
    Sharp,
    Natural,
    DoubleFlat,
    DoubleSharp,
}

impl Accidental {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Accidental::Flat,
            2 => Accidental::Sharp,
            3 => Accidental::Natural,
            4 => Accidental::DoubleFlat,
            5 => Accidental::DoubleSharp,
            _ => Accidental::None,
        }
    }

    /// Chromatic alteration in semitones, `None` when nothing is written.
    pub fn alteration(self) -> Option<i8> {
        match self {
            Accidental::None => None,
            Accidental::Natural => Some(0),
            Accidental::Flat => Some(-1),
            Accidental::Sharp => Some(1),
            Accidental::DoubleFlat => Some(-2),
            Accidental::DoubleSharp => Some(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StemDirection {
    #[default]
    None,
    Up,
    Down,
}

impl StemDirection {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => StemDirection::Up,
            2 => StemDirection::Down,
            _ => StemDirection::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClefKind {
    Treble,
    Bass,
    Alto,
    Tenor,
    Percussion,
}

/// Clef shape decoded from P5: integer part selects the clef, a `.8` fraction
/// marks a clef sounding an octave lower (e.g. the tenor-voice treble clef).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClefShape {
    pub kind: ClefKind,
    pub octave_down: bool,
    /// Vertical displacement of the clef from its default line (P4).
    pub offset: i32,
}

impl ClefShape {
    pub fn from_fields(p4: f64, p5: f64) -> Self {
        let kind = match p5.trunc() as i64 {
            1 => ClefKind::Bass,
            2 => ClefKind::Alto,
            3 => ClefKind::Tenor,
            4 => ClefKind::Percussion,
            _ => ClefKind::Treble,
        };
        let fraction = (p5 - p5.trunc()).abs();
        Self {
            kind,
            octave_down: (fraction - 0.8).abs() < 0.01,
            offset: p4.round() as i32,
        }
    }

    pub fn treble() -> Self {
        Self { kind: ClefKind::Treble, octave_down: false, offset: 0 }
    }

    /// Vertical position at which this clef places middle C.
    /// Position 3 is the bottom staff line, each step is one diatonic degree.
    pub fn middle_c_position(&self) -> i32 {
        let base = match self.kind {
            ClefKind::Treble | ClefKind::Percussion => 1,
            ClefKind::Bass => 13,
            ClefKind::Alto => 7,
            ClefKind::Tenor => 9,
        };
        let octave = if self.octave_down { 7 } else { 0 };
        base + octave + self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteFields {
    pub staff: usize,
    pub hpos: f64,
    pub vpos: f64,
    pub accidental: Accidental,
    pub editorial: bool,
    pub stem: StemDirection,
    pub duration: f64,
}

/// Typed view of one item, one variant per item-type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemKind {
    Note(NoteFields),
    Rest { staff: usize, hpos: f64, vpos: f64, duration: f64 },
    Clef { staff: usize, hpos: f64, shape: ClefShape },
    Slur { staff: usize, left: f64, right: f64, left_vpos: f64, right_vpos: f64, bracket: bool },
    Beam { staff: usize, left: f64, right: f64, left_vpos: f64, right_vpos: f64 },
    Barline { staff: usize, hpos: f64, height: usize },
    KeySignature { staff: usize, hpos: f64, fifths: i8 },
    TimeSignature { staff: usize, hpos: f64, numerator: f64, denominator: f64 },
    Staff { staff: usize, hpos: f64 },
    Number { staff: usize, hpos: f64, vpos: f64, value: f64 },
    Text { staff: usize, hpos: f64, vpos: f64, graphic: bool },
    Other { item_type: ItemType, staff: usize, hpos: f64 },
}
