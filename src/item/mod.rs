//! # Item Model
//!
//! One notational primitive of a SCORE page: a run of numeric *fixed* parameters
//! (P1, P2, ...), an optional text payload and namespaced *named* parameters.
//!
//! ## Fixed Parameters
//! - Indexed from 1; P1 always holds the item-type code.
//! - Writing past the current length grows the run with zeros.
//! - Indices above [`MAX_FIXED`] are rejected with `ScoreError::FieldIndex`.
//! - Trailing zeros carry no meaning and are dropped when the item is written.
//!
//! ## Named Parameters
//! `namespace -> key -> value`. The empty namespace is the global one; analyzers
//! write their results under [`AUTO_NAMESPACE`]. Reading a missing parameter gives
//! an empty string.
//!
//! ## Derived Readers
//! [`Item::kind`] and the small readers (`staff`, `hpos`, `duration`, ...) are the only
//! place that knows which P-field means what for each item type.
//!
//! ## Change Notices
//! Setters return `Some(Change)` when the stored value actually changed. The page's
//! `ItemMut` guard turns those into validity updates; see `page`.

mod history;
mod kind;

pub use history::{EditSession, EditableItem, HistoryEntry, HistoryKind, HistoryTarget, ParameterHistory};
pub use kind::{Accidental, ClefKind, ClefShape, ItemKind, ItemType, NoteFields, StemDirection};

use crate::error::ScoreError;
use std::collections::BTreeMap;

/// Highest fixed parameter index an item may hold.
pub const MAX_FIXED: usize = 100;

/// Fixed field count reserved by text and imported-graphic items.
pub const PAYLOAD_FIXED: usize = 13;

/// Namespace reserved for derived analysis annotations.
pub const AUTO_NAMESPACE: &str = "auto";

/// What a mutating call changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Fixed { index: usize, old: f64, new: f64 },
    Named { namespace: String, key: String },
    Text,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// P1..Pn, stored at `fixed[n - 1]`.
    fixed: Vec<f32>,
    text: Option<String>,
    named: BTreeMap<String, BTreeMap<String, String>>,
}

impl Item {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            fixed: vec![item_type.code() as f32],
            text: None,
            named: BTreeMap::new(),
        }
    }

    /// Build an item from P1..Pn as read from a file.
    pub fn from_fixed(values: Vec<f32>) -> Result<Self, ScoreError> {
        if values.len() > MAX_FIXED {
            return Err(ScoreError::FieldIndex { index: values.len(), max: MAX_FIXED });
        }
        Ok(Self { fixed: values, text: None, named: BTreeMap::new() })
    }

    /// Convenience constructor: type code and P2.. in order.
    pub fn with_params(item_type: ItemType, params: &[f64]) -> Self {
        let mut fixed = Vec::with_capacity(params.len() + 1);
        fixed.push(item_type.code() as f32);
        fixed.extend(params.iter().take(MAX_FIXED - 1).map(|&p| p as f32));
        Self { fixed, text: None, named: BTreeMap::new() }
    }

    // Fixed parameters

    /// Value of P`index`. Absent and out-of-range fields read as 0.
    pub fn fixed(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        self.fixed.get(index - 1).map_or(0.0, |&v| f64::from(v))
    }

    pub fn set_fixed(&mut self, index: usize, value: f64) -> Result<Option<Change>, ScoreError> {
        if index == 0 || index > MAX_FIXED {
            return Err(ScoreError::FieldIndex { index, max: MAX_FIXED });
        }
        if self.fixed.len() < index {
            self.fixed.resize(index, 0.0);
        }
        let old = f64::from(self.fixed[index - 1]);
        let stored = value as f32;
        if self.fixed[index - 1].to_bits() == stored.to_bits() {
            return Ok(None);
        }
        self.fixed[index - 1] = stored;
        Ok(Some(Change::Fixed { index, old, new: f64::from(stored) }))
    }

    /// Number of stored fixed fields, trailing zeros included.
    pub fn fixed_count(&self) -> usize {
        self.fixed.len()
    }

    pub fn fixed_values(&self) -> &[f32] {
        &self.fixed
    }

    /// Fields with trailing zeros dropped, but never fewer than `minimum`.
    /// Payload items always keep their 13 reserved fields.
    pub fn compacted_fixed(&self, minimum: usize) -> Vec<f32> {
        let mut values = self.fixed.clone();
        if self.item_type().has_payload() {
            values.resize(PAYLOAD_FIXED, 0.0);
            return values;
        }
        while values.len() > minimum && values.last() == Some(&0.0) {
            values.pop();
        }
        if values.len() < minimum {
            values.resize(minimum, 0.0);
        }
        values
    }

    // Text payload

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replace the payload and keep P12 (payload length) in step.
    pub fn set_text(&mut self, text: &str) -> Option<Change> {
        if self.text.as_deref() == Some(text) {
            return None;
        }
        let length = text.chars().count();
        if self.fixed.len() < 12 {
            self.fixed.resize(12, 0.0);
        }
        self.fixed[11] = length as f32;
        self.text = Some(text.to_string());
        Some(Change::Text)
    }

    /// Store a payload as read from a file, leaving P12 as the source wrote it.
    pub(crate) fn load_text(&mut self, text: &str) {
        self.text = Some(text.to_string());
    }

    // Named parameters

    /// Value of `namespace::key`, or an empty string.
    pub fn named(&self, namespace: &str, key: &str) -> &str {
        self.named
            .get(namespace)
            .and_then(|params| params.get(key))
            .map_or("", String::as_str)
    }

    pub fn has_named(&self, namespace: &str, key: &str) -> bool {
        self.named.get(namespace).is_some_and(|params| params.contains_key(key))
    }

    pub fn set_named(&mut self, namespace: &str, key: &str, value: &str) -> Option<Change> {
        let params = self.named.entry(namespace.to_string()).or_default();
        if params.get(key).map(String::as_str) == Some(value) {
            return None;
        }
        params.insert(key.to_string(), value.to_string());
        Some(Change::Named { namespace: namespace.to_string(), key: key.to_string() })
    }

    pub fn delete_named(&mut self, namespace: &str, key: &str) -> Option<Change> {
        let params = self.named.get_mut(namespace)?;
        params.remove(key)?;
        if params.is_empty() {
            self.named.remove(namespace);
        }
        Some(Change::Named { namespace: namespace.to_string(), key: key.to_string() })
    }

    /// Drop every parameter in `namespace`.
    pub fn delete_namespace(&mut self, namespace: &str) -> Option<Change> {
        self.named.remove(namespace)?;
        Some(Change::Named { namespace: namespace.to_string(), key: String::new() })
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// Key/value pairs of one namespace in key order.
    pub fn named_params(&self, namespace: &str) -> impl Iterator<Item = (&str, &str)> {
        self.named
            .get(namespace)
            .into_iter()
            .flat_map(|params| params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn auto(&self, key: &str) -> &str {
        self.named(AUTO_NAMESPACE, key)
    }

    /// Numeric `auto` annotation, if present and parseable.
    pub fn auto_f64(&self, key: &str) -> Option<f64> {
        self.auto(key).parse().ok()
    }

    /// Analyzer-side write of a derived annotation.
    pub(crate) fn set_auto(&mut self, key: &str, value: impl ToString) {
        self.set_named(AUTO_NAMESPACE, key, &value.to_string());
    }

    // Derived readers

    pub fn item_type(&self) -> ItemType {
        ItemType::from_code(self.fixed(1))
    }

    pub fn is(&self, item_type: ItemType) -> bool {
        self.item_type() == item_type
    }

    /// Staff number (P2). Non-positive values read as staff 0, which belongs to no staff.
    pub fn staff(&self) -> usize {
        let p2 = self.fixed(2);
        if p2 < 1.0 {
            0
        } else {
            p2 as usize
        }
    }

    /// Horizontal position (P3); the left edge for spanners.
    pub fn hpos(&self) -> f64 {
        self.fixed(3)
    }

    /// Raw P3 bits, used as an exact hash key.
    pub fn hpos_bits(&self) -> u32 {
        self.fixed.get(2).map_or(0, |v| canonical_bits(*v))
    }

    /// Vertical position (P4). For notes the hundreds digit is a ledger-line flag.
    pub fn vpos(&self) -> f64 {
        let p4 = self.fixed(4);
        if self.is(ItemType::Note) {
            if p4 >= 100.0 {
                return p4 - 100.0;
            }
            if p4 <= -100.0 {
                return p4 + 100.0;
            }
        }
        p4
    }

    /// Right horizontal endpoint for slurs, beams and lines (P6); P3 otherwise.
    pub fn right_hpos(&self) -> f64 {
        match self.item_type() {
            ItemType::Slur | ItemType::Beam | ItemType::Line | ItemType::Trill => self.fixed(6),
            _ => self.hpos(),
        }
    }

    /// Right vertical endpoint for slurs and beams (P5).
    pub fn right_vpos(&self) -> f64 {
        match self.item_type() {
            ItemType::Slur | ItemType::Beam => self.fixed(5),
            _ => self.vpos(),
        }
    }

    /// Rhythmic duration in quarter notes (P7) for notes and rests, else 0.
    pub fn duration(&self) -> f64 {
        if self.item_type().is_duration_type() {
            self.fixed(7)
        } else {
            0.0
        }
    }

    pub fn has_duration(&self) -> bool {
        self.duration() > 0.0
    }

    pub fn is_duration_item(&self) -> bool {
        self.item_type().is_duration_type()
    }

    fn p5_digits(&self) -> i64 {
        self.fixed(5).abs().trunc() as i64
    }

    pub fn accidental(&self) -> Accidental {
        if !self.is(ItemType::Note) {
            return Accidental::None;
        }
        Accidental::from_code(self.p5_digits() % 10)
    }

    pub fn stem_direction(&self) -> StemDirection {
        if !self.is(ItemType::Note) {
            return StemDirection::None;
        }
        StemDirection::from_code((self.p5_digits() / 10) % 10)
    }

    /// Editorial (parenthesized) accidental flag, the hundreds digit of a note's P5.
    pub fn has_editorial_accidental(&self) -> bool {
        self.is(ItemType::Note) && (self.p5_digits() / 100) % 10 != 0
    }

    pub fn has_stem(&self) -> bool {
        self.stem_direction() != StemDirection::None
    }

    /// Number of staves a barline spans upward from its own staff.
    pub fn barline_height(&self) -> usize {
        let code = (self.fixed(4).abs().trunc() as usize) % 100;
        code.max(1)
    }

    /// Tuplet-bracket flag of a slur (P9).
    pub fn is_bracket(&self) -> bool {
        self.is(ItemType::Slur) && self.fixed(9) != 0.0
    }

    pub fn kind(&self) -> ItemKind {
        let staff = self.staff();
        let hpos = self.hpos();
        match self.item_type() {
            ItemType::Note => ItemKind::Note(NoteFields {
                staff,
                hpos,
                vpos: self.vpos(),
                accidental: self.accidental(),
                editorial: self.has_editorial_accidental(),
                stem: self.stem_direction(),
                duration: self.duration(),
            }),
            ItemType::Rest => ItemKind::Rest { staff, hpos, vpos: self.vpos(), duration: self.duration() },
            ItemType::Clef => ItemKind::Clef {
                staff,
                hpos,
                shape: ClefShape::from_fields(self.fixed(4), self.fixed(5)),
            },
            ItemType::Slur => ItemKind::Slur {
                staff,
                left: hpos,
                right: self.right_hpos(),
                left_vpos: self.vpos(),
                right_vpos: self.right_vpos(),
                bracket: self.is_bracket(),
            },
            ItemType::Beam => ItemKind::Beam {
                staff,
                left: hpos,
                right: self.right_hpos(),
                left_vpos: self.vpos(),
                right_vpos: self.right_vpos(),
            },
            ItemType::Barline => ItemKind::Barline { staff, hpos, height: self.barline_height() },
            ItemType::KeySignature => ItemKind::KeySignature {
                staff,
                hpos,
                fifths: self.fixed(5).round().clamp(-7.0, 7.0) as i8,
            },
            ItemType::TimeSignature => ItemKind::TimeSignature {
                staff,
                hpos,
                numerator: self.fixed(5),
                denominator: self.fixed(6),
            },
            ItemType::Staff => ItemKind::Staff { staff, hpos },
            ItemType::Number => ItemKind::Number { staff, hpos, vpos: self.vpos(), value: self.fixed(5) },
            ItemType::Text | ItemType::ImportedGraphic => ItemKind::Text {
                staff,
                hpos,
                vpos: self.vpos(),
                graphic: self.is(ItemType::ImportedGraphic),
            },
            other => ItemKind::Other { item_type: other, staff, hpos },
        }
    }
}

/// Bit pattern used as an exact float key. Positive and negative zero share a key.
pub(crate) fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_holds_type_in_p1() {
        let item = Item::new(ItemType::Clef);
        assert_eq!(item.fixed(1), 3.0);
        assert_eq!(item.item_type(), ItemType::Clef);
        assert_eq!(item.fixed_count(), 1);
    }

    #[test]
    fn test_set_fixed_grows_with_zeros() {
        let mut item = Item::new(ItemType::Note);
        let change = item.set_fixed(7, 2.0).unwrap();
        assert_eq!(change, Some(Change::Fixed { index: 7, old: 0.0, new: 2.0 }));
        assert_eq!(item.fixed_count(), 7);
        assert_eq!(item.fixed(5), 0.0);
        assert_eq!(item.duration(), 2.0);
    }

    #[test]
    fn test_set_fixed_same_value_is_not_a_change() {
        let mut item = Item::with_params(ItemType::Note, &[1.0, 10.0]);
        assert_eq!(item.set_fixed(3, 10.0).unwrap(), None);
    }

    #[test]
    fn test_fixed_index_over_cap_is_an_error() {
        let mut item = Item::new(ItemType::Note);
        let err = item.set_fixed(101, 1.0).unwrap_err();
        assert!(matches!(err, ScoreError::FieldIndex { index: 101, .. }));
        assert!(item.set_fixed(0, 1.0).is_err());
        assert_eq!(item.fixed(250), 0.0);
    }

    #[test]
    fn test_compaction_keeps_minimum_three() {
        let item = Item::with_params(ItemType::Barline, &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(item.compacted_fixed(3), vec![14.0, 1.0, 0.0]);
        let item = Item::with_params(ItemType::Note, &[1.0, 10.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(item.compacted_fixed(3).len(), 7);
    }

    #[test]
    fn test_named_defaults_to_empty() {
        let mut item = Item::new(ItemType::Text);
        assert_eq!(item.named("", "missing"), "");
        assert!(!item.has_named("", "missing"));
        assert!(item.set_named("", "color", "red").is_some());
        assert!(item.set_named("", "color", "red").is_none());
        assert_eq!(item.named("", "color"), "red");
        assert!(item.delete_named("", "color").is_some());
        assert!(item.delete_named("", "color").is_none());
    }

    #[test]
    fn test_delete_namespace() {
        let mut item = Item::new(ItemType::Note);
        item.set_named("verovio", "stem", "up");
        item.set_named("verovio", "head", "x");
        item.set_named("", "id", "n1");
        assert!(item.delete_namespace("verovio").is_some());
        assert_eq!(item.namespaces().collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_set_text_updates_length_field() {
        let mut item = Item::new(ItemType::Text);
        item.set_text("Allegro");
        assert_eq!(item.fixed(12), 7.0);
        assert_eq!(item.text(), Some("Allegro"));
    }

    #[test]
    fn test_note_p5_digits() {
        // editorial flag, stem down, sharp
        let item = Item::with_params(ItemType::Note, &[1.0, 10.0, 5.0, 122.0, 0.0, 1.0]);
        assert_eq!(item.accidental(), Accidental::Sharp);
        assert_eq!(item.stem_direction(), StemDirection::Down);
        assert!(item.has_editorial_accidental());
    }

    #[test]
    fn test_note_ledger_flag_is_stripped() {
        let item = Item::with_params(ItemType::Note, &[1.0, 10.0, 103.0]);
        assert_eq!(item.vpos(), 3.0);
        let rest = Item::with_params(ItemType::Rest, &[1.0, 10.0, 103.0]);
        assert_eq!(rest.vpos(), 103.0);
    }

    #[test]
    fn test_barline_height_decoding() {
        assert_eq!(Item::with_params(ItemType::Barline, &[1.0, 10.0, 0.0]).barline_height(), 1);
        assert_eq!(Item::with_params(ItemType::Barline, &[1.0, 10.0, -2.0]).barline_height(), 2);
        assert_eq!(Item::with_params(ItemType::Barline, &[1.0, 10.0, 103.0]).barline_height(), 3);
    }

    #[test]
    fn test_kind_for_slur() {
        let slur = Item::with_params(ItemType::Slur, &[2.0, 10.0, 8.0, 8.0, 30.0]);
        match slur.kind() {
            ItemKind::Slur { staff, left, right, bracket, .. } => {
                assert_eq!(staff, 2);
                assert_eq!(left, 10.0);
                assert_eq!(right, 30.0);
                assert!(!bracket);
            }
            other => panic!("expected slur, got {:?}", other),
        }
    }
}
