//! # Pitch Spelling
//!
//! Walks each system left to right and assigns a base-40 pitch to every note.
//!
//! ## State Per Staff
//! - Middle-C position: treble at the start of each system, then set by clefs.
//! - Key baseline: the alteration of each diatonic class, set by key signatures.
//! - Live accidentals: one alteration per diatonic slot. Reset to the key baseline
//!   by every barline covering the staff and by a key signature.
//!
//! ## Notes
//! A note without an accidental takes the live alteration of its slot. A written
//! accidental wins, and is flagged `auto::cautionary` when it only restates what
//! the live state already implied. Editorial accidentals do not change the live
//! state.
//!
//! Results go to `auto::base40` (numeric) and `auto::pitch` (e.g. `F#4`).

use super::systems::SystemInfo;
use crate::item::{ClefShape, ItemKind, AUTO_NAMESPACE};
use crate::page::ItemArena;
use crate::pitch::{diatonic_index, key_alterations, Base40, DIATONIC_SLOTS};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct StaffState {
    middle_c: i32,
    key: [i8; 7],
    live: [i8; DIATONIC_SLOTS],
}

impl Default for StaffState {
    fn default() -> Self {
        Self {
            middle_c: ClefShape::treble().middle_c_position(),
            key: [0; 7],
            live: [0; DIATONIC_SLOTS],
        }
    }
}

impl StaffState {
    fn reset_accidentals(&mut self) {
        for (slot, alteration) in self.live.iter_mut().enumerate() {
            *alteration = self.key[slot % 7];
        }
    }
}

pub fn spell_systems(arena: &mut ItemArena, systems: &[SystemInfo]) {
    for system in systems {
        let mut states: HashMap<usize, StaffState> =
            system.staves.iter().map(|&staff| (staff, StaffState::default())).collect();

        for &id in &system.items {
            let Some(item) = arena.get_mut(id) else { continue };
            match item.kind() {
                ItemKind::Clef { staff, shape, .. } => {
                    if let Some(state) = states.get_mut(&staff) {
                        state.middle_c = shape.middle_c_position();
                    }
                }
                ItemKind::KeySignature { staff, fifths, .. } => {
                    if let Some(state) = states.get_mut(&staff) {
                        state.key = key_alterations(fifths);
                        state.reset_accidentals();
                    }
                }
                ItemKind::Barline { staff, height, .. } => {
                    for covered in staff..staff + height {
                        if let Some(state) = states.get_mut(&covered) {
                            state.reset_accidentals();
                        }
                    }
                }
                ItemKind::Note(note) => {
                    let Some(state) = states.get_mut(&note.staff) else { continue };
                    let slot = diatonic_index(note.vpos, state.middle_c);
                    let implied = state.live[slot];
                    let (alteration, cautionary) = match note.accidental.alteration() {
                        Some(written) => (written, written == implied),
                        None => (implied, false),
                    };
                    if !note.editorial {
                        state.live[slot] = alteration;
                    }
                    let pitch = Base40::from_diatonic(slot, alteration);
                    item.set_auto("base40", pitch.value());
                    item.set_auto("pitch", pitch.name());
                    if cautionary {
                        item.set_auto("cautionary", "true");
                    } else {
                        item.delete_named(AUTO_NAMESPACE, "cautionary");
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::staves::{partition, sorted_ids};
    use crate::analysis::systems::group;
    use crate::config::AnalysisConfig;
    use crate::item::{Item, ItemType};
    use crate::page::ItemId;

    fn spell(items: Vec<Item>) -> (ItemArena, Vec<ItemId>) {
        let mut arena = ItemArena::new();
        let ids: Vec<ItemId> = items.into_iter().map(|item| arena.push(item)).collect();
        let staves = partition(&arena, &sorted_ids(&arena), &AnalysisConfig::default()).unwrap();
        let systems = group(&mut arena, &staves, 100);
        spell_systems(&mut arena, &systems);
        (arena, ids)
    }

    fn note(hpos: f64, vpos: f64, p5: f64) -> Item {
        Item::with_params(ItemType::Note, &[1.0, hpos, vpos, p5, 0.0, 1.0])
    }

    fn pitch(arena: &ItemArena, id: ItemId) -> String {
        arena.get(id).map(|i| i.auto("pitch").to_string()).unwrap_or_default()
    }

    #[test]
    fn test_accidental_carries_through_measure() {
        let (arena, ids) = spell(vec![
            note(10.0, 3.0, 2.0),
            note(20.0, 3.0, 0.0),
            Item::with_params(ItemType::Barline, &[1.0, 30.0]),
            note(40.0, 3.0, 0.0),
        ]);
        assert_eq!(pitch(&arena, ids[0]), "E#4");
        assert_eq!(pitch(&arena, ids[1]), "E#4");
        assert_eq!(pitch(&arena, ids[3]), "E4");
    }

    #[test]
    fn test_bass_clef_moves_middle_c() {
        let (arena, ids) = spell(vec![
            Item::with_params(ItemType::Clef, &[1.0, 2.0, 0.0, 1.0]),
            note(10.0, 13.0, 0.0),
        ]);
        assert_eq!(pitch(&arena, ids[1]), "C4");
        assert_eq!(arena.get(ids[1]).unwrap().auto("base40"), "162");
    }

    #[test]
    fn test_key_signature_and_cautionary() {
        let (arena, ids) = spell(vec![
            Item::with_params(ItemType::KeySignature, &[1.0, 5.0, 0.0, 1.0]),
            // F5 on the top line: sharp from the key
            note(10.0, 11.0, 0.0),
            // written sharp that the key already implies
            note(20.0, 11.0, 2.0),
            note(30.0, 11.0, 3.0),
        ]);
        assert_eq!(pitch(&arena, ids[1]), "F#5");
        assert_eq!(arena.get(ids[2]).unwrap().auto("cautionary"), "true");
        assert!(!arena.get(ids[1]).unwrap().has_named("auto", "cautionary"));
        assert_eq!(pitch(&arena, ids[3]), "F5");
    }

    #[test]
    fn test_editorial_accidental_leaves_state() {
        let (arena, ids) = spell(vec![note(10.0, 3.0, 101.0), note(20.0, 3.0, 0.0)]);
        assert_eq!(pitch(&arena, ids[0]), "Eb4");
        assert_eq!(pitch(&arena, ids[1]), "E4");
    }

    #[test]
    fn test_octave_treble_clef() {
        let (arena, ids) = spell(vec![
            Item::with_params(ItemType::Clef, &[1.0, 2.0, 0.0, 0.8]),
            note(10.0, 3.0, 0.0),
        ]);
        assert_eq!(pitch(&arena, ids[1]), "E3");
    }
}
