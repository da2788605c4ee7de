//! Beam linking.
//!
//! Every beam collects the notes and rests of its staff whose position lies under
//! it, `beam_tolerance` of slack included at both ends. Within a chord only the
//! head joins. A stemmed note joins only a beam on its stem side, so the beams of
//! two voices sharing positions stay apart. A secondary beam over the same notes
//! joins the primary beam's group.

use crate::config::AnalysisConfig;
use crate::grouping::{BeamDatabase, ChordDatabase};
use crate::item::{Item, ItemType, StemDirection};
use crate::page::{ItemArena, ItemId};
use std::collections::BTreeMap;

/// Whether `beam` lies on the stem side of `item`. Stemless items fit any beam.
fn faces_beam(item: &Item, beam: &Item) -> bool {
    let level = (beam.vpos() + beam.right_vpos()) / 2.0;
    match item.stem_direction() {
        StemDirection::Up => level >= item.vpos(),
        StemDirection::Down => level <= item.vpos(),
        StemDirection::None => true,
    }
}

pub fn link_beams(
    arena: &ItemArena,
    staves: &BTreeMap<usize, Vec<ItemId>>,
    chords: &ChordDatabase,
    config: &AnalysisConfig,
    beams: &mut BeamDatabase,
) {
    for items in staves.values() {
        for &beam_id in items {
            let Some(beam) = arena.get(beam_id) else { continue };
            if !beam.is(ItemType::Beam) {
                continue;
            }
            let left = beam.hpos().min(beam.right_hpos()) - config.beam_tolerance;
            let right = beam.hpos().max(beam.right_hpos()) + config.beam_tolerance;
            for &id in items {
                let Some(item) = arena.get(id) else { continue };
                if !item.is_duration_item() || item.hpos() < left || item.hpos() > right || !faces_beam(item, beam) {
                    continue;
                }
                let represents_chord = chords.group_of(id).map_or(true, |chord| chord.head() == Some(id));
                if represents_chord {
                    beams.link_items(arena, beam_id, id);
                }
            }
        }
    }
}
