//! Tuplet linking.
//!
//! Two shapes mark a tuplet on a staff:
//! - A bracket (a slur with P9 set) over the notes. The bracket collects the notes
//!   and rests under it, and a number inside its span joins the same group.
//! - A bare number of 2 or more inside the span of a beam group. The number
//!   collects that group's notes.

use crate::config::AnalysisConfig;
use crate::grouping::{BeamDatabase, Group, TupletDatabase};
use crate::item::{Item, ItemType};
use crate::page::{ItemArena, ItemId};
use std::collections::BTreeMap;

fn span_contains(left: f64, right: f64, hpos: f64, tolerance: f64) -> bool {
    hpos >= left.min(right) - tolerance && hpos <= left.max(right) + tolerance
}

/// Leftmost and rightmost beam ends of a beam group.
fn beam_span(arena: &ItemArena, group: &Group) -> Option<(f64, f64)> {
    group.connectors.iter().filter_map(|&id| arena.get(id)).fold(None, |span, beam| {
        let (left, right) = (beam.hpos().min(beam.right_hpos()), beam.hpos().max(beam.right_hpos()));
        Some(span.map_or((left, right), |(l, r): (f64, f64)| (l.min(left), r.max(right))))
    })
}

fn is_tuplet_number(item: &Item) -> bool {
    item.is(ItemType::Number) && item.fixed(5) >= 2.0
}

pub fn link_tuplets(
    arena: &ItemArena,
    staves: &BTreeMap<usize, Vec<ItemId>>,
    beams: &BeamDatabase,
    config: &AnalysisConfig,
    tuplets: &mut TupletDatabase,
) {
    let tolerance = config.beam_tolerance;
    for items in staves.values() {
        let brackets: Vec<ItemId> = items
            .iter()
            .copied()
            .filter(|&id| arena.get(id).is_some_and(Item::is_bracket))
            .collect();

        for &bracket_id in &brackets {
            let Some(bracket) = arena.get(bracket_id) else { continue };
            let (left, right) = (bracket.hpos(), bracket.right_hpos());
            for &id in items {
                let Some(item) = arena.get(id) else { continue };
                if item.is_duration_item() && span_contains(left, right, item.hpos(), tolerance) {
                    tuplets.link_items(arena, bracket_id, id);
                }
            }
        }

        for &number_id in items {
            let Some(number) = arena.get(number_id) else { continue };
            if !is_tuplet_number(number) {
                continue;
            }
            let hpos = number.hpos();
            let bracket = brackets.iter().copied().find(|&id| {
                arena
                    .get(id)
                    .is_some_and(|b| span_contains(b.hpos(), b.right_hpos(), hpos, tolerance))
            });
            if let Some(bracket_id) = bracket {
                tuplets.link_items(arena, bracket_id, number_id);
                continue;
            }

            let beam_group = beams.groups().map(|(_, group)| group).find(|group| {
                let same_staff = group.head().and_then(|id| arena.get(id)).is_some_and(|i| i.staff() == number.staff());
                same_staff && beam_span(arena, group).is_some_and(|(l, r)| span_contains(l, r, hpos, tolerance))
            });
            if let Some(group) = beam_group {
                for &id in &group.items {
                    tuplets.link_items(arena, number_id, id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::beams::link_beams;
    use crate::analysis::staves::{partition, sorted_ids};
    use crate::grouping::ChordDatabase;

    fn eighths(arena: &mut ItemArena, positions: &[f64]) -> Vec<ItemId> {
        positions
            .iter()
            .map(|&hpos| arena.push(Item::with_params(ItemType::Note, &[1.0, hpos, 4.0, 10.0, 0.0, 0.333_333])))
            .collect()
    }

    fn run(arena: &ItemArena) -> (BeamDatabase, TupletDatabase) {
        let config = AnalysisConfig::default();
        let staves = partition(arena, &sorted_ids(arena), &config).unwrap();
        let mut beams = BeamDatabase::new();
        link_beams(arena, &staves, &ChordDatabase::new(), &config, &mut beams);
        let mut tuplets = TupletDatabase::new();
        link_tuplets(arena, &staves, &beams, &config, &mut tuplets);
        (beams, tuplets)
    }

    #[test]
    fn test_bracket_collects_notes_and_number() {
        let mut arena = ItemArena::new();
        let notes = eighths(&mut arena, &[10.0, 15.0, 20.0]);
        let bracket = arena.push(Item::with_params(
            ItemType::Slur,
            &[1.0, 10.0, 12.0, 12.0, 20.0, 0.0, 0.0, 1.0],
        ));
        let number = arena.push(Item::with_params(ItemType::Number, &[1.0, 15.0, 13.0, 3.0]));
        let (_, tuplets) = run(&arena);
        let group = tuplets.group_of(notes[1]).unwrap();
        assert_eq!(group.items, notes);
        assert_eq!(group.connectors, vec![bracket, number]);
    }

    #[test]
    fn test_number_over_beam_group() {
        let mut arena = ItemArena::new();
        let notes = eighths(&mut arena, &[10.0, 15.0, 20.0]);
        arena.push(Item::with_params(ItemType::Beam, &[1.0, 11.0, 12.0, 12.0, 21.0]));
        let number = arena.push(Item::with_params(ItemType::Number, &[1.0, 16.0, 13.0, 3.0]));
        let (beams, tuplets) = run(&arena);
        assert_eq!(beams.len(), 1);
        let group = tuplets.group_of(number).unwrap();
        assert_eq!(group.items, notes);
        assert_eq!(group.connectors, vec![number]);
    }

    #[test]
    fn test_small_numbers_are_ignored() {
        let mut arena = ItemArena::new();
        eighths(&mut arena, &[10.0, 15.0]);
        arena.push(Item::with_params(ItemType::Beam, &[1.0, 11.0, 12.0, 12.0, 16.0]));
        let number = arena.push(Item::with_params(ItemType::Number, &[1.0, 12.0, 13.0, 1.0]));
        let (_, tuplets) = run(&arena);
        assert!(tuplets.is_empty());
        assert!(tuplets.lookup(number).is_none());
    }
}
