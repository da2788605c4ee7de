//! Layer assignment.
//!
//! A staff is polyphonic when some note or rest starts strictly inside the
//! sounding span of another. On a polyphonic staff stem-down notes go to layer 2
//! and everything else to layer 1; on any other staff every note and rest is
//! layer 1. The result is written as `auto::layer`.

use crate::item::StemDirection;
use crate::page::{ItemArena, ItemId};
use std::collections::BTreeMap;

const EPSILON: f64 = 1e-6;

fn is_polyphonic(arena: &ItemArena, items: &[ItemId]) -> bool {
    let mut spans: Vec<(f64, f64)> = items
        .iter()
        .filter_map(|&id| arena.get(id))
        .filter(|item| item.has_duration())
        .map(|item| {
            let start = item.auto_f64("staffOffset").unwrap_or(0.0);
            (start, start + item.duration())
        })
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Latest end among spans that start strictly before the current one.
    let mut reach = f64::NEG_INFINITY;
    let mut earlier = 0;
    for &(start, _) in &spans {
        while earlier < spans.len() && spans[earlier].0 < start - EPSILON {
            reach = reach.max(spans[earlier].1);
            earlier += 1;
        }
        if start < reach - EPSILON {
            return true;
        }
    }
    false
}

pub fn assign_layers(arena: &mut ItemArena, staves: &BTreeMap<usize, Vec<ItemId>>) {
    for items in staves.values() {
        let polyphonic = is_polyphonic(arena, items);
        for &id in items {
            let Some(item) = arena.get_mut(id) else { continue };
            if !item.is_duration_item() {
                continue;
            }
            let layer = if polyphonic && item.stem_direction() == StemDirection::Down { 2 } else { 1 };
            item.set_auto("layer", layer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::duration::analyze_staff;
    use crate::config::AnalysisConfig;
    use crate::item::{Item, ItemType};

    fn staff(notes: &[(f64, f64, f64)]) -> (ItemArena, BTreeMap<usize, Vec<ItemId>>) {
        let mut arena = ItemArena::new();
        let ids: Vec<ItemId> = notes
            .iter()
            .map(|&(hpos, p5, duration)| {
                arena.push(Item::with_params(ItemType::Note, &[1.0, hpos, 3.0, p5, 0.0, duration]))
            })
            .collect();
        analyze_staff(&mut arena, &ids, &AnalysisConfig::default());
        (arena, BTreeMap::from([(1, ids)]))
    }

    fn layers(arena: &ItemArena) -> Vec<String> {
        arena.items().iter().map(|i| i.auto("layer").to_string()).collect()
    }

    #[test]
    fn test_two_voices_split_by_stem() {
        let (mut arena, staves) = staff(&[(0.0, 10.0, 1.0), (0.0, 20.0, 2.0), (10.0, 10.0, 1.0), (20.0, 10.0, 1.0)]);
        assign_layers(&mut arena, &staves);
        assert_eq!(layers(&arena), vec!["1", "2", "1", "1"]);
    }

    #[test]
    fn test_monophonic_stem_down_stays_in_layer_one() {
        let (mut arena, staves) = staff(&[(0.0, 20.0, 1.0), (10.0, 20.0, 1.0), (10.0, 20.0, 1.0)]);
        assign_layers(&mut arena, &staves);
        assert_eq!(layers(&arena), vec!["1", "1", "1"]);
    }
}
