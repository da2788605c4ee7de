//! Chord linking: notes stacked at one horizontal position on one staff.
//!
//! Notes within `chord_tolerance` of the first note of a run share a position.
//! Each stem-bearing note in the run heads its own chord, so two voices meeting
//! at one position stay apart. A stemless note joins the stemmed note whose stem
//! side it lies on, the nearest one vertically when several qualify and the
//! nearest overall when none does. A run with no stemmed note is one chord headed
//! by its first note. Chords need two notes, and heads are marked `auto::chordHead`.

use crate::config::AnalysisConfig;
use crate::grouping::ChordDatabase;
use crate::item::{ItemType, StemDirection};
use crate::page::{ItemArena, ItemId};
use std::collections::BTreeMap;

/// Whether a note at `vpos` sits on the stem side of a stemmed note.
fn on_stem_side(stem: StemDirection, head_vpos: f64, vpos: f64) -> bool {
    match stem {
        StemDirection::Up => vpos >= head_vpos,
        StemDirection::Down => vpos <= head_vpos,
        StemDirection::None => true,
    }
}

fn owner_of(arena: &ItemArena, heads: &[ItemId], id: ItemId) -> usize {
    let vpos = arena.get(id).map_or(0.0, |item| item.vpos());
    let gap = |head: ItemId| arena.get(head).map_or(f64::INFINITY, |h| (h.vpos() - vpos).abs());
    let sided = |head: ItemId| {
        arena
            .get(head)
            .is_some_and(|h| on_stem_side(h.stem_direction(), h.vpos(), vpos))
    };
    let nearest = |keep: &dyn Fn(ItemId) -> bool| {
        heads
            .iter()
            .enumerate()
            .filter(|&(_, &head)| keep(head))
            .min_by(|&(_, &a), &(_, &b)| gap(a).total_cmp(&gap(b)))
            .map(|(index, _)| index)
    };
    nearest(&sided).or_else(|| nearest(&|_| true)).unwrap_or(0)
}

fn link_cluster(arena: &ItemArena, cluster: &[ItemId], chords: &mut ChordDatabase) {
    if cluster.len() < 2 {
        return;
    }
    let mut heads: Vec<ItemId> = cluster
        .iter()
        .copied()
        .filter(|&id| arena.get(id).is_some_and(|item| item.has_stem()))
        .collect();
    if heads.is_empty() {
        heads.push(cluster[0]);
    }
    let mut members: Vec<Vec<ItemId>> = vec![Vec::new(); heads.len()];
    for &id in cluster.iter().filter(|id| !heads.contains(id)) {
        members[owner_of(arena, &heads, id)].push(id);
    }
    for (&head, others) in heads.iter().zip(&members) {
        for &other in others {
            chords.link_items(arena, head, other);
        }
    }
}

pub fn link_chords(
    arena: &mut ItemArena,
    staves: &BTreeMap<usize, Vec<ItemId>>,
    config: &AnalysisConfig,
    chords: &mut ChordDatabase,
) {
    for items in staves.values() {
        let mut cluster: Vec<ItemId> = Vec::new();
        let mut start = 0.0;
        for &id in items {
            let Some(item) = arena.get(id) else { continue };
            if !item.is(ItemType::Note) {
                continue;
            }
            let hpos = item.hpos();
            if cluster.is_empty() || hpos - start > config.chord_tolerance {
                link_cluster(arena, &cluster, chords);
                cluster.clear();
                start = hpos;
            }
            cluster.push(id);
        }
        link_cluster(arena, &cluster, chords);
    }

    let heads: Vec<ItemId> = chords.groups().filter_map(|(_, group)| group.head()).collect();
    for head in heads {
        if let Some(item) = arena.get_mut(head) {
            item.set_auto("chordHead", "true");
        }
    }
}
