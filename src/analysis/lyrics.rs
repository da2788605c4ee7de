//! Lyric linking: a text item below its staff (P4 < 1) attaches to the nearest
//! note of that staff within `lyric_tolerance`.

use crate::config::AnalysisConfig;
use crate::grouping::LyricsDatabase;
use crate::item::ItemType;
use crate::page::{ItemArena, ItemId};
use std::collections::BTreeMap;

pub fn link_lyrics(
    arena: &ItemArena,
    staves: &BTreeMap<usize, Vec<ItemId>>,
    config: &AnalysisConfig,
    lyrics: &mut LyricsDatabase,
) {
    for items in staves.values() {
        let notes: Vec<(ItemId, f64)> = items
            .iter()
            .filter_map(|&id| arena.get(id).filter(|i| i.is(ItemType::Note)).map(|i| (id, i.hpos())))
            .collect();
        for &id in items {
            let Some(text) = arena.get(id) else { continue };
            if !text.is(ItemType::Text) || text.vpos() >= 1.0 {
                continue;
            }
            let hpos = text.hpos();
            let nearest = notes
                .iter()
                .map(|&(note, position)| (note, (position - hpos).abs()))
                .filter(|&(_, distance)| distance <= config.lyric_tolerance)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((note, _)) = nearest {
                lyrics.link_items(arena, note, id);
            }
        }
    }
}
