//! # Tie and Slur Differentiation
//!
//! Every unbracketed slur is classified as a tie, a slur, or a slur hanging off
//! the left or right edge of its system.
//!
//! ## Cells
//! The notes and rests of a staff are grouped into rhythmic cells by
//! `auto::staffOffset`. A cell's position is the leftmost position of its members.
//!
//! ## Classification
//! 1. An endpoint further than `slur_tolerance` outside the first or last cell
//!    hangs off that side of the system.
//! 2. Each endpoint is matched to the nearest cell; on equal distance the earlier
//!    cell wins.
//! 3. When both endpoints land on one cell there is no span to tie across, so the
//!    slur hangs: left if it starts before the first cell, otherwise right.
//! 4. Otherwise it is a tie iff both ends sit at one height and some note in the
//!    start cell and some note in the end cell share a height and a layer, with
//!    the start note lasting exactly the span between the cells.
//!
//! Ties are written as `auto::tiedNext` / `auto::tiedLast` (file positions of the
//! partner note) and every candidate gets `auto::slurType`. A tied note takes
//! the pitch of the note it is tied from.

use crate::config::AnalysisConfig;
use crate::item::{Item, ItemType, AUTO_NAMESPACE};
use crate::page::{ItemArena, ItemId};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

const EPSILON: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlurKind {
    Tie,
    Slur,
    HangLeft,
    HangRight,
}

impl SlurKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlurKind::Tie => "tie",
            SlurKind::Slur => "slur",
            SlurKind::HangLeft => "hangLeft",
            SlurKind::HangRight => "hangRight",
        }
    }
}

impl fmt::Display for SlurKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tie: the note it starts on, the note it ends on and the slur drawing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieLink {
    pub first: ItemId,
    pub second: ItemId,
    pub slur: ItemId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieAnalysis {
    pub links: Vec<TieLink>,
    pub kinds: Vec<(ItemId, SlurKind)>,
}

struct Cell {
    offset: f64,
    hpos: f64,
    items: Vec<ItemId>,
}

fn build_cells(arena: &ItemArena, items: &[ItemId]) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for &id in items {
        let Some(item) = arena.get(id) else { continue };
        if !item.is_duration_item() {
            continue;
        }
        let offset = item.auto_f64("staffOffset").unwrap_or(0.0);
        match cells.iter_mut().find(|c| (c.offset - offset).abs() < EPSILON) {
            Some(cell) => {
                cell.hpos = cell.hpos.min(item.hpos());
                cell.items.push(id);
            }
            None => cells.push(Cell { offset, hpos: item.hpos(), items: vec![id] }),
        }
    }
    cells.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    cells
}

fn nearest_cell(cells: &[Cell], hpos: f64) -> usize {
    let mut best = 0;
    for (index, cell) in cells.iter().enumerate() {
        if (cell.hpos - hpos).abs() < (cells[best].hpos - hpos).abs() {
            best = index;
        }
    }
    best
}

fn cell_notes<'a>(arena: &'a ItemArena, cell: &Cell) -> Vec<(ItemId, &'a Item)> {
    cell.items
        .iter()
        .filter_map(|&id| arena.get(id).filter(|i| i.is(ItemType::Note)).map(|i| (id, i)))
        .collect()
}

fn find_tie(arena: &ItemArena, start: &Cell, end: &Cell, span: f64) -> Option<(ItemId, ItemId)> {
    let ends = cell_notes(arena, end);
    for (a_id, a) in cell_notes(arena, start) {
        if (a.duration() - span).abs() >= EPSILON {
            continue;
        }
        for &(b_id, b) in &ends {
            if (a.vpos() - b.vpos()).abs() < EPSILON && a.auto("layer") == b.auto("layer") {
                return Some((a_id, b_id));
            }
        }
    }
    None
}

fn classify(arena: &ItemArena, slur: &Item, cells: &[Cell], config: &AnalysisConfig) -> (SlurKind, Option<(ItemId, ItemId)>) {
    let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
        return (SlurKind::Slur, None);
    };
    let (left, right) = (slur.hpos(), slur.right_hpos());
    if left < first.hpos - config.slur_tolerance {
        return (SlurKind::HangLeft, None);
    }
    if right > last.hpos + config.slur_tolerance {
        return (SlurKind::HangRight, None);
    }

    let start = nearest_cell(cells, left);
    let end = nearest_cell(cells, right);
    if start == end {
        let kind = if start == 0 && left < cells[start].hpos { SlurKind::HangLeft } else { SlurKind::HangRight };
        return (kind, None);
    }
    if (slur.vpos() - slur.right_vpos()).abs() >= EPSILON {
        return (SlurKind::Slur, None);
    }
    let span = cells[end].offset - cells[start].offset;
    match find_tie(arena, &cells[start], &cells[end], span) {
        Some(pair) => (SlurKind::Tie, Some(pair)),
        None => (SlurKind::Slur, None),
    }
}

pub fn find_ties(
    arena: &mut ItemArena,
    staves: &BTreeMap<usize, Vec<ItemId>>,
    config: &AnalysisConfig,
) -> TieAnalysis {
    let mut analysis = TieAnalysis::default();
    for (&staff, items) in staves {
        let mut tied = 0usize;
        let cells = build_cells(arena, items);
        let candidates: Vec<ItemId> = items
            .iter()
            .copied()
            .filter(|&id| arena.get(id).is_some_and(|i| i.is(ItemType::Slur) && !i.is_bracket()))
            .collect();

        for slur_id in candidates {
            let Some(slur) = arena.get(slur_id) else { continue };
            let (kind, pair) = classify(arena, slur, &cells, config);
            analysis.kinds.push((slur_id, kind));
            if let Some(slur) = arena.get_mut(slur_id) {
                slur.set_auto("slurType", kind);
            }
            let Some((first, second)) = pair else { continue };
            analysis.links.push(TieLink { first, second, slur: slur_id });

            let inherited: Vec<(&str, String)> = match arena.get(first) {
                Some(note) => ["pitch", "base40"]
                    .into_iter()
                    .filter(|key| note.has_named(AUTO_NAMESPACE, key))
                    .map(|key| (key, note.auto(key).to_string()))
                    .collect(),
                None => continue,
            };
            if let Some(note) = arena.get_mut(first) {
                note.set_auto("tiedNext", second.index());
            }
            if let Some(note) = arena.get_mut(second) {
                note.set_auto("tiedLast", first.index());
                for (key, value) in inherited {
                    note.set_auto(key, value);
                }
            }
            tied += 1;
        }
        debug!(staff = staff, ties = tied, "tie analysis");
    }
    analysis
}
