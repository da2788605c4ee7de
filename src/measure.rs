//! # System Measures
//!
//! Splits one system's position-sorted items into barline-delimited measures.
//!
//! A barline closes the running measure only when that measure already holds a
//! note or rest with duration. A barline met before any duration (a second staff's
//! copy of the same barline, or a double bar) is recorded as an extra end barline of
//! the previous measure and as a start barline of the running one.
//!
//! Offsets come from the `auto::staffOffset` annotation, so the duration pass must
//! have run on the items first.

use crate::item::ItemType;
use crate::page::{ItemArena, ItemId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemMeasure {
    /// Everything between the bounding barlines, barlines excluded.
    pub items: Vec<ItemId>,
    pub start_barlines: Vec<ItemId>,
    pub end_barlines: Vec<ItemId>,
    /// Offset of the measure within its system, in quarter notes.
    pub offset: f64,
    /// Latest end time of any note or rest in the measure, minus `offset`.
    pub duration: f64,
}

impl SystemMeasure {
    fn starting_at(barline: ItemId) -> Self {
        Self { start_barlines: vec![barline], ..Self::default() }
    }

    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }
}

fn finish(measure: &mut SystemMeasure, arena: &ItemArena, previous_end: f64) {
    let mut start = f64::INFINITY;
    let mut end = f64::NEG_INFINITY;
    for item in measure.items.iter().filter_map(|&id| arena.get(id)) {
        if !item.is_duration_item() {
            continue;
        }
        let offset = item.auto_f64("staffOffset").unwrap_or(0.0);
        start = start.min(offset);
        end = end.max(offset + item.duration());
    }
    if start.is_finite() {
        measure.offset = start;
        measure.duration = (end - start).max(0.0);
    } else {
        measure.offset = previous_end;
        measure.duration = 0.0;
    }
}

/// Segment `sorted` (one system, ordered by P3) into measures.
pub fn segment(arena: &ItemArena, sorted: &[ItemId]) -> Vec<SystemMeasure> {
    let mut measures: Vec<SystemMeasure> = Vec::new();
    let mut current = SystemMeasure::default();
    let mut has_duration = false;

    for &id in sorted {
        let Some(item) = arena.get(id) else { continue };
        if !item.is(ItemType::Barline) {
            has_duration |= item.has_duration();
            current.items.push(id);
            continue;
        }

        if has_duration {
            current.end_barlines.push(id);
            let previous_end = measures.last().map_or(0.0, SystemMeasure::end);
            finish(&mut current, arena, previous_end);
            measures.push(std::mem::replace(&mut current, SystemMeasure::starting_at(id)));
            has_duration = false;
        } else {
            if let Some(previous) = measures.last_mut() {
                if !previous.end_barlines.contains(&id) {
                    previous.end_barlines.push(id);
                }
            }
            current.start_barlines.push(id);
        }
    }

    // A closing run of barlines with nothing after it is not a measure.
    if !current.items.is_empty() {
        let previous_end = measures.last().map_or(0.0, SystemMeasure::end);
        finish(&mut current, arena, previous_end);
        measures.push(current);
    }
    measures
}
