//! # Staff Duration Analysis
//!
//! Reconstructs the rhythmic offset of every item on one staff from horizontal
//! position alone, without any voice markup in the source.
//!
//! ## Algorithm
//! A sorted set of *pending* onsets holds the times at which some voice expects
//! its next note. Items are scanned left to right:
//! - A note or rest further right than the active position (by more than
//!   `position_tolerance`) starts a new onset: the smallest pending value is taken
//!   as the current offset (0 when nothing is pending).
//! - Each note or rest is stamped with the current offset. If it has a duration,
//!   its end time (snapped to an integer within `integer_snap`) becomes pending.
//!   A value already pending is not added twice, so two voices ending together
//!   share one onset.
//! - Other items are stamped with the current offset, or with the next pending
//!   onset if they sit past the active position.
//!
//! The staff duration is the smallest value left pending at the end.

use crate::config::AnalysisConfig;
use crate::page::{ItemArena, ItemId};

/// Values closer than this are the same onset.
const ONSET_EPSILON: f64 = 1e-6;

#[derive(Debug, Default)]
struct PendingOnsets {
    values: Vec<f64>,
}

impl PendingOnsets {
    fn insert(&mut self, value: f64) {
        let at = self.values.partition_point(|&v| v < value - ONSET_EPSILON);
        if self.values.get(at).is_some_and(|&v| (v - value).abs() < ONSET_EPSILON) {
            return;
        }
        self.values.insert(at, value);
    }

    fn pop_smallest(&mut self) -> Option<f64> {
        (!self.values.is_empty()).then(|| self.values.remove(0))
    }

    fn smallest(&self) -> Option<f64> {
        self.values.first().copied()
    }
}

fn snap(value: f64, tolerance: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() <= tolerance {
        rounded
    } else {
        value
    }
}

/// Stamp `auto::staffOffset` on `items` (one staff, position order) and return
/// the staff duration.
pub fn analyze_staff(arena: &mut ItemArena, items: &[ItemId], config: &AnalysisConfig) -> f64 {
    let mut pending = PendingOnsets::default();
    let mut current = 0.0;
    let mut active: Option<f64> = None;

    for &id in items {
        let Some(item) = arena.get_mut(id) else { continue };
        let hpos = item.hpos();
        let advanced = active.is_some_and(|a| hpos - a > config.position_tolerance);

        if item.is_duration_item() {
            if advanced {
                current = pending.pop_smallest().unwrap_or(0.0);
            }
            if advanced || active.is_none() {
                active = Some(hpos);
            }
            item.set_auto("staffOffset", current);
            let duration = item.duration();
            if duration > 0.0 {
                pending.insert(snap(current + duration, config.integer_snap));
            }
        } else {
            let offset = if advanced { pending.smallest().unwrap_or(current) } else { current };
            item.set_auto("staffOffset", offset);
        }
    }

    pending.smallest().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, ItemType};

    fn staff(arena: &mut ItemArena, notes: &[(f64, f64)]) -> Vec<ItemId> {
        notes
            .iter()
            .map(|&(hpos, duration)| {
                arena.push(Item::with_params(ItemType::Note, &[1.0, hpos, 3.0, 0.0, 0.0, duration]))
            })
            .collect()
    }

    fn offsets(arena: &ItemArena, ids: &[ItemId]) -> Vec<f64> {
        ids.iter()
            .map(|&id| arena.get(id).and_then(|i| i.auto_f64("staffOffset")).unwrap_or(-1.0))
            .collect()
    }

    #[test]
    fn test_two_voices() {
        let mut arena = ItemArena::new();
        let ids = staff(&mut arena, &[(0.0, 1.0), (0.0, 2.0), (10.0, 1.0), (10.0, 1.0), (20.0, 1.0)]);
        let duration = analyze_staff(&mut arena, &ids, &AnalysisConfig::default());
        assert_eq!(offsets(&arena, &ids), vec![0.0, 0.0, 1.0, 1.0, 2.0]);
        assert_eq!(duration, 3.0);
    }

    #[test]
    fn test_triplet_noise_snaps_to_integer() {
        let mut arena = ItemArena::new();
        let third = 0.333_333_34;
        let ids = staff(&mut arena, &[(0.0, third), (5.0, third), (10.0, third), (15.0, 1.0)]);
        let duration = analyze_staff(&mut arena, &ids, &AnalysisConfig::default());
        assert_eq!(offsets(&arena, &ids)[3], 1.0);
        assert_eq!(duration, 2.0);
    }

    #[test]
    fn test_zero_duration_items_do_not_add_onsets() {
        let mut arena = ItemArena::new();
        let ids = staff(&mut arena, &[(0.0, 2.0), (0.0, 0.0), (10.0, 1.0)]);
        let duration = analyze_staff(&mut arena, &ids, &AnalysisConfig::default());
        assert_eq!(offsets(&arena, &ids), vec![0.0, 0.0, 2.0]);
        assert_eq!(duration, 3.0);
    }

    #[test]
    fn test_trailing_barline_takes_next_onset() {
        let mut arena = ItemArena::new();
        let mut ids = staff(&mut arena, &[(10.0, 4.0)]);
        ids.push(arena.push(Item::with_params(ItemType::Barline, &[1.0, 30.0])));
        analyze_staff(&mut arena, &ids, &AnalysisConfig::default());
        assert_eq!(offsets(&arena, &ids), vec![0.0, 4.0]);
    }

    #[test]
    fn test_empty_staff_has_no_duration() {
        let mut arena = ItemArena::new();
        assert_eq!(analyze_staff(&mut arena, &[], &AnalysisConfig::default()), 0.0);
    }
}
