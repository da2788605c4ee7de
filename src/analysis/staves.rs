//! Position ordering and the per-staff partition.

use crate::config::AnalysisConfig;
use crate::error::ScoreError;
use crate::page::{ItemArena, ItemId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Sort by P3, file order breaking ties.
pub fn sort_by_position(arena: &ItemArena, ids: &mut [ItemId]) {
    ids.sort_by(|&a, &b| {
        arena
            .hpos(a)
            .partial_cmp(&arena.hpos(b))
            .unwrap_or(Ordering::Equal)
            .then(a.index().cmp(&b.index()))
    });
}

/// Every item of the page in position order.
pub fn sorted_ids(arena: &ItemArena) -> Vec<ItemId> {
    let mut ids: Vec<ItemId> = arena.ids().collect();
    sort_by_position(arena, &mut ids);
    ids
}

/// Split position-sorted items by staff. Staff 0 belongs to no staff and is left out.
pub fn partition(
    arena: &ItemArena,
    sorted: &[ItemId],
    config: &AnalysisConfig,
) -> Result<BTreeMap<usize, Vec<ItemId>>, ScoreError> {
    let mut staves: BTreeMap<usize, Vec<ItemId>> = BTreeMap::new();
    let mut unassigned = 0usize;
    for &id in sorted {
        let Some(item) = arena.get(id) else { continue };
        let staff = item.staff();
        if staff == 0 {
            unassigned += 1;
            continue;
        }
        if staff > config.max_staff {
            return Err(ScoreError::StaffRange { staff, max: config.max_staff });
        }
        staves.entry(staff).or_default().push(id);
    }
    if unassigned > 0 {
        debug!(count = unassigned, "items without a staff left out of partition");
    }
    Ok(staves)
}
