//! # System Grouping
//!
//! Staves joined by barlines form a system. A barline on staff `p2` with height
//! `h` joins staves `p2 ..= p2 + h - 1`; unions are transitive and may pass through
//! staff numbers that hold no items.
//!
//! ## Numbering
//! - Systems are numbered from the top of the page: system 0 holds the highest
//!   staff number.
//! - Inside a system, staff index 0 is the lowest staff number (the bottom staff).
//!
//! Both numbers are written to every staff item as `auto::systemIndex` and
//! `auto::staffIndex`.

use super::staves::sort_by_position;
use crate::item::ItemType;
use crate::page::{ItemArena, ItemId};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemInfo {
    /// Staff numbers, lowest first.
    pub staves: Vec<usize>,
    /// All items of the system in position order.
    pub items: Vec<ItemId>,
}

impl SystemInfo {
    pub fn staff_index(&self, staff: usize) -> Option<usize> {
        self.staves.iter().position(|&s| s == staff)
    }

    pub fn top_staff(&self) -> usize {
        self.staves.last().copied().unwrap_or(0)
    }
}

/// Union-find over staff numbers. The root of a set is its first-seen staff.
struct StaffSets {
    parent: Vec<usize>,
    seen: Vec<Option<usize>>,
    counter: usize,
}

impl StaffSets {
    fn new(max_staff: usize) -> Self {
        Self { parent: (0..=max_staff).collect(), seen: vec![None; max_staff + 1], counter: 0 }
    }

    fn touch(&mut self, staff: usize) {
        if self.seen[staff].is_none() {
            self.seen[staff] = Some(self.counter);
            self.counter += 1;
        }
    }

    fn find(&mut self, staff: usize) -> usize {
        let mut root = staff;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = staff;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        self.touch(a);
        self.touch(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.seen[ra] <= self.seen[rb] {
            self.parent[rb] = ra;
        } else {
            self.parent[ra] = rb;
        }
    }
}

/// Group the staves of `staves` into systems and annotate their items.
pub fn group(arena: &mut ItemArena, staves: &BTreeMap<usize, Vec<ItemId>>, max_staff: usize) -> Vec<SystemInfo> {
    let mut sets = StaffSets::new(max_staff);
    for items in staves.values() {
        for &id in items {
            let Some(item) = arena.get(id) else { continue };
            if !item.is(ItemType::Barline) {
                continue;
            }
            let bottom = item.staff();
            let reach = bottom + item.barline_height() - 1;
            if reach > max_staff {
                warn!(staff = bottom, reach, "barline reaches past the last staff");
            }
            let top = reach.min(max_staff);
            for staff in bottom..=top {
                sets.union(bottom, staff);
            }
        }
    }

    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for &staff in staves.keys() {
        let root = sets.find(staff);
        by_root.entry(root).or_default().push(staff);
    }
    let mut members: Vec<Vec<usize>> = by_root.into_values().collect();
    members.sort_by(|a, b| b.last().cmp(&a.last()));

    let mut systems = Vec::with_capacity(members.len());
    for (system_index, system_staves) in members.into_iter().enumerate() {
        let mut items = Vec::new();
        for (staff_index, staff) in system_staves.iter().enumerate() {
            let Some(staff_items) = staves.get(staff) else { continue };
            for &id in staff_items {
                if let Some(item) = arena.get_mut(id) {
                    item.set_auto("systemIndex", system_index);
                    item.set_auto("staffIndex", staff_index);
                }
            }
            items.extend_from_slice(staff_items);
        }
        sort_by_position(arena, &mut items);
        systems.push(SystemInfo { staves: system_staves, items });
    }
    systems
}
