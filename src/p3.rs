//! # P3 Database
//!
//! Cross-index of one system's items by horizontal position (P3) and by rhythmic
//! offset within the system. Items sharing an exact position form a vertical
//! [`Slice`].
//!
//! ## Keys
//! Both indices key on the exact bit pattern of the value; `+0.0` and `-0.0` share a
//! key. No tolerance is applied, so positions that differ in the last bit are
//! separate slices.
//!
//! ## Preparation
//! Adding items leaves the slice list unsorted. [`P3Database::prepare`] sorts slices
//! by the position of their first item (empty slices first) and relinks the
//! `prev`/`next` chain. Preparing twice in a row does no further work; queries
//! that need order prepare on demand.
//!
//! ## Fallbacks
//! - Offset with no slice: `position_of_offset` returns the right margin.
//! - Position with no slice: `offset_of_position` returns the left margin.

use crate::item::{canonical_bits, Item};
use crate::page::ItemId;
use std::collections::HashMap;

/// Index into [`P3Database::slices`].
pub type SliceId = usize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slice {
    pub position: f64,
    /// Rhythmic offset of the first duration item added, if any.
    pub offset: Option<f64>,
    pub items: Vec<ItemId>,
    pub prev: Option<SliceId>,
    pub next: Option<SliceId>,
}

#[derive(Debug, Clone)]
pub struct P3Database {
    slices: Vec<Slice>,
    by_position: HashMap<u32, SliceId>,
    by_offset: HashMap<u64, SliceId>,
    order: Vec<SliceId>,
    prepared: bool,
    sort_count: usize,
    left_margin: f64,
    right_margin: f64,
}

fn offset_key(offset: f64) -> u64 {
    if offset == 0.0 {
        0
    } else {
        offset.to_bits()
    }
}

impl Default for P3Database {
    fn default() -> Self {
        Self::with_margins(0.0, 200.0)
    }
}

impl P3Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margins(left_margin: f64, right_margin: f64) -> Self {
        Self {
            slices: Vec::new(),
            by_position: HashMap::new(),
            by_offset: HashMap::new(),
            order: Vec::new(),
            prepared: true,
            sort_count: 0,
            left_margin,
            right_margin,
        }
    }

    /// Index `item` by its P3 and, for notes and rests, by `offset`.
    pub fn add_item(&mut self, id: ItemId, item: &Item, offset: Option<f64>) -> SliceId {
        let key = item.hpos_bits();
        let slice_id = match self.by_position.get(&key) {
            Some(&existing) => existing,
            None => {
                let slice_id = self.slices.len();
                self.slices.push(Slice { position: item.hpos(), ..Slice::default() });
                self.by_position.insert(key, slice_id);
                slice_id
            }
        };
        self.slices[slice_id].items.push(id);

        if let (Some(offset), true) = (offset, item.is_duration_item()) {
            let slice = &mut self.slices[slice_id];
            if slice.offset.is_none() {
                slice.offset = Some(offset);
            }
            // The leftmost slice at an offset wins.
            let position = slice.position;
            let slices = &self.slices;
            self.by_offset
                .entry(offset_key(offset))
                .and_modify(|current| {
                    if position < slices[*current].position {
                        *current = slice_id;
                    }
                })
                .or_insert(slice_id);
        }

        self.prepared = false;
        slice_id
    }

    /// Sort slices by position and relink. No-op when already prepared.
    pub fn prepare(&mut self) {
        if self.prepared {
            return;
        }
        let slices = &self.slices;
        let mut order: Vec<SliceId> = (0..slices.len()).collect();
        order.sort_by(|&a, &b| {
            let key = |s: &Slice| s.items.first().map(|_| s.position);
            // None (empty slice) sorts before any position.
            key(&slices[a]).partial_cmp(&key(&slices[b])).unwrap_or(std::cmp::Ordering::Equal)
        });
        for (rank, &slice_id) in order.iter().enumerate() {
            let prev = rank.checked_sub(1).map(|r| order[r]);
            let next = order.get(rank + 1).copied();
            let slice = &mut self.slices[slice_id];
            slice.prev = prev;
            slice.next = next;
        }
        self.order = order;
        self.prepared = true;
        self.sort_count += 1;
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// How many times [`prepare`](Self::prepare) actually sorted.
    pub fn sort_count(&self) -> usize {
        self.sort_count
    }

    pub fn slice(&self, id: SliceId) -> Option<&Slice> {
        self.slices.get(id)
    }

    pub fn slice_at_position(&self, position: f64) -> Option<&Slice> {
        let key = canonical_bits(position as f32);
        self.by_position.get(&key).map(|&id| &self.slices[id])
    }

    pub fn slice_at_offset(&self, offset: f64) -> Option<&Slice> {
        self.by_offset.get(&offset_key(offset)).map(|&id| &self.slices[id])
    }

    pub fn position_of_offset(&self, offset: f64) -> f64 {
        self.slice_at_offset(offset).map_or(self.right_margin, |s| s.position)
    }

    pub fn offset_of_position(&self, position: f64) -> f64 {
        self.slice_at_position(position)
            .and_then(|s| s.offset)
            .unwrap_or(self.left_margin)
    }

    /// Slices in position order.
    pub fn ordered(&mut self) -> impl Iterator<Item = &Slice> {
        self.prepare();
        self.order.iter().map(|&id| &self.slices[id])
    }

    pub fn first(&mut self) -> Option<&Slice> {
        self.prepare();
        self.order.first().map(|&id| &self.slices[id])
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;
    use crate::page::ItemArena;

    fn build() -> (ItemArena, P3Database) {
        let mut arena = ItemArena::new();
        let mut db = P3Database::new();
        for (hpos, offset) in [(30.0, 2.0), (10.0, 0.0), (20.0, 1.0), (10.0, 0.0)] {
            let item = Item::with_params(ItemType::Note, &[1.0, hpos, 3.0, 0.0, 0.0, 1.0]);
            let id = arena.push(item.clone());
            db.add_item(id, &item, Some(offset));
        }
        (arena, db)
    }

    #[test]
    fn test_items_at_one_position_share_a_slice() {
        let (_, db) = build();
        assert_eq!(db.len(), 3);
        assert_eq!(db.slice_at_position(10.0).map(|s| s.items.len()), Some(2));
    }

    #[test]
    fn test_prepare_orders_and_links() {
        let (_, mut db) = build();
        let positions: Vec<f64> = db.ordered().map(|s| s.position).collect();
        assert_eq!(positions, vec![10.0, 20.0, 30.0]);
        let first = db.first().cloned().unwrap();
        assert_eq!(first.prev, None);
        let second = db.slice(first.next.unwrap()).unwrap();
        assert_eq!(second.position, 20.0);
    }

    #[test]
    fn test_prepare_twice_sorts_once() {
        let (_, mut db) = build();
        db.prepare();
        db.prepare();
        assert_eq!(db.sort_count(), 1);
        assert!(db.is_prepared());
    }

    #[test]
    fn test_add_item_clears_prepared() {
        let (mut arena, mut db) = build();
        db.prepare();
        let item = Item::with_params(ItemType::Rest, &[1.0, 5.0]);
        let id = arena.push(item.clone());
        db.add_item(id, &item, Some(0.0));
        assert!(!db.is_prepared());
        assert_eq!(db.ordered().next().map(|s| s.position), Some(5.0));
        assert_eq!(db.sort_count(), 2);
    }

    #[test]
    fn test_offset_lookups_and_fallbacks() {
        let (_, db) = build();
        assert_eq!(db.position_of_offset(1.0), 20.0);
        assert_eq!(db.position_of_offset(7.5), 200.0);
        assert_eq!(db.offset_of_position(30.0), 2.0);
        assert_eq!(db.offset_of_position(99.0), 0.0);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let mut arena = ItemArena::new();
        let mut db = P3Database::new();
        let item = Item::with_params(ItemType::Clef, &[1.0, -0.0]);
        let id = arena.push(item.clone());
        db.add_item(id, &item, None);
        assert!(db.slice_at_position(0.0).is_some());
    }
}
