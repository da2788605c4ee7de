//! Item storage for one page.
//!
//! Items live in a `Vec` in file order. An [`ItemId`] is the slot index plus the
//! arena generation at the time it was issued; clearing the arena bumps the
//! generation, so ids from before the clear no longer resolve.

use crate::item::{Item, AUTO_NAMESPACE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    index: u32,
    generation: u32,
}

impl ItemId {
    /// Position of the item in file order.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemArena {
    items: Vec<Item>,
    generation: u32,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) -> ItemId {
        let id = ItemId { index: self.items.len() as u32, generation: self.generation };
        self.items.push(item);
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        if id.generation != self.generation {
            return None;
        }
        self.items.get(id.index())
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        if id.generation != self.generation {
            return None;
        }
        self.items.get_mut(id.index())
    }

    /// Id of the item at file position `index`.
    pub fn id_at(&self, index: usize) -> Option<ItemId> {
        (index < self.items.len()).then(|| ItemId { index: index as u32, generation: self.generation })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.items.len()).map(move |i| ItemId { index: i as u32, generation: self.generation })
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &Item)> + '_ {
        self.ids().zip(self.items.iter())
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Drop the `auto` annotations named in `keys` from every item.
    pub fn clear_auto(&mut self, keys: &[&str]) {
        for item in &mut self.items {
            for key in keys {
                item.delete_named(AUTO_NAMESPACE, key);
            }
        }
    }

    /// Horizontal position of `id`, 0 for a stale id.
    pub fn hpos(&self, id: ItemId) -> f64 {
        self.get(id).map_or(0.0, Item::hpos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;

    #[test]
    fn test_ids_follow_file_order() {
        let mut arena = ItemArena::new();
        let a = arena.push(Item::new(ItemType::Staff));
        let b = arena.push(Item::new(ItemType::Clef));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.id_at(1), Some(b));
        assert_eq!(arena.id_at(2), None);
    }

    #[test]
    fn test_clear_invalidates_old_ids() {
        let mut arena = ItemArena::new();
        let old = arena.push(Item::new(ItemType::Staff));
        arena.clear();
        let new = arena.push(Item::new(ItemType::Note));
        assert_eq!(old.index(), new.index());
        assert!(arena.get(old).is_none());
        assert_eq!(arena.get(new).map(Item::item_type), Some(ItemType::Note));
    }
}
