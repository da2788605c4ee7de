//! # Grouping Databases
//!
//! Chords, beams, tuplets and lyrics are all built the same way: analyzers call
//! [`GroupingDatabase::link_items`] on pairs of items, and the database merges them
//! into shared groups. Each item belongs to at most one group per database.
//!
//! ## Linking Rules
//! - Neither item grouped: a new group holds both.
//! - One item grouped: the other joins that group.
//! - Both grouped: nothing changes and `a`'s group is returned. Two existing
//!   groups are never merged.
//!
//! ## Ordering Policies
//! - [`ChordLinks`] / [`LyricsLinks`]: the head item (stem-bearing note for chords,
//!   the note for lyrics) goes to the front, others keep insertion order at the back.
//! - [`BeamLinks`] / [`TupletLinks`]: connectors (beams, brackets, numbers) and
//!   notes/rests go to separate lists, each kept sorted by horizontal position.

use crate::item::{Item, ItemType};
use crate::page::{ItemArena, ItemId};
use std::collections::HashMap;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    /// Grouped notes/rests (or chord members, or note + syllables).
    pub items: Vec<ItemId>,
    /// Beams or tuplet brackets/numbers; empty for chords and lyrics.
    pub connectors: Vec<ItemId>,
}

impl Group {
    /// First item: the chord head, or the note carrying the lyrics.
    pub fn head(&self) -> Option<ItemId> {
        self.items.first().copied()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains(&id) || self.connectors.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len() + self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.connectors.is_empty()
    }
}

/// Where a newly linked item goes inside its group.
pub trait LinkPolicy {
    fn insert(group: &mut Group, id: ItemId, arena: &ItemArena);
}

fn insert_head_first(group: &mut Group, id: ItemId, is_head: bool) {
    if is_head {
        group.items.insert(0, id);
    } else {
        group.items.push(id);
    }
}

fn insert_by_position(list: &mut Vec<ItemId>, id: ItemId, arena: &ItemArena) {
    let hpos = arena.hpos(id);
    let at = list.partition_point(|&other| arena.hpos(other) <= hpos);
    list.insert(at, id);
}

fn insert_sorted(group: &mut Group, id: ItemId, arena: &ItemArena, is_connector: fn(&Item) -> bool) {
    let connector = arena.get(id).is_some_and(is_connector);
    if connector {
        insert_by_position(&mut group.connectors, id, arena);
    } else {
        insert_by_position(&mut group.items, id, arena);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChordLinks;

impl LinkPolicy for ChordLinks {
    fn insert(group: &mut Group, id: ItemId, arena: &ItemArena) {
        insert_head_first(group, id, arena.get(id).is_some_and(Item::has_stem));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LyricsLinks;

impl LinkPolicy for LyricsLinks {
    fn insert(group: &mut Group, id: ItemId, arena: &ItemArena) {
        insert_head_first(group, id, arena.get(id).is_some_and(Item::is_duration_item));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BeamLinks;

impl LinkPolicy for BeamLinks {
    fn insert(group: &mut Group, id: ItemId, arena: &ItemArena) {
        insert_sorted(group, id, arena, |item| item.is(ItemType::Beam));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TupletLinks;

impl LinkPolicy for TupletLinks {
    fn insert(group: &mut Group, id: ItemId, arena: &ItemArena) {
        insert_sorted(group, id, arena, |item| {
            matches!(item.item_type(), ItemType::Slur | ItemType::Number)
        });
    }
}

#[derive(Debug, Clone)]
pub struct GroupingDatabase<P> {
    groups: Vec<Group>,
    membership: HashMap<ItemId, GroupId>,
    policy: PhantomData<P>,
}

impl<P> Default for GroupingDatabase<P> {
    fn default() -> Self {
        Self { groups: Vec::new(), membership: HashMap::new(), policy: PhantomData }
    }
}

pub type ChordDatabase = GroupingDatabase<ChordLinks>;
pub type BeamDatabase = GroupingDatabase<BeamLinks>;
pub type TupletDatabase = GroupingDatabase<TupletLinks>;
pub type LyricsDatabase = GroupingDatabase<LyricsLinks>;

impl<P: LinkPolicy> GroupingDatabase<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_items(&mut self, arena: &ItemArena, a: ItemId, b: ItemId) -> GroupId {
        match (self.lookup(a), self.lookup(b)) {
            (None, None) => {
                let gid = GroupId(self.groups.len());
                let mut group = Group::default();
                P::insert(&mut group, a, arena);
                if b != a {
                    P::insert(&mut group, b, arena);
                }
                self.groups.push(group);
                self.membership.insert(a, gid);
                self.membership.insert(b, gid);
                gid
            }
            (Some(gid), None) => {
                self.join(gid, b, arena);
                gid
            }
            (None, Some(gid)) => {
                self.join(gid, a, arena);
                gid
            }
            // Two existing groups are left as they are, even when they differ.
            (Some(gid), Some(_)) => gid,
        }
    }

    fn join(&mut self, gid: GroupId, id: ItemId, arena: &ItemArena) {
        P::insert(&mut self.groups[gid.0], id, arena);
        self.membership.insert(id, gid);
    }

    pub fn lookup(&self, id: ItemId) -> Option<GroupId> {
        self.membership.get(&id).copied()
    }

    pub fn group(&self, gid: GroupId) -> Option<&Group> {
        self.groups.get(gid.0)
    }

    /// The group `id` belongs to, if any.
    pub fn group_of(&self, id: ItemId) -> Option<&Group> {
        self.lookup(id).and_then(|gid| self.group(gid))
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &Group)> {
        self.groups.iter().enumerate().map(|(i, g)| (GroupId(i), g))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.membership.clear();
    }
}
