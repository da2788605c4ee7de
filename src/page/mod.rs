//! # Page
//!
//! One SCORE page: the items in file order plus every structure derived from them.
//!
//! ## Purpose
//! The page owns its items in an [`ItemArena`]. Chords, beams, ties and other
//! cross-references are [`ItemId`]s into that arena and cannot outlive a
//! [`Page::clear`].
//!
//! ## Lazy Analysis
//! Derived queries take `&mut self` and return `Result`: a query first runs the
//! passes it needs (see [`crate::validity::Pass`]), skipping any that are still
//! valid. [`Page::analyze`] runs everything up front.
//!
//! ## Editing
//! [`Page::item_mut`] hands out an [`ItemMut`] guard. Changes made through it
//! mark the page as modified but keep derived data; call
//! [`Page::invalidate`] with [`Pass::Sorted`] to have it rebuilt.
//!
//! ## Example
//! ```rust
//! use scorepage::Page;
//!
//! let mut page = Page::from_pmx("8 1 0 0 0 200\n1 1 10 3 10 0 1\n1 1 20 4 10 0 1\n").unwrap();
//! assert_eq!(page.len(), 3);
//! assert_eq!(page.staff_duration(1).unwrap(), 2.0);
//! let first_note = page.id_at(1).unwrap();
//! assert_eq!(page.pitch(first_note).unwrap().map(|p| p.name()), Some("E4".to_string()));
//! ```
//!
//! ## Related Modules
//! - `crate::analysis` - The pass implementations
//! - `crate::codec` - Binary and PMX encodings

mod arena;
mod passes;

pub use arena::{ItemArena, ItemId};

use crate::analysis::{SlurKind, SystemInfo, TieAnalysis, TieLink};
use crate::codec::{self, binary, pmx, BinaryLayout, PageFormat, PmxOptions};
use crate::config::AnalysisConfig;
use crate::error::ScoreError;
use crate::grouping::{BeamDatabase, ChordDatabase, Group, LyricsDatabase, TupletDatabase};
use crate::item::{Change, Item};
use crate::measure::SystemMeasure;
use crate::p3::P3Database;
use crate::pitch::Base40;
use crate::validity::{Pass, ValidityGraph};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::ops::Deref;
use std::path::Path;
use tracing::debug;

/// Mutable access to one item. Effective changes mark the page as modified.
pub struct ItemMut<'a> {
    item: &'a mut Item,
    validity: &'a mut ValidityGraph,
}

impl ItemMut<'_> {
    fn touched(&mut self, change: Option<Change>) -> Option<Change> {
        if change.is_some() {
            // `unmodified` is always registered
            let _ = self.validity.invalidate(Pass::Unmodified.name());
        }
        change
    }

    pub fn set_fixed(&mut self, index: usize, value: f64) -> Result<Option<Change>, ScoreError> {
        let change = self.item.set_fixed(index, value)?;
        Ok(self.touched(change))
    }

    pub fn set_named(&mut self, namespace: &str, key: &str, value: &str) -> Option<Change> {
        let change = self.item.set_named(namespace, key, value);
        self.touched(change)
    }

    pub fn delete_named(&mut self, namespace: &str, key: &str) -> Option<Change> {
        let change = self.item.delete_named(namespace, key);
        self.touched(change)
    }

    pub fn delete_namespace(&mut self, namespace: &str) -> Option<Change> {
        let change = self.item.delete_namespace(namespace);
        self.touched(change)
    }

    pub fn set_text(&mut self, text: &str) -> Option<Change> {
        let change = self.item.set_text(text);
        self.touched(change)
    }
}

impl Deref for ItemMut<'_> {
    type Target = Item;

    fn deref(&self) -> &Item {
        self.item
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    arena: ItemArena,
    layout: BinaryLayout,
    config: AnalysisConfig,
    validity: ValidityGraph,
    sorted: Vec<ItemId>,
    staves: BTreeMap<usize, Vec<ItemId>>,
    staff_durations: BTreeMap<usize, f64>,
    systems: Vec<SystemInfo>,
    staff_to_system: HashMap<usize, usize>,
    measures: Vec<Vec<SystemMeasure>>,
    p3: Vec<P3Database>,
    chords: ChordDatabase,
    beams: BeamDatabase,
    tuplets: TupletDatabase,
    lyrics: LyricsDatabase,
    ties: TieAnalysis,
    tied_next: HashMap<ItemId, ItemId>,
    tied_last: HashMap<ItemId, ItemId>,
    slur_kinds: HashMap<ItemId, SlurKind>,
}

impl Default for Page {
    fn default() -> Self {
        Self::with_config(AnalysisConfig::default())
    }
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            arena: ItemArena::new(),
            layout: BinaryLayout::default(),
            config,
            validity: ValidityGraph::for_page(),
            sorted: Vec::new(),
            staves: BTreeMap::new(),
            staff_durations: BTreeMap::new(),
            systems: Vec::new(),
            staff_to_system: HashMap::new(),
            measures: Vec::new(),
            p3: Vec::new(),
            chords: ChordDatabase::new(),
            beams: BeamDatabase::new(),
            tuplets: TupletDatabase::new(),
            lyrics: LyricsDatabase::new(),
            ties: TieAnalysis::default(),
            tied_next: HashMap::new(),
            tied_last: HashMap::new(),
            slur_kinds: HashMap::new(),
        }
    }

    // Reading and writing

    /// Read a binary or PMX page, detected from its last four bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScoreError> {
        let mut page = Self::new();
        page.load(bytes)?;
        Ok(page)
    }

    pub fn from_pmx(text: &str) -> Result<Self, ScoreError> {
        let mut page = Self::new();
        page.replace_items(pmx::read(text)?, BinaryLayout::default());
        Ok(page)
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, ScoreError> {
        let bytes = fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), bytes = bytes.len(), "reading page");
        Self::from_bytes(&bytes)
    }

    /// Replace this page's contents with a decoded page, keeping the configuration.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), ScoreError> {
        match codec::detect_format(bytes) {
            PageFormat::Binary => {
                let (items, layout) = binary::read(bytes)?;
                self.replace_items(items, layout);
            }
            PageFormat::Pmx => {
                let text = match std::str::from_utf8(bytes) {
                    Ok(text) => text.to_string(),
                    Err(_) => codec::latin1_decode(bytes),
                };
                self.replace_items(pmx::read(&text)?, BinaryLayout::default());
            }
        }
        Ok(())
    }

    fn replace_items(&mut self, items: Vec<Item>, layout: BinaryLayout) {
        self.clear();
        for item in items {
            self.arena.push(item);
        }
        self.layout = layout;
        debug!(items = self.arena.len(), "page loaded");
    }

    pub fn to_binary(&self) -> Vec<u8> {
        binary::write(self.arena.items(), &self.layout)
    }

    pub fn to_pmx(&self, options: PmxOptions) -> String {
        pmx::write(self.arena.items(), options)
    }

    pub fn write_file(&self, path: impl AsRef<Path>, format: PageFormat) -> Result<(), ScoreError> {
        let bytes = match format {
            PageFormat::Binary => self.to_binary(),
            PageFormat::Pmx => self.to_pmx(PmxOptions::default()).into_bytes(),
        };
        fs::write(path, bytes)?;
        Ok(())
    }

    // Items

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.arena.get(id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<ItemMut<'_>> {
        let item = self.arena.get_mut(id)?;
        Some(ItemMut { item, validity: &mut self.validity })
    }

    /// Id of the item at file position `index`.
    pub fn id_at(&self, index: usize) -> Option<ItemId> {
        self.arena.id_at(index)
    }

    /// Items in file order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> + '_ {
        self.arena.iter()
    }

    /// Append an item. Every derived structure becomes stale.
    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = self.arena.push(item);
        let _ = self.validity.invalidate(Pass::Unmodified.name());
        let _ = self.validity.invalidate(Pass::Sorted.name());
        id
    }

    /// Drop all items and derived data. Ids handed out earlier stop resolving.
    pub fn clear(&mut self) {
        let config = self.config.clone();
        let mut arena = std::mem::take(&mut self.arena);
        arena.clear();
        *self = Self::with_config(config);
        self.arena = arena;
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn layout(&self) -> &BinaryLayout {
        &self.layout
    }

    // Validity

    pub fn is_valid(&self, pass: Pass) -> bool {
        self.validity.is_valid(pass.name())
    }

    /// True once any item was edited or added since the page was read.
    pub fn is_modified(&self) -> bool {
        !self.validity.is_valid(Pass::Unmodified.name())
    }

    pub fn invalidate(&mut self, pass: Pass) -> Result<(), ScoreError> {
        self.validity.invalidate(pass.name())
    }

    /// Run every analysis that is not current.
    pub fn analyze(&mut self) -> Result<(), ScoreError> {
        for pass in Pass::ALL {
            self.ensure(pass)?;
        }
        Ok(())
    }

    // Derived queries

    pub fn sorted_items(&mut self) -> Result<&[ItemId], ScoreError> {
        self.ensure(Pass::Sorted)?;
        Ok(&self.sorted)
    }

    /// Staff numbers that hold at least one item, lowest first.
    pub fn staff_numbers(&mut self) -> Result<Vec<usize>, ScoreError> {
        self.ensure(Pass::Staves)?;
        Ok(self.staves.keys().copied().collect())
    }

    /// Items of one staff in position order; empty for an unused staff.
    pub fn staff_items(&mut self, staff: usize) -> Result<&[ItemId], ScoreError> {
        self.ensure(Pass::Staves)?;
        Ok(self.staves.get(&staff).map_or(&[], Vec::as_slice))
    }

    pub fn staff_duration(&mut self, staff: usize) -> Result<f64, ScoreError> {
        self.ensure(Pass::Durations)?;
        Ok(self.staff_durations.get(&staff).copied().unwrap_or(0.0))
    }

    pub fn staff_offset(&mut self, id: ItemId) -> Result<Option<f64>, ScoreError> {
        self.ensure(Pass::Durations)?;
        Ok(self.arena.get(id).and_then(|item| item.auto_f64("staffOffset")))
    }

    pub fn system_count(&mut self) -> Result<usize, ScoreError> {
        self.ensure(Pass::Systems)?;
        Ok(self.systems.len())
    }

    /// Systems from the top of the page down.
    pub fn systems(&mut self) -> Result<&[SystemInfo], ScoreError> {
        self.ensure(Pass::Systems)?;
        Ok(&self.systems)
    }

    pub fn system(&mut self, index: usize) -> Result<Option<&SystemInfo>, ScoreError> {
        self.ensure(Pass::Systems)?;
        Ok(self.systems.get(index))
    }

    pub fn system_of_staff(&mut self, staff: usize) -> Result<Option<usize>, ScoreError> {
        self.ensure(Pass::Systems)?;
        Ok(self.staff_to_system.get(&staff).copied())
    }

    pub fn measures(&mut self, system: usize) -> Result<&[SystemMeasure], ScoreError> {
        self.ensure(Pass::Barlines)?;
        Ok(self.measures.get(system).map_or(&[], Vec::as_slice))
    }

    pub fn p3(&mut self, system: usize) -> Result<Option<&mut P3Database>, ScoreError> {
        self.ensure(Pass::P3)?;
        Ok(self.p3.get_mut(system))
    }

    pub fn chord_of(&mut self, id: ItemId) -> Result<Option<&Group>, ScoreError> {
        self.ensure(Pass::Chords)?;
        Ok(self.chords.group_of(id))
    }

    pub fn beam_of(&mut self, id: ItemId) -> Result<Option<&Group>, ScoreError> {
        self.ensure(Pass::Beams)?;
        Ok(self.beams.group_of(id))
    }

    pub fn tuplet_of(&mut self, id: ItemId) -> Result<Option<&Group>, ScoreError> {
        self.ensure(Pass::Tuplets)?;
        Ok(self.tuplets.group_of(id))
    }

    pub fn lyrics_of(&mut self, id: ItemId) -> Result<Option<&Group>, ScoreError> {
        self.ensure(Pass::Lyrics)?;
        Ok(self.lyrics.group_of(id))
    }

    /// Sounding pitch of a note, after ties have carried pitches forward.
    pub fn pitch(&mut self, id: ItemId) -> Result<Option<Base40>, ScoreError> {
        self.ensure(Pass::Ties)?;
        let value = self.arena.get(id).and_then(|item| item.auto("base40").parse::<i32>().ok());
        Ok(value.map(Base40::new))
    }

    pub fn layer(&mut self, id: ItemId) -> Result<Option<u8>, ScoreError> {
        self.ensure(Pass::Layers)?;
        Ok(self.arena.get(id).and_then(|item| item.auto("layer").parse().ok()))
    }

    pub fn ties(&mut self) -> Result<&[TieLink], ScoreError> {
        self.ensure(Pass::Ties)?;
        Ok(&self.ties.links)
    }

    /// The note `id` is tied to.
    pub fn tied_next(&mut self, id: ItemId) -> Result<Option<ItemId>, ScoreError> {
        self.ensure(Pass::Ties)?;
        Ok(self.tied_next.get(&id).copied())
    }

    /// The note tied into `id`.
    pub fn tied_last(&mut self, id: ItemId) -> Result<Option<ItemId>, ScoreError> {
        self.ensure(Pass::Ties)?;
        Ok(self.tied_last.get(&id).copied())
    }

    pub fn slur_kind(&mut self, id: ItemId) -> Result<Option<SlurKind>, ScoreError> {
        self.ensure(Pass::Ties)?;
        Ok(self.slur_kinds.get(&id).copied())
    }
}
