//! Parameter history for edit-aware items.
//!
//! An [`EditableItem`] is an [`Item`] plus an append-only log of every effective
//! parameter change. Whether changes are recorded, and how they are grouped into
//! generations, is decided by the [`EditSession`] passed to each setter.

use super::{Change, Item};
use crate::error::ScoreError;

/// Which parameter an entry is about.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryTarget {
    Fixed(usize),
    Named { namespace: String, key: String },
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Created,
    Deleted,
    Changed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub target: HistoryTarget,
    pub old: Option<String>,
    pub new: Option<String>,
    pub generation: u64,
    pub kind: HistoryKind,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterHistory {
    entries: Vec<HistoryEntry>,
}

impl ParameterHistory {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries touching one parameter, oldest first.
    pub fn for_target<'a>(&'a self, target: &'a HistoryTarget) -> impl Iterator<Item = &'a HistoryEntry> {
        self.entries.iter().filter(move |e| &e.target == target)
    }
}

/// Recording context shared by every editable item of one editing session.
///
/// While thawed, each recorded call gets its own generation. While frozen, calls
/// share the current generation, so a batch of edits reads as one logical step.
#[derive(Debug, Clone)]
pub struct EditSession {
    active: bool,
    frozen: bool,
    generation: u64,
}

impl Default for EditSession {
    fn default() -> Self {
        Self { active: true, frozen: false, generation: 0 }
    }
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that records nothing.
    pub fn inactive() -> Self {
        Self { active: false, ..Self::default() }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Start a batch: following edits share one generation.
    pub fn freeze(&mut self) {
        if !self.frozen {
            self.frozen = true;
            self.generation += 1;
        }
    }

    /// End a batch.
    pub fn thaw(&mut self) {
        self.frozen = false;
    }

    fn next_generation(&mut self) -> u64 {
        if !self.frozen {
            self.generation += 1;
        }
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditableItem {
    item: Item,
    history: ParameterHistory,
}

fn format_value(value: f64) -> String {
    value.to_string()
}

impl EditableItem {
    pub fn new(item: Item) -> Self {
        Self { item, history: ParameterHistory::default() }
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn into_item(self) -> Item {
        self.item
    }

    pub fn history(&self) -> &ParameterHistory {
        &self.history
    }

    fn record(&mut self, session: &mut EditSession, target: HistoryTarget, old: Option<String>, new: Option<String>) {
        if !session.is_active() {
            return;
        }
        let kind = match (&old, &new) {
            (None, Some(_)) => HistoryKind::Created,
            (Some(_), None) => HistoryKind::Deleted,
            _ => HistoryKind::Changed,
        };
        let generation = session.next_generation();
        self.history.entries.push(HistoryEntry { target, old, new, generation, kind });
    }

    pub fn set_fixed(
        &mut self,
        session: &mut EditSession,
        index: usize,
        value: f64,
    ) -> Result<Option<Change>, ScoreError> {
        let existed = index <= self.item.fixed_count();
        let change = self.item.set_fixed(index, value)?;
        if let Some(Change::Fixed { index, old, new }) = &change {
            let old = existed.then(|| format_value(*old));
            self.record(session, HistoryTarget::Fixed(*index), old, Some(format_value(*new)));
        }
        Ok(change)
    }

    pub fn set_named(&mut self, session: &mut EditSession, namespace: &str, key: &str, value: &str) -> Option<Change> {
        let old = self
            .item
            .has_named(namespace, key)
            .then(|| self.item.named(namespace, key).to_string());
        let change = self.item.set_named(namespace, key, value)?;
        let target = HistoryTarget::Named { namespace: namespace.to_string(), key: key.to_string() };
        self.record(session, target, old, Some(value.to_string()));
        Some(change)
    }

    pub fn delete_named(&mut self, session: &mut EditSession, namespace: &str, key: &str) -> Option<Change> {
        let old = self.item.named(namespace, key).to_string();
        let change = self.item.delete_named(namespace, key)?;
        let target = HistoryTarget::Named { namespace: namespace.to_string(), key: key.to_string() };
        self.record(session, target, Some(old), None);
        Some(change)
    }

    pub fn set_text(&mut self, session: &mut EditSession, text: &str) -> Option<Change> {
        let old = self.item.text().map(str::to_string);
        let change = self.item.set_text(text)?;
        self.record(session, HistoryTarget::Text, old, Some(text.to_string()));
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;

    #[test]
    fn test_history_records_created_then_changed() {
        let mut session = EditSession::new();
        let mut item = EditableItem::new(Item::new(ItemType::Note));
        item.set_named(&mut session, "", "id", "n1");
        item.set_named(&mut session, "", "id", "n2");
        let entries = item.history().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, HistoryKind::Created);
        assert_eq!(entries[1].kind, HistoryKind::Changed);
        assert_eq!(entries[1].old.as_deref(), Some("n1"));
        assert_eq!(entries[0].generation + 1, entries[1].generation);
    }

    #[test]
    fn test_no_entry_for_ineffective_change() {
        let mut session = EditSession::new();
        let mut item = EditableItem::new(Item::with_params(ItemType::Note, &[1.0, 10.0]));
        assert!(item.set_fixed(&mut session, 3, 10.0).unwrap().is_none());
        assert!(item.history().is_empty());
    }

    #[test]
    fn test_fixed_growth_records_creation() {
        let mut session = EditSession::new();
        let mut item = EditableItem::new(Item::new(ItemType::Note));
        item.set_fixed(&mut session, 7, 1.5).unwrap();
        let entry = &item.history().entries()[0];
        assert_eq!(entry.target, HistoryTarget::Fixed(7));
        assert_eq!(entry.kind, HistoryKind::Created);
        assert_eq!(entry.new.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_frozen_session_batches_generation() {
        let mut session = EditSession::new();
        let mut item = EditableItem::new(Item::new(ItemType::Text));
        session.freeze();
        item.set_text(&mut session, "dolce");
        item.set_named(&mut session, "", "font", "italic");
        session.thaw();
        item.delete_named(&mut session, "", "font");
        let gens: Vec<u64> = item.history().entries().iter().map(|e| e.generation).collect();
        assert_eq!(gens[0], gens[1]);
        assert!(gens[2] > gens[1]);
        assert_eq!(item.history().entries()[2].kind, HistoryKind::Deleted);
    }

    #[test]
    fn test_inactive_session_records_nothing() {
        let mut session = EditSession::inactive();
        let mut item = EditableItem::new(Item::new(ItemType::Text));
        assert!(item.set_text(&mut session, "p").is_some());
        assert!(item.history().is_empty());
        assert_eq!(session.generation(), 0);
    }
}
