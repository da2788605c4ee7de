//! # Analysis Validity Graph
//!
//! Tracks which derived structures of a page are current. Each node is a named
//! boolean cell; edges point from an analysis to the analyses built on top of it.
//!
//! ## Semantics
//! - `invalidate(name)` clears the node and every descendant. The walk visits each
//!   node once, so it terminates on any graph, redundant edges and cycles included.
//! - `validate(name)` sets only the named node. Callers validate in dependency
//!   order; [`crate::Page`] does this by pulling prerequisites before running a pass.
//!
//! ## Page Passes
//! ```text
//! sorted -> staves -> durations -> barlines, layers, p3
//!                  -> systems   -> barlines, pitches, p3
//!                  -> chords -> beams -> tuplets
//!                  -> layers -> ties <- pitches
//!                  -> lyrics
//! unmodified (standalone: flipped by item edits)
//! ```

use crate::error::ScoreError;
use std::collections::{HashMap, HashSet};

/// Named analyses of a page, in a valid execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Unmodified,
    Sorted,
    Staves,
    Durations,
    Systems,
    Barlines,
    Pitches,
    Chords,
    Beams,
    Tuplets,
    Layers,
    Ties,
    P3,
    Lyrics,
}

impl Pass {
    pub const ALL: [Pass; 14] = [
        Pass::Unmodified,
        Pass::Sorted,
        Pass::Staves,
        Pass::Durations,
        Pass::Systems,
        Pass::Barlines,
        Pass::Pitches,
        Pass::Chords,
        Pass::Beams,
        Pass::Tuplets,
        Pass::Layers,
        Pass::Ties,
        Pass::P3,
        Pass::Lyrics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pass::Unmodified => "unmodified",
            Pass::Sorted => "sorted",
            Pass::Staves => "staves",
            Pass::Durations => "durations",
            Pass::Systems => "systems",
            Pass::Barlines => "barlines",
            Pass::Pitches => "pitches",
            Pass::Chords => "chords",
            Pass::Beams => "beams",
            Pass::Tuplets => "tuplets",
            Pass::Layers => "layers",
            Pass::Ties => "ties",
            Pass::P3 => "p3",
            Pass::Lyrics => "lyrics",
        }
    }

    /// `auto` annotations this analysis writes. They are dropped from every item
    /// before it runs, so items that no longer qualify lose stale values.
    pub fn owned_annotations(self) -> &'static [&'static str] {
        match self {
            Pass::Durations => &["staffOffset"],
            Pass::Systems => &["systemIndex", "staffIndex"],
            Pass::Pitches => &["base40", "pitch", "cautionary"],
            Pass::Chords => &["chordHead"],
            Pass::Layers => &["layer"],
            Pass::Ties => &["tiedNext", "tiedLast", "slurType"],
            _ => &[],
        }
    }

    /// Analyses that must be current before this one runs.
    pub fn parents(self) -> &'static [Pass] {
        match self {
            Pass::Unmodified | Pass::Sorted => &[],
            Pass::Staves => &[Pass::Sorted],
            Pass::Durations | Pass::Systems | Pass::Chords | Pass::Lyrics => &[Pass::Staves],
            Pass::Barlines => &[Pass::Durations, Pass::Systems],
            Pass::Pitches => &[Pass::Systems],
            Pass::Beams => &[Pass::Chords],
            Pass::Tuplets => &[Pass::Beams],
            Pass::Layers => &[Pass::Staves, Pass::Durations],
            Pass::Ties => &[Pass::Layers, Pass::Pitches],
            Pass::P3 => &[Pass::Durations, Pass::Systems],
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    valid: bool,
    parents: Vec<String>,
    children: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidityGraph {
    nodes: HashMap<String, Node>,
}

impl ValidityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dependency graph of page analyses; only `unmodified` starts valid.
    pub fn for_page() -> Self {
        let mut graph = Self::new();
        for pass in Pass::ALL {
            graph.add_node(pass.name(), pass == Pass::Unmodified);
        }
        for pass in Pass::ALL {
            for parent in pass.parents() {
                // both ends were added above
                let _ = graph.add_child(parent.name(), pass.name(), false);
            }
        }
        graph
    }

    /// Register a node. Re-adding an existing name only resets its cell.
    pub fn add_node(&mut self, name: &str, valid: bool) {
        self.nodes.entry(name.to_string()).or_default().valid = valid;
    }

    /// Add an edge `parent -> child`, creating the child if needed.
    pub fn add_child(&mut self, parent: &str, child: &str, valid: bool) -> Result<(), ScoreError> {
        if !self.nodes.contains_key(parent) {
            return Err(ScoreError::UnknownNode(parent.to_string()));
        }
        let node = self.nodes.entry(child.to_string()).or_insert_with(|| Node { valid, ..Node::default() });
        if !node.parents.iter().any(|p| p == parent) {
            node.parents.push(parent.to_string());
        }
        let parent_node = self.nodes.get_mut(parent).ok_or_else(|| ScoreError::UnknownNode(parent.to_string()))?;
        if !parent_node.children.iter().any(|c| c == child) {
            parent_node.children.push(child.to_string());
        }
        Ok(())
    }

    pub fn invalidate(&mut self, name: &str) -> Result<(), ScoreError> {
        if !self.nodes.contains_key(name) {
            return Err(ScoreError::UnknownNode(name.to_string()));
        }
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&current) {
                node.valid = false;
                stack.extend(node.children.iter().rev().cloned());
            }
        }
        Ok(())
    }

    pub fn validate(&mut self, name: &str) -> Result<(), ScoreError> {
        let node = self.nodes.get_mut(name).ok_or_else(|| ScoreError::UnknownNode(name.to_string()))?;
        node.valid = true;
        Ok(())
    }

    /// Unknown names read as invalid.
    pub fn is_valid(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|n| n.valid)
    }

    pub fn children(&self, name: &str) -> &[String] {
        self.nodes.get(name).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parents(&self, name: &str) -> &[String] {
        self.nodes.get(name).map_or(&[], |n| n.parents.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }
}
