//! # Structural Analyzers
//!
//! Functions that reconstruct musical structure from a page's flat item list.
//! Each one reads items through the derived readers in [`crate::item`], and
//! writes its results to `auto` annotations or to a grouping database.
//!
//! ## Pipeline
//! [`crate::Page`] runs these in dependency order (see [`crate::validity::Pass`]):
//!
//! | Pass | Function | Output |
//! |------|----------|--------|
//! | sorted | [`staves::sorted_ids`] | position-ordered ids |
//! | staves | [`staves::partition`] | items per staff |
//! | durations | [`duration::analyze_staff`] | `staffOffset`, staff durations |
//! | systems | [`systems::group`] | `systemIndex`, `staffIndex` |
//! | barlines | [`crate::measure::segment`] | measures per system |
//! | pitches | [`pitch::spell_systems`] | `base40`, `pitch`, `cautionary` |
//! | chords | [`chords::link_chords`] | chord database, `chordHead` |
//! | beams | [`beams::link_beams`] | beam database |
//! | tuplets | [`tuplets::link_tuplets`] | tuplet database |
//! | layers | [`layers::assign_layers`] | `layer` |
//! | ties | [`ties::find_ties`] | `tiedNext`, `tiedLast`, `slurType` |
//! | lyrics | [`lyrics::link_lyrics`] | lyrics database |
//!
//! Before a pass runs, [`crate::Page`] drops the annotations it owns from every
//! item (see [`crate::validity::Pass::owned_annotations`]). An item that stopped
//! qualifying loses its old values, and a second run without edits gives the
//! same state.

pub mod beams;
pub mod chords;
pub mod duration;
pub mod layers;
pub mod lyrics;
pub mod pitch;
pub mod staves;
pub mod systems;
pub mod ties;
pub mod tuplets;


pub use systems::SystemInfo;
pub use ties::{SlurKind, TieAnalysis, TieLink};
