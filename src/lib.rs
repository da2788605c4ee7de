//! # scorepage
//!
//! Reads and writes pages of the SCORE music engraving format, in both the
//! binary `.mus` layout and the PMX text form, and reconstructs musical
//! structure from the flat item list: staves, systems, rhythmic offsets,
//! measures, pitches, chords, beams, tuplets, layers, ties and lyrics.
//!
//! ## Example
//! ```rust
//! use scorepage::{Page, PmxOptions};
//!
//! let mut page = Page::from_pmx("1 1 10 5 10 0 1\n1 1 20 5 10 0 1\n5 1 11 9 9 19\n").unwrap();
//! let first = page.id_at(0).unwrap();
//! let second = page.id_at(1).unwrap();
//! assert_eq!(page.tied_next(first).unwrap(), Some(second));
//! assert!(page.to_pmx(PmxOptions { include_auto: true }).contains("@auto::slurType:\ttie"));
//! ```

pub mod analysis;
pub mod codec;
pub mod config;
pub mod error;
pub mod grouping;
pub mod item;
pub mod measure;
pub mod p3;
pub mod page;
pub mod pitch;
pub mod validity;

pub use analysis::{SlurKind, SystemInfo};
pub use codec::{PageFormat, PmxOptions};
pub use config::AnalysisConfig;
pub use error::ScoreError;
pub use item::{Change, Item, ItemKind, ItemType};
pub use measure::SystemMeasure;
pub use page::{ItemId, ItemMut, Page};
pub use pitch::Base40;
pub use validity::{Pass, ValidityGraph};
