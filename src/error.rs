//! # Error Types
//!
//! This module defines the error type shared by the codec, the item model and the
//! analysis passes.
//!
//! Only structural problems are errors. Lookup misses (an unknown named parameter,
//! an item that belongs to no chord, a rhythmic offset with no P3 slice) are
//! ordinary outcomes and come back as `Option`, empty strings or sentinel values.
//!
//! ## Error Types
//! - `Format` - Binary page structure is broken (byte offset included)
//! - `Parse` - A PMX text line could not be read (line number included)
//! - `FieldIndex` - A fixed parameter index above the hard cap
//! - `StaffRange` - A staff number above the configured maximum
//! - `UnknownNode` - A validity graph operation named a node that was never added
//! - `Config` - Invalid analysis configuration YAML
//! - `Io` - The underlying reader or writer failed
//!
//! ## Usage
//! ```rust,no_run
//! use scorepage::{Page, ScoreError};
//!
//! match Page::read_file("page.mus") {
//!     Ok(page) => println!("{} items", page.len()),
//!     Err(ScoreError::Format { offset, message }) => {
//!         eprintln!("Broken page at byte {}: {}", offset, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    /// Binary structure error with the byte offset that failed the check.
    ///
    /// # Example
    /// ```
    /// # use scorepage::ScoreError;
    /// let err = ScoreError::Format {
    ///     offset: 12,
    ///     message: "trailer sentinel is 3, expected 0".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Format error at byte 12: trailer sentinel is 3, expected 0");
    /// ```
    #[error("Format error at byte {offset}: {message}")]
    Format { offset: usize, message: String },

    /// PMX text error with a 1-based line number.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Fixed parameter index outside `1..=100`.
    #[error("Fixed parameter index {index} is outside 1..={max}")]
    FieldIndex { index: usize, max: usize },

    /// Staff number above the configured maximum.
    #[error("Staff number {staff} exceeds the maximum of {max}")]
    StaffRange { staff: usize, max: usize },

    /// A validity graph call named a node that was never registered.
    #[error("Unknown analysis node: {0}")]
    UnknownNode(String),

    /// Invalid analysis configuration.
    ///
    /// # Example
    /// ```
    /// # use scorepage::ScoreError;
    /// let err = ScoreError::Config("max-staff must be in 1..=100".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: max-staff must be in 1..=100");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
