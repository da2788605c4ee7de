//! # Analysis Configuration
//!
//! Tolerances and limits used by the structural analyzers. The defaults reproduce
//! the legacy heuristics; a YAML document can override any subset of them.
//!
//! ## Example
//! ```rust
//! use scorepage::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_yaml("position-tolerance: 0.1\nmax-staff: 32").unwrap();
//! assert_eq!(config.position_tolerance, 0.1);
//! assert_eq!(config.max_staff, 32);
//! assert_eq!(config.integer_snap, 0.003);
//! ```

use crate::error::ScoreError;
use serde::Deserialize;

/// Highest staff number any page may use.
pub const MAX_STAFF: usize = 100;

/// Raw YAML shape, every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    position_tolerance: Option<f64>,
    integer_snap: Option<f64>,
    chord_tolerance: Option<f64>,
    beam_tolerance: Option<f64>,
    slur_tolerance: Option<f64>,
    lyric_tolerance: Option<f64>,
    max_staff: Option<usize>,
    right_margin: Option<f64>,
    left_margin: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Horizontal advance that counts as a new rhythmic onset.
    pub position_tolerance: f64,
    /// Distance from an integer at which an accumulated offset is snapped to it.
    pub integer_snap: f64,
    /// Horizontal distance within which notes on one staff form a chord.
    pub chord_tolerance: f64,
    /// Slack at either end of a beam when collecting the notes under it.
    pub beam_tolerance: f64,
    /// Distance a slur endpoint may sit outside the first or last onset of its staff
    /// before it counts as hanging off the system edge.
    pub slur_tolerance: f64,
    /// Horizontal distance within which a lyric syllable attaches to a note.
    pub lyric_tolerance: f64,
    pub max_staff: usize,
    /// Returned for an offset that has no P3 slice.
    pub right_margin: f64,
    /// Returned for a position that has no P3 slice.
    pub left_margin: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            position_tolerance: 0.05,
            integer_snap: 0.003,
            chord_tolerance: 0.05,
            beam_tolerance: 1.5,
            slur_tolerance: 2.0,
            lyric_tolerance: 2.5,
            max_staff: MAX_STAFF,
            right_margin: 200.0,
            left_margin: 0.0,
        }
    }
}

impl AnalysisConfig {
    /// Parse a YAML override document on top of the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, ScoreError> {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ScoreError::Config(e.to_string()))?
        };

        let defaults = Self::default();
        let config = Self {
            position_tolerance: raw.position_tolerance.unwrap_or(defaults.position_tolerance),
            integer_snap: raw.integer_snap.unwrap_or(defaults.integer_snap),
            chord_tolerance: raw.chord_tolerance.unwrap_or(defaults.chord_tolerance),
            beam_tolerance: raw.beam_tolerance.unwrap_or(defaults.beam_tolerance),
            slur_tolerance: raw.slur_tolerance.unwrap_or(defaults.slur_tolerance),
            lyric_tolerance: raw.lyric_tolerance.unwrap_or(defaults.lyric_tolerance),
            max_staff: raw.max_staff.unwrap_or(defaults.max_staff),
            right_margin: raw.right_margin.unwrap_or(defaults.right_margin),
            left_margin: raw.left_margin.unwrap_or(defaults.left_margin),
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ScoreError> {
        let tolerances = [
            ("position-tolerance", self.position_tolerance),
            ("integer-snap", self.integer_snap),
            ("chord-tolerance", self.chord_tolerance),
            ("beam-tolerance", self.beam_tolerance),
            ("slur-tolerance", self.slur_tolerance),
            ("lyric-tolerance", self.lyric_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoreError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.max_staff == 0 || self.max_staff > MAX_STAFF {
            return Err(ScoreError::Config(format!(
                "max-staff must be in 1..={}, got {}",
                MAX_STAFF, self.max_staff
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = AnalysisConfig::from_yaml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = AnalysisConfig::from_yaml("chord-tolerance: 0.25\nright-margin: 180").unwrap();
        assert_eq!(config.chord_tolerance, 0.25);
        assert_eq!(config.right_margin, 180.0);
        assert_eq!(config.position_tolerance, 0.05);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = AnalysisConfig::from_yaml("beam-tolerance: -1").unwrap_err();
        assert!(matches!(err, ScoreError::Config(_)));
    }

    #[test]
    fn test_max_staff_above_cap_rejected() {
        assert!(AnalysisConfig::from_yaml("max-staff: 101").is_err());
        assert!(AnalysisConfig::from_yaml("max-staff: 0").is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = AnalysisConfig::from_yaml("tempo: 120").unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }
}
