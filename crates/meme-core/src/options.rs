//! Tuning options for the meme engine.

use serde::{Deserialize, Serialize};

use crate::error::{MemeError, Result};

/// Engine-wide tuning constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Relaxation passes without a committed update before a vertex meme
    /// goes cold.
    pub max_cold_iters: u8,

    /// Fraction of the way a vertex moves toward its smoothing target in
    /// one update.
    pub relax_damping: f32,

    /// An update is committed only if it moves the vertex farther than
    /// this fraction of its average edge length.
    pub commit_threshold_fraction: f32,

    /// A non-boss vertex meme tracks the boss if their candidate positions
    /// are closer than this fraction of the average edge length.
    pub track_threshold_scale: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_cold_iters: 8,
            relax_damping: 0.5,
            commit_threshold_fraction: 0.01,
            track_threshold_scale: 0.1,
        }
    }
}

impl Options {
    /// Parses options from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Options = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if self.max_cold_iters == 0 {
            return Err(MemeError::InvalidOption(
                "max_cold_iters must be at least 1".into(),
            ));
        }
        if !(self.relax_damping > 0.0 && self.relax_damping <= 1.0) {
            return Err(MemeError::InvalidOption(format!(
                "relax_damping must be in (0, 1], got {}",
                self.relax_damping
            )));
        }
        if self.commit_threshold_fraction.is_nan() || self.commit_threshold_fraction < 0.0 {
            return Err(MemeError::InvalidOption(format!(
                "commit_threshold_fraction must be non-negative, got {}",
                self.commit_threshold_fraction
            )));
        }
        if self.track_threshold_scale.is_nan() || self.track_threshold_scale < 0.0 {
            return Err(MemeError::InvalidOption(format!(
                "track_threshold_scale must be non-negative, got {}",
                self.track_threshold_scale
            )));
        }
        Ok(())
    }
}
