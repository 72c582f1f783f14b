// src/config.rs
use crate::error::{Result, TrackingError};
use crate::profile::{ExerciseProfile, ProfileRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Landmarks below this visibility are treated as missing.
    pub min_visibility: f64,
    /// Reps scoring under this get a coaching cue.
    pub low_score_threshold: f64,
    /// Spacing of score samples while holding a position.
    pub hold_tick_ms: u64,
    /// Consecutive unusable frames before the user is told tracking was lost.
    pub tracking_lost_frames: u32,
    /// Extra or replacement exercise profiles layered over the built-in table.
    pub profiles: Vec<ExerciseProfile>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.5,
            low_score_threshold: 60.0,
            hold_tick_ms: 1000,
            tracking_lost_frames: 30,
            profiles: Vec::new(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| TrackingError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| TrackingError::Config {
            path: "<inline>".into(),
            source,
        })
    }

    pub fn hold_tick(&self) -> Duration {
        Duration::from_millis(self.hold_tick_ms.max(1))
    }

    /// Built-in profiles plus any configured overrides.
    pub fn registry(&self) -> Result<ProfileRegistry> {
        ProfileRegistry::builtin().with_overrides(self.profiles.iter().cloned())
    }
}
