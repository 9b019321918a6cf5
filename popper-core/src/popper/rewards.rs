use serde::{Deserialize, Serialize};

use super::ConfigError;

pub const DEFAULT_PRESET: &str = "default";

/// Reward magnitudes handed out by an episode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RewardPreset {
    /// Added on every step.
    pub step_cost: f64,
    /// Successful pick, drop or manual fall.
    pub valid_action: f64,
    /// Per popped cell; also added to the score.
    pub pop_cell: f64,
    pub overflow: f64,
    /// Dropping into a column without an empty cell.
    pub invalid_full_drop: f64,
    pub time_up: f64,
    /// Manual fall; also added to the score. Kept below `time_up` in magnitude.
    pub manual_fall_bonus: f64,
}

impl Default for RewardPreset {
    fn default() -> Self {
        Self {
            step_cost: -0.01,
            valid_action: 0.0,
            pop_cell: 3.0,
            overflow: -3.0,
            invalid_full_drop: -1.0,
            time_up: -1.5,
            manual_fall_bonus: 0.1,
        }
    }
}

impl RewardPreset {
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        match name {
            DEFAULT_PRESET => Ok(Self::default()),
            other => Err(ConfigError::UnknownRewardPreset(other.to_owned())),
        }
    }
}
