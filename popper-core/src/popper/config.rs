use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CurvePoint, RandomSeed, RewardPreset, board::EMPTY};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("value pool is empty")]
    EmptyPool,
    #[error("value pool must not contain the empty value {EMPTY}")]
    ZeroInPool,
    #[error("value {0} appears more than once in the pool")]
    DuplicateInPool(u8),
    #[error("board must have at least one row and column, got {height}x{width}")]
    ZeroDimension { height: usize, width: usize },
    #[error("game duration must be positive, got {0}")]
    NonPositiveDuration(f64),
    #[error("fall interval must be finite and non-negative, got {0}")]
    InvalidInterval(f64),
    #[error("invalid curve point ({threshold}, {interval})")]
    InvalidCurvePoint { threshold: f64, interval: f64 },
    #[error("step duration must be finite and non-negative, got {0}")]
    InvalidStepDt(f64),
    #[error("unknown reward preset {0:?}")]
    UnknownRewardPreset(String),
}

/// How much game time passes per step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    /// Every step advances the clock by `step_dt` seconds.
    Fixed { step_dt: f64 },
    /// Steps and [`super::Episode::wall_time_tick`] advance by real elapsed time.
    WallClock,
}

impl Default for TimeMode {
    fn default() -> Self {
        Self::Fixed { step_dt: 0.1 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PopperConfig {
    pub height: usize,
    pub width: usize,
    pub pool: Vec<u8>,
    pub seed: Option<RandomSeed>,
    pub game_duration: f64,
    /// Dropping into a full column ends the episode.
    pub strict_invalid: bool,
    pub include_time_left_norm: bool,
    pub initial_fall_interval: f64,
    pub schedule_curve: Vec<CurvePoint>,
    pub time_mode: TimeMode,
    pub rewards: RewardPreset,
}

impl Default for PopperConfig {
    fn default() -> Self {
        Self {
            height: 12,
            width: 3,
            pool: vec![1, 2, 3],
            seed: None,
            game_duration: 60.0,
            strict_invalid: false,
            include_time_left_norm: false,
            initial_fall_interval: 3.0,
            schedule_curve: vec![CurvePoint::new(20.0, 2.0), CurvePoint::new(40.0, 1.0)],
            time_mode: TimeMode::default(),
            rewards: RewardPreset::default(),
        }
    }
}

fn valid_interval(interval: f64) -> bool {
    interval.is_finite() && interval >= 0.0
}

impl PopperConfig {
    pub fn with_seed(seed: RandomSeed) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.height == 0 || self.width == 0 {
            return Err(ConfigError::ZeroDimension {
                height: self.height,
                width: self.width,
            });
        }
        if self.pool.is_empty() {
            return Err(ConfigError::EmptyPool);
        }
        if self.pool.contains(&EMPTY) {
            return Err(ConfigError::ZeroInPool);
        }
        for (i, value) in self.pool.iter().enumerate() {
            if self.pool[..i].contains(value) {
                return Err(ConfigError::DuplicateInPool(*value));
            }
        }
        if !(self.game_duration.is_finite() && self.game_duration > 0.0) {
            return Err(ConfigError::NonPositiveDuration(self.game_duration));
        }
        if !valid_interval(self.initial_fall_interval) {
            return Err(ConfigError::InvalidInterval(self.initial_fall_interval));
        }
        for point in &self.schedule_curve {
            if !(point.threshold.is_finite() && valid_interval(point.interval)) {
                return Err(ConfigError::InvalidCurvePoint {
                    threshold: point.threshold,
                    interval: point.interval,
                });
            }
        }
        if let TimeMode::Fixed { step_dt } = self.time_mode
            && !(step_dt.is_finite() && step_dt >= 0.0)
        {
            return Err(ConfigError::InvalidStepDt(step_dt));
        }
        Ok(())
    }

    /// Number of discrete actions: one per column plus the manual fall.
    pub const fn action_count(&self) -> usize {
        self.width + 1
    }
}
