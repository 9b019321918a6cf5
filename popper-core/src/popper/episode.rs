use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{
    Board, ConfigError, PopperConfig, RandomSeed, Schedule, SeedPool, TimeMode, board::EMPTY,
};
use crate::{
    VERSION,
    snapshot::{Info, Observation, Transition},
};

const BOARD_RNG_KEY: &str = "board";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Pick from, or drop into, the column.
    Column(usize),
    /// Force one fall right now.
    Fall,
}

impl Action {
    /// Columns map to `0..width`, the manual fall to `width`.
    pub const fn from_index(index: usize, width: usize) -> Option<Self> {
        if index < width {
            Some(Self::Column(index))
        } else if index == width {
            Some(Self::Fall)
        } else {
            None
        }
    }

    pub const fn index(self, width: usize) -> usize {
        match self {
            Self::Column(col) => col,
            Self::Fall => width,
        }
    }
}

/// The value the player is carrying. Its source cell keeps the value until it is dropped.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Empty,
    Held {
        value: u8,
        source_row: usize,
        source_col: usize,
    },
}

impl Selection {
    pub const fn is_held(self) -> bool {
        matches!(self, Self::Held { .. })
    }

    pub const fn flag_value(self) -> [u8; 2] {
        match self {
            Self::Empty => [0, 0],
            Self::Held { value, .. } => [1, value],
        }
    }

    pub const fn position(self) -> [i32; 2] {
        match self {
            Self::Empty => [-1, -1],
            Self::Held {
                source_row,
                source_col,
                ..
            } => [source_row as i32, source_col as i32],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    Running,
    /// Overflow, or a full-column drop in strict mode.
    Terminated,
    /// Time is up.
    Truncated,
}

#[derive(Debug, Clone)]
pub struct Episode {
    config: PopperConfig,
    board: Board,
    schedule: Schedule,
    selection: Selection,
    score: f64,
    state: EpisodeState,
    seed: Option<RandomSeed>,
    last_wall_time: Option<Instant>,
}

impl Episode {
    /// Builds an episode and resets it with the configured seed.
    pub fn new(config: PopperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed;
        let mut new = Self {
            board: Self::fresh_board(&config, seed),
            schedule: Schedule::new(
                config.game_duration,
                config.initial_fall_interval,
                config.schedule_curve.clone(),
            ),
            selection: Selection::Empty,
            score: 0.0,
            state: EpisodeState::Running,
            seed,
            last_wall_time: None,
            config,
        };
        new.reset(None);
        Ok(new)
    }

    fn fresh_board(config: &PopperConfig, seed: Option<RandomSeed>) -> Board {
        Board::new(
            config.height,
            config.width,
            config.pool.clone(),
            SeedPool::new(seed).source(BOARD_RNG_KEY),
        )
    }

    /// Starts a new episode. `None` keeps the previous seed.
    pub fn reset(&mut self, seed: Option<RandomSeed>) -> (Observation, Info) {
        if seed.is_some() {
            self.seed = seed;
        }
        self.board = Self::fresh_board(&self.config, self.seed);
        self.schedule.reset();
        self.selection = Selection::Empty;
        self.score = 0.0;
        self.state = EpisodeState::Running;
        self.last_wall_time = match self.config.time_mode {
            TimeMode::WallClock => Some(Instant::now()),
            TimeMode::Fixed { .. } => None,
        };
        // first row visible from the start
        self.fall_tick();
        debug!("Episode reset with seed {:?}", self.seed);
        self.peek()
    }

    /// Applies one action by index. Panics if the index is not a valid action.
    pub fn step(&mut self, action: usize) -> Transition {
        let Some(action) = Action::from_index(action, self.board.width()) else {
            panic!(
                "Action {action} is out of range 0..{}",
                self.config.action_count()
            );
        };
        self.step_action(action)
    }

    pub fn step_action(&mut self, action: Action) -> Transition {
        if let Action::Column(col) = action {
            assert!(
                col < self.board.width(),
                "Tried to act on column {col} of a {}-wide board",
                self.board.width()
            );
        }
        if self.state != EpisodeState::Running {
            warn!("Stepped a finished episode ({:?})", self.state);
            return self.transition(0.0, 0);
        }

        let rewards = self.config.rewards;
        let mut reward = rewards.step_cost;
        let mut pops = 0;

        match action {
            Action::Column(col) => match self.selection {
                Selection::Empty => {
                    if let Some(row) = self.board.bottom_occupied_row(col) {
                        self.selection = Selection::Held {
                            value: self.board.get(row, col),
                            source_row: row,
                            source_col: col,
                        };
                        reward += rewards.valid_action;
                    }
                }
                Selection::Held {
                    value,
                    source_row,
                    source_col,
                } => {
                    if col == source_col {
                        self.board.set(source_row, source_col, EMPTY);
                    }
                    if let Some(row) = self.board.top_empty_row(col) {
                        self.board.set(row, col, value);
                        if col != source_col {
                            self.board.set(source_row, source_col, EMPTY);
                        }
                        self.selection = Selection::Empty;
                        reward += rewards.valid_action;

                        pops = self.board.pop_triples_in_column(col);
                        if pops > 0 {
                            let gained = rewards.pop_cell * f64::from(pops);
                            reward += gained;
                            self.score += gained;
                            debug!("Popped {pops} cells in column {col}");
                        }
                    } else {
                        reward += rewards.invalid_full_drop;
                        if self.config.strict_invalid {
                            info!("Dropped into full column {col}, terminating");
                            self.state = EpisodeState::Terminated;
                        }
                    }
                }
            },
            Action::Fall => {
                reward += rewards.valid_action + rewards.manual_fall_bonus;
                self.score += rewards.manual_fall_bonus;
            }
        }

        let dt = self.step_dt();
        let scheduled = self.schedule.advance_step(dt);
        if self.state == EpisodeState::Running {
            let ticks = match action {
                Action::Fall => 1,
                Action::Column(_) => scheduled,
            };
            for _ in 0..ticks {
                if self.fall_tick() {
                    info!("Board overflowed, terminating");
                    reward += rewards.overflow;
                    self.state = EpisodeState::Terminated;
                    break;
                }
            }
        }

        if self.state == EpisodeState::Running && self.schedule.truncated() {
            info!("Time is up with score {}", self.score);
            reward += rewards.time_up;
            self.state = EpisodeState::Truncated;
        }

        self.transition(reward, pops)
    }

    /// Advances the clock by the real time since the last sample and applies due falls.
    /// Does nothing in fixed-step mode or once the episode is over.
    pub fn wall_time_tick(&mut self) {
        if self.config.time_mode != TimeMode::WallClock || self.state != EpisodeState::Running {
            return;
        }
        let dt = self.sample_wall_clock();
        let falls = self.schedule.advance_step(dt);
        for _ in 0..falls {
            if self.fall_tick() {
                info!("Board overflowed between steps, terminating");
                self.state = EpisodeState::Terminated;
                break;
            }
        }
    }

    fn step_dt(&mut self) -> f64 {
        match self.config.time_mode {
            TimeMode::Fixed { step_dt } => step_dt,
            TimeMode::WallClock => self.sample_wall_clock(),
        }
    }

    fn sample_wall_clock(&mut self) -> f64 {
        let now = Instant::now();
        let dt = self
            .last_wall_time
            .map_or(0.0, |last| now.duration_since(last).as_secs_f64());
        self.last_wall_time = Some(now);
        dt
    }

    /// Shifts every column down and spawns new top values. Every column is shifted
    /// even if an earlier one overflowed. Returns if any column overflowed.
    fn fall_tick(&mut self) -> bool {
        let mut overflow = false;
        for col in 0..self.board.width() {
            overflow |= self.board.fall_column(col);
            if let Selection::Held {
                source_row,
                source_col,
                ..
            } = &mut self.selection
                && *source_col == col
            {
                *source_row = (*source_row + 1).min(self.board.height() - 1);
            }
        }
        overflow
    }

    pub fn peek(&self) -> (Observation, Info) {
        (self.observation(), self.info(0))
    }

    pub fn render(&self) -> String {
        self.board.render()
    }

    fn observation(&self) -> Observation {
        Observation {
            board: self.board.rows(),
            selection: self.selection.flag_value(),
            sel_pos: self.selection.position(),
            time_left_norm: self
                .config
                .include_time_left_norm
                .then(|| self.schedule.time_left_norm()),
        }
    }

    fn info(&self, pops_this_step: u32) -> Info {
        Info {
            score: self.score,
            time_left: self.schedule.time_left(),
            pops_this_step,
            fall_interval: self.schedule.fall_interval(),
            seed: self.seed,
            version: VERSION.to_owned(),
        }
    }

    fn transition(&self, reward: f64, pops: u32) -> Transition {
        Transition {
            observation: self.observation(),
            reward,
            terminated: self.state == EpisodeState::Terminated,
            truncated: self.state == EpisodeState::Truncated,
            info: self.info(pops),
        }
    }

    pub const fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == EpisodeState::Terminated
    }

    pub fn is_truncated(&self) -> bool {
        self.state == EpisodeState::Truncated
    }

    pub const fn score(&self) -> f64 {
        self.score
    }

    pub const fn selection(&self) -> Selection {
        self.selection
    }

    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Direct grid access for setting up positions. Leaves the selection untouched.
    pub const fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub const fn seed(&self) -> Option<RandomSeed> {
        self.seed
    }

    pub const fn config(&self) -> &PopperConfig {
        &self.config
    }

    pub const fn action_count(&self) -> usize {
        self.config.action_count()
    }
}
