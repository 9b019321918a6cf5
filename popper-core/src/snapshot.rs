use serde::{Deserialize, Serialize};

use crate::popper::RandomSeed;

/// What a renderer or policy sees after each transition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Observation {
    /// Rows top-first.
    pub board: Vec<Vec<u8>>,
    /// `[held, value]`, `[0, 0]` when nothing is held.
    pub selection: [u8; 2],
    /// `[row, col]` of the held value's source cell, `[-1, -1]` when nothing is held.
    pub sel_pos: [i32; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left_norm: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Info {
    pub score: f64,
    pub time_left: f64,
    pub pops_this_step: u32,
    pub fall_interval: f64,
    pub seed: Option<RandomSeed>,
    pub version: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

impl Transition {
    pub const fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}
