use std::io::Write;

use anyhow::{Context, Result};
use popper_core::snapshot::{Info, Observation, Transition};
use serde::{Deserialize, Serialize};

pub const ENV_ID: &str = "SpecKitAI/ColumnPopper-v1";

/// One step of an episode as written by `rollout`, and embedded in `step_result` messages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Frame {
    pub episode: u32,
    pub step: u64,
    pub action: usize,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
    pub obs: Observation,
}

impl Frame {
    pub fn new(episode: u32, step: u64, action: usize, transition: Transition) -> Self {
        Self {
            episode,
            step,
            action,
            reward: transition.reward,
            terminated: transition.terminated,
            truncated: transition.truncated,
            info: transition.info,
            obs: transition.observation,
        }
    }
}

/// Messages of the interactive `stream` protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Meta {
        env_id: String,
        action_space_n: usize,
    },
    Reset {
        episode: u32,
        obs: Observation,
        info: Info,
    },
    StepRequest {
        episode: u32,
        step: u64,
        obs: Observation,
        info: Info,
    },
    StepResult(Frame),
    Done {
        episode: u32,
    },
}

/// Writes one JSON document per line and flushes after each.
pub struct LineSocket<W: Write> {
    out: W,
}

impl<W: Write> LineSocket<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, msg).context("failed to encode frame")?;
        self.out.write_all(b"\n")?;
        self.out.flush().context("failed to flush frame")
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Parses one line of input into an action index below `action_count`.
pub fn parse_action(line: &str, action_count: usize) -> Option<usize> {
    line.trim()
        .parse::<usize>()
        .ok()
        .filter(|&action| action < action_count)
}
