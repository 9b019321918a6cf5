use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use anyhow::Result;
use log::{debug, info};
use popper_core::popper::{Episode, PopperConfig, RandomSeed, SeedPool};
use rand::Rng;

use crate::{
    manifest::append_jsonl,
    proto::{ENV_ID, Frame, LineSocket, Message, parse_action},
};

pub struct RolloutOptions {
    pub episodes: u32,
    pub seed: RandomSeed,
    pub frames: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub steps: u64,
    pub total_reward: f64,
    pub score: f64,
    pub terminated: bool,
}

fn episode_seed(seed: RandomSeed, episode: u32) -> RandomSeed {
    seed.wrapping_add(u64::from(episode))
}

/// Plays `episodes` episodes, taking actions from `input` one line per step and
/// falling back to seeded random actions when a line is missing or unusable.
pub fn rollout<R: BufRead, W: Write>(
    config: &PopperConfig,
    options: &RolloutOptions,
    input: R,
    out: W,
) -> Result<Vec<EpisodeSummary>> {
    let mut episode = Episode::new(config.clone())?;
    let action_count = episode.action_count();
    let mut fallback = SeedPool::new(Some(options.seed)).rng("actions");
    let mut lines = input.lines();
    let mut socket = LineSocket::new(out);
    let mut summaries = Vec::new();

    for index in 0..options.episodes {
        episode.reset(Some(episode_seed(options.seed, index)));
        let mut summary = EpisodeSummary {
            episode: index,
            steps: 0,
            total_reward: 0.0,
            score: 0.0,
            terminated: false,
        };

        loop {
            let line = lines.next().transpose()?;
            let action = line
                .as_deref()
                .and_then(|line| parse_action(line, action_count))
                .unwrap_or_else(|| fallback.random_range(0..action_count));

            let transition = episode.step(action);
            let done = transition.done();
            summary.total_reward += transition.reward;
            summary.terminated = transition.terminated;

            let frame = Frame::new(index, summary.steps, action, transition);
            socket.send(&frame)?;
            if let Some(path) = &options.frames {
                append_jsonl(path, &frame)?;
            }
            summary.steps += 1;

            if done {
                break;
            }
        }

        summary.score = episode.score();
        info!(
            "Episode {} finished after {} steps, return {:.2}, score {:.2}",
            summary.episode, summary.steps, summary.total_reward, summary.score
        );
        summaries.push(summary);
    }

    Ok(summaries)
}

/// Request/response loop for an external policy. Ends early when `input` runs dry.
pub fn stream<R: BufRead, W: Write>(
    config: &PopperConfig,
    episodes: u32,
    seed: RandomSeed,
    input: R,
    out: W,
) -> Result<()> {
    let mut episode = Episode::new(config.clone())?;
    let action_count = episode.action_count();
    let mut lines = input.lines();
    let mut socket = LineSocket::new(out);

    socket.send(&Message::Meta {
        env_id: ENV_ID.to_owned(),
        action_space_n: action_count,
    })?;

    for index in 0..episodes {
        let (mut obs, mut info) = episode.reset(Some(episode_seed(seed, index)));
        socket.send(&Message::Reset {
            episode: index,
            obs: obs.clone(),
            info: info.clone(),
        })?;

        let mut step = 0;
        loop {
            // echoes the latest reset or step result
            socket.send(&Message::StepRequest {
                episode: index,
                step,
                obs,
                info,
            })?;

            let Some(line) = lines.next().transpose()? else {
                debug!("Input closed during episode {index}");
                return Ok(());
            };
            let action = parse_action(&line, action_count).unwrap_or(0);
            let transition = episode.step(action);
            let done = transition.done();
            obs = transition.observation.clone();
            info = transition.info.clone();
            socket.send(&Message::StepResult(Frame::new(
                index, step, action, transition,
            )))?;
            step += 1;

            if done {
                socket.send(&Message::Done { episode: index })?;
                break;
            }
        }
    }

    Ok(())
}
