use std::{
    fs::read_to_string,
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use driver::RolloutOptions;
use log::info;
use manifest::{RunManifest, write_json};
use popper_core::popper::{DEFAULT_PRESET, PopperConfig, RandomSeed, RewardPreset, TimeMode};

mod driver;
mod manifest;
mod play;
mod proto;

#[derive(Parser)]
#[command(name = "column-popper", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run episodes, reading one action per stdin line and writing JSON frames
    Rollout {
        #[command(flatten)]
        game: GameArgs,

        #[arg(long, default_value_t = 1)]
        episodes: u32,

        /// Write a run manifest here
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Also append every frame to this JSONL file
        #[arg(long)]
        frames: Option<PathBuf>,
    },
    /// Request/response protocol for an external agent
    Stream {
        #[command(flatten)]
        game: GameArgs,

        #[arg(long, default_value_t = 1)]
        episodes: u32,
    },
    /// Play in the terminal against the real clock
    Play {
        #[command(flatten)]
        game: GameArgs,
    },
}

#[derive(Args)]
struct GameArgs {
    #[arg(long, default_value_t = 42)]
    seed: RandomSeed,

    /// JSON file with a partial game config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Add the normalized time left to observations
    #[arg(long)]
    include_time: bool,

    /// End the episode on a drop into a full column
    #[arg(long)]
    strict_invalid: bool,

    /// Game duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Advance time by the real clock instead of a fixed step
    #[arg(long)]
    wall_clock: bool,

    /// Named reward table
    #[arg(long)]
    reward_preset: Option<String>,
}

impl GameArgs {
    fn preset_name(&self) -> &str {
        self.reward_preset.as_deref().unwrap_or(DEFAULT_PRESET)
    }

    fn load_config(&self) -> Result<PopperConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => PopperConfig::default(),
        };
        config.seed = Some(self.seed);
        config.include_time_left_norm |= self.include_time;
        config.strict_invalid |= self.strict_invalid;
        if let Some(duration) = self.duration {
            config.game_duration = duration;
        }
        if self.wall_clock {
            config.time_mode = TimeMode::WallClock;
        }
        if let Some(name) = &self.reward_preset {
            config.rewards = RewardPreset::named(name)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn read_config(path: &Path) -> Result<PopperConfig> {
    let json =
        read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid config in {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Rollout {
            game,
            episodes,
            manifest,
            frames,
        } => {
            let config = game.load_config()?;
            if let Some(path) = &manifest {
                let run = RunManifest::new(config.seed, game.preset_name())
                    .with_meta("command", "rollout")
                    .with_meta("episodes", episodes);
                write_json(path, &run)?;
                info!("Wrote manifest to {}", path.display());
            }
            let options = RolloutOptions {
                episodes,
                seed: game.seed,
                frames,
            };
            driver::rollout(&config, &options, io::stdin().lock(), io::stdout().lock())?;
        }
        Command::Stream { game, episodes } => {
            let config = game.load_config()?;
            driver::stream(
                &config,
                episodes,
                game.seed,
                io::stdin().lock(),
                io::stdout().lock(),
            )?;
        }
        Command::Play { mut game } => {
            game.wall_clock = true;
            play::play(game.load_config()?)?;
        }
    }

    Ok(())
}
