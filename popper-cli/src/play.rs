use std::io::{self, BufRead, Write};

use anyhow::Result;
use log::info;
use popper_core::popper::{EMPTY, Episode, PopperConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Act(usize),
    Quit,
}

/// `a s d` pick columns 0..2, `f` forces a fall, digits address any action.
pub fn parse_key(line: &str, width: usize) -> Option<Key> {
    let key = line.trim();
    let action = match key {
        "q" => return Some(Key::Quit),
        "a" => 0,
        "s" => 1,
        "d" => 2,
        "f" => width,
        _ => key.parse().ok()?,
    };
    (action <= width).then_some(Key::Act(action))
}

pub fn draw(episode: &Episode) -> String {
    let [held_row, held_col] = episode.selection().position();
    let mut text = format!(
        "score {:.2} | time {:.1}s | fall every {:.2}s\n",
        episode.score(),
        episode.schedule().time_left(),
        episode.schedule().fall_interval(),
    );
    for (row, cells) in episode.board().rows().iter().enumerate() {
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(col, &value)| {
                let cell = if value == EMPTY {
                    ".".to_owned()
                } else {
                    value.to_string()
                };
                if usize::try_from(held_row).ok() == Some(row)
                    && usize::try_from(held_col).ok() == Some(col)
                {
                    format!("{cell}*")
                } else {
                    format!("{cell} ")
                }
            })
            .collect();
        text.push_str(line.join(" ").trim_end());
        text.push('\n');
    }
    text
}

pub fn play(config: PopperConfig) -> Result<()> {
    let mut episode = Episode::new(config)?;
    let width = episode.board().width();
    let mut stdout = io::stdout().lock();
    let mut lines = io::stdin().lock().lines();

    loop {
        episode.wall_time_tick();
        write!(stdout, "{}> ", draw(&episode))?;
        stdout.flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let action = match parse_key(&line, width) {
            Some(Key::Quit) => break,
            Some(Key::Act(action)) => action,
            None => {
                writeln!(stdout, "keys: a s d columns, f fall, q quit")?;
                continue;
            }
        };

        episode.wall_time_tick();
        let transition = episode.step(action);
        if transition.done() {
            write!(stdout, "{}", draw(&episode))?;
            let reason = if transition.terminated {
                "board overflowed"
            } else {
                "time is up"
            };
            writeln!(stdout, "game over: {reason}, score {:.2}", episode.score())?;
            break;
        }
    }

    info!("Play session ended with score {:.2}", episode.score());
    Ok(())
}
