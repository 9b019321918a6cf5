mod board;
mod config;
mod episode;
mod rewards;
mod rng;
mod schedule;

pub use board::*;
pub use config::*;
pub use episode::*;
pub use rewards::*;
pub use rng::*;
pub use schedule::*;
