//! Property and scenario tests for the popper core.
//!
//! Invariants covered:
//! - Same seed and action sequence give identical transitions.
//! - Popping clears cells in multiples of three and leaves no triple behind.
//! - Spawns never complete a triple with the two cells beneath.
//! - The clock only runs down and truncation is sticky.
//! - Manual falls overflow a fresh board after exactly `height` steps.

use std::{thread, time::Duration};

use popper_core::popper::{
    Board, CurvePoint, EMPTY, Episode, EpisodeState, PopperConfig, RandomSource, RewardPreset,
    Schedule, TimeMode,
};
use proptest::prelude::*;

fn has_triple(column: &[u8]) -> bool {
    column
        .windows(3)
        .any(|w| w[0] != EMPTY && w[0] == w[1] && w[1] == w[2])
}

#[test]
fn board_pops_bottom_triple() {
    let mut board = Board::new(12, 3, vec![1, 2, 3], RandomSource::new(Some(123)));
    board.clear_column(1);
    board.set(9, 1, 2);
    board.set(10, 1, 2);
    board.set(11, 1, 2);

    assert_eq!(board.pop_triples_in_column(1), 3);
    assert_eq!(board.column(1)[9..], [0, 0, 0]);
}

#[test]
fn manual_falls_overflow_after_height_steps() {
    let config = PopperConfig::with_seed(5);
    let height = config.height;
    let mut episode = Episode::new(config).unwrap();

    for step in 1..=height {
        let t = episode.step(3);
        if step < height {
            assert!(!t.terminated, "overflowed early at step {step}");
        } else {
            assert!(t.terminated);
        }
    }
    assert_eq!(episode.state(), EpisodeState::Terminated);
}

#[test]
fn drop_completing_triple_pays_for_three_cells() {
    let mut episode = Episode::new(PopperConfig::with_seed(11)).unwrap();
    let board = episode.board_mut();
    board.clear();
    board.set(11, 0, 2);
    board.set(0, 2, 2);
    board.set(1, 2, 2);

    episode.step(0);
    let t = episode.step(2);
    let rewards = RewardPreset::default();
    assert!(t.reward >= rewards.step_cost + rewards.valid_action + 3.0 * rewards.pop_cell - 1e-9);
    assert_eq!(t.info.pops_this_step, 3);
}

#[test]
fn random_play_ends_by_time_or_overflow() {
    let mut episode = Episode::new(PopperConfig::with_seed(11)).unwrap();
    let mut done = false;
    for i in 0..5000 {
        let t = episode.step(i * 7 % 4);
        if t.done() {
            done = true;
            break;
        }
    }
    assert!(done);
}

#[test]
fn reset_with_same_seed_replays_board() {
    let mut episode = Episode::new(PopperConfig::with_seed(42)).unwrap();
    let first: Vec<_> = (0..20).map(|i| episode.step(i % 4)).collect();
    episode.reset(None);
    let second: Vec<_> = (0..20).map(|i| episode.step(i % 4)).collect();
    assert_eq!(first, second);
}

#[test]
fn wall_clock_tick_advances_time() {
    let mut episode = Episode::new(PopperConfig {
        seed: Some(1),
        time_mode: TimeMode::WallClock,
        ..PopperConfig::default()
    })
    .unwrap();
    thread::sleep(Duration::from_millis(20));
    episode.wall_time_tick();
    let (_, info) = episode.peek();
    assert!(info.time_left < 60.0);
    assert_eq!(episode.state(), EpisodeState::Running);
}

#[test]
fn curve_in_config_reaches_info() {
    let mut episode = Episode::new(PopperConfig {
        seed: Some(3),
        initial_fall_interval: 100.0,
        schedule_curve: vec![CurvePoint::new(0.5, 50.0)],
        time_mode: TimeMode::Fixed { step_dt: 0.25 },
        ..PopperConfig::default()
    })
    .unwrap();
    assert!(episode.peek().1.fall_interval == 100.0);
    episode.step(0);
    episode.step(0);
    assert!(episode.peek().1.fall_interval == 50.0);
}

proptest! {
    #[test]
    fn same_seed_same_transitions(
        seed in any::<u64>(),
        actions in prop::collection::vec(0usize..4, 1..200),
    ) {
        let mut a = Episode::new(PopperConfig::with_seed(seed)).unwrap();
        let mut b = Episode::new(PopperConfig::with_seed(seed)).unwrap();
        prop_assert_eq!(a.peek(), b.peek());
        for action in actions {
            let ta = a.step(action);
            let tb = b.step(action);
            prop_assert_eq!(ta.reward.to_bits(), tb.reward.to_bits());
            prop_assert_eq!(ta, tb);
        }
    }

    #[test]
    fn pop_leaves_no_triple(
        column in prop::collection::vec(0u8..4, 12),
        col in 0usize..3,
    ) {
        let mut board = Board::new(12, 3, vec![1, 2, 3], RandomSource::new(Some(0)));
        for (row, value) in column.iter().enumerate() {
            board.set(row, col, *value);
        }
        let before = board.column(col).iter().filter(|&&v| v != EMPTY).count();
        let popped = board.pop_triples_in_column(col);
        let after = board.column(col).iter().filter(|&&v| v != EMPTY).count();

        prop_assert_eq!(popped % 3, 0);
        prop_assert_eq!(before - after, popped as usize);
        prop_assert!(!has_triple(&board.column(col)));
    }

    #[test]
    fn spawn_never_completes_triple(
        seed in any::<u64>(),
        value in 1u8..4,
        col in 0usize..3,
    ) {
        let mut board = Board::new(12, 3, vec![1, 2, 3], RandomSource::new(Some(seed)));
        board.set(1, col, value);
        board.set(2, col, value);
        for _ in 0..20 {
            prop_assert_ne!(board.spawn_value_for_column(col), value);
        }
    }

    #[test]
    fn clock_runs_down_monotonically(dts in prop::collection::vec(0.0f64..2.0, 1..60)) {
        let duration = 10.0;
        let mut schedule = Schedule::new(duration, 1.0, vec![CurvePoint::new(4.0, 0.5)]);
        let mut last = schedule.time_left();
        let mut total = 0.0;
        let mut was_truncated = false;
        for dt in dts {
            schedule.advance_step(dt);
            total += dt;
            prop_assert!(schedule.time_left() <= last);
            last = schedule.time_left();
            prop_assert_eq!(schedule.truncated(), total >= duration);
            prop_assert!(!was_truncated || schedule.truncated());
            if total >= duration {
                prop_assert!(schedule.time_left() == 0.0);
            }
            was_truncated = schedule.truncated();
        }
    }
}
