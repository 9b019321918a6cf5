use serde::{Deserialize, Serialize};

/// Smallest interval a fall can be armed with.
pub const MIN_FALL_INTERVAL: f64 = 1e-6;

/// A point on the fall-speed ramp: once `threshold` seconds have elapsed,
/// falls are armed with `interval`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub threshold: f64,
    pub interval: f64,
}

impl CurvePoint {
    pub const fn new(threshold: f64, interval: f64) -> Self {
        Self {
            threshold,
            interval,
        }
    }
}

impl From<(f64, f64)> for CurvePoint {
    fn from((threshold, interval): (f64, f64)) -> Self {
        Self::new(threshold, interval)
    }
}

/// Game clock and automatic fall timer.
///
/// Elapsed time only grows; each [`Schedule::advance_step`] reports how many
/// falls became due. A fall is armed with the interval in force when the
/// previous fall fired, so a curve change takes effect from the next fall on.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    duration: f64,
    initial_interval: f64,
    curve: Vec<CurvePoint>,
    elapsed: f64,
    time_left: f64,
    fall_interval: f64,
    armed_interval: f64,
    accum: f64,
}

impl Schedule {
    pub fn new(duration: f64, initial_interval: f64, mut curve: Vec<CurvePoint>) -> Self {
        curve.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        let mut new = Self {
            duration,
            initial_interval,
            curve,
            elapsed: 0.0,
            time_left: duration,
            fall_interval: initial_interval,
            armed_interval: initial_interval,
            accum: 0.0,
        };
        new.reset();
        new
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.time_left = self.duration;
        self.fall_interval = self.initial_interval;
        self.update_interval();
        self.armed_interval = self.fall_interval;
        self.accum = 0.0;
    }

    fn update_interval(&mut self) {
        for point in &self.curve {
            if self.elapsed >= point.threshold {
                self.fall_interval = point.interval;
            }
        }
    }

    /// Advances the clock by `dt` seconds and returns the number of falls that became due.
    pub fn advance_step(&mut self, dt: f64) -> u32 {
        assert!(
            dt.is_finite() && dt >= 0.0,
            "Tried to advance the schedule by {dt}"
        );
        self.elapsed += dt;
        self.time_left = (self.duration - self.elapsed).max(0.0);
        self.update_interval();
        self.accum += dt;

        let mut falls = 0;
        while self.accum >= self.armed_interval.max(MIN_FALL_INTERVAL) {
            self.accum -= self.armed_interval.max(MIN_FALL_INTERVAL);
            self.armed_interval = self.fall_interval;
            falls += 1;
        }
        falls
    }

    pub const fn truncated(&self) -> bool {
        self.time_left <= 0.0
    }

    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub const fn time_left(&self) -> f64 {
        self.time_left
    }

    /// Remaining time as a fraction of the whole game, in `[0, 1]`.
    pub fn time_left_norm(&self) -> f64 {
        (self.time_left / self.duration).clamp(0.0, 1.0)
    }

    pub const fn fall_interval(&self) -> f64 {
        self.fall_interval
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(schedule: &mut Schedule, steps: usize, dt: f64) -> u32 {
        (0..steps).map(|_| schedule.advance_step(dt)).sum()
    }

    #[test]
    fn curve_speeds_up_falls() {
        let mut schedule = Schedule::new(10.0, 2.0, vec![CurvePoint::new(5.0, 1.0)]);

        assert_eq!(run(&mut schedule, 5, 1.0), 2);
        assert!((schedule.time_left() - 5.0).abs() < 1e-9);
        assert!(schedule.fall_interval() == 1.0);
        assert!(!schedule.truncated());

        assert_eq!(run(&mut schedule, 5, 1.0), 5);
        assert!(schedule.truncated());
    }

    #[test]
    fn later_thresholds_overwrite_earlier_ones() {
        let mut schedule = Schedule::new(
            60.0,
            3.0,
            vec![CurvePoint::new(40.0, 1.0), CurvePoint::new(20.0, 2.0)],
        );
        schedule.advance_step(25.0);
        assert!(schedule.fall_interval() == 2.0);
        schedule.advance_step(25.0);
        assert!(schedule.fall_interval() == 1.0);
        schedule.advance_step(5.0);
        assert!(schedule.fall_interval() == 1.0);
    }

    #[test]
    fn time_left_floors_at_zero_and_stays_truncated() {
        let mut schedule = Schedule::new(1.0, 10.0, vec![]);
        let mut last = schedule.time_left();
        for _ in 0..15 {
            schedule.advance_step(0.1);
            assert!(schedule.time_left() <= last);
            last = schedule.time_left();
        }
        assert!(schedule.time_left() == 0.0);
        assert!(schedule.truncated());
        schedule.advance_step(0.0);
        assert!(schedule.truncated());
        assert!(schedule.time_left_norm() == 0.0);
    }

    #[test]
    fn big_step_emits_many_falls() {
        let mut schedule = Schedule::new(100.0, 0.5, vec![]);
        assert_eq!(schedule.advance_step(3.0), 6);
        assert_eq!(schedule.advance_step(0.25), 0);
        assert_eq!(schedule.advance_step(0.25), 1);
    }

    #[test]
    fn zero_interval_is_floored() {
        let mut schedule = Schedule::new(100.0, 0.0, vec![]);
        let falls = schedule.advance_step(1e-5);
        assert!((9..=10).contains(&falls));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut schedule = Schedule::new(10.0, 2.0, vec![CurvePoint::new(5.0, 1.0)]);
        run(&mut schedule, 7, 1.0);
        schedule.reset();
        assert!(schedule.elapsed() == 0.0);
        assert!(schedule.time_left() == 10.0);
        assert!(schedule.fall_interval() == 2.0);
        assert_eq!(run(&mut schedule, 5, 1.0), 2);
    }

    #[test]
    #[should_panic(expected = "advance the schedule")]
    fn negative_dt_panics() {
        Schedule::new(10.0, 1.0, vec![]).advance_step(-1.0);
    }
}
