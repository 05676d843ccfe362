//! # Cycle management
//!
//! A [`Clock`] provides monotonic time and sleeping, so that the control loop can be driven by the
//! wall clock on the robot and by a [`ManualClock`] in tests. The [`CycleTimer`] keeps the loop at
//! a fixed rate and records how often, and by how much, cycles overrun their period.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{thread, time::{Duration, Instant}};
use log::{debug, warn};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since the clock's (arbitrary) epoch.
    fn now(&self) -> Duration;

    /// Block for the given duration.
    fn sleep(&mut self, duration: Duration);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Wall clock, with the epoch set when the clock is created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

/// Clock which only moves when told to. Sleeping advances the clock by the sleep duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: Duration,
}

/// Fixed rate cycle timer.
#[derive(Debug, Clone)]
pub struct CycleTimer {
    /// Target period of one cycle
    period: Duration,

    /// Number of consecutive overruns at which a warning is issued
    overrun_warn_limit: u64,

    cycle_start: Duration,

    stats: CycleStats,
}

/// Cycle timing statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleStats {
    /// Number of completed cycles
    pub num_cycles: u64,

    /// Number of cycles which took longer than the period
    pub num_overruns: u64,

    /// Number of consecutive overruns up to the last completed cycle
    pub num_consec_overruns: u64,

    /// Largest amount a cycle has overrun by
    pub max_overrun: Duration,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now()
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration)
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward, simulating work being done.
    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration)
    }
}

impl CycleTimer {
    /// Create a new timer with the given period.
    pub fn new(period: Duration, overrun_warn_limit: u64) -> Self {
        Self {
            period,
            overrun_warn_limit,
            cycle_start: Duration::default(),
            stats: CycleStats::default(),
        }
    }

    /// Mark the start of a cycle.
    pub fn start_cycle<C: Clock>(&mut self, clock: &C) {
        self.cycle_start = clock.now();
    }

    /// Mark the end of a cycle, sleeping for whatever is left of the period.
    ///
    /// Returns the overrun if the cycle took longer than the period, in which case no sleep is
    /// performed.
    pub fn end_cycle<C: Clock>(&mut self, clock: &mut C) -> Option<Duration> {
        let cycle_dur = clock.now().checked_sub(self.cycle_start).unwrap_or_default();

        self.stats.num_cycles += 1;

        // Get sleep duration
        match self.period.checked_sub(cycle_dur) {
            Some(d) => {
                self.stats.num_consec_overruns = 0;
                clock.sleep(d);
                None
            },
            None => {
                let overrun = cycle_dur - self.period;

                debug!("Cycle overran by {:.06} s", overrun.as_secs_f64());

                self.stats.num_overruns += 1;
                self.stats.num_consec_overruns += 1;
                self.stats.max_overrun = self.stats.max_overrun.max(overrun);

                if self.stats.num_consec_overruns == self.overrun_warn_limit {
                    warn!(
                        "{} consecutive cycle overruns, the loop cannot keep up with a {:.06} s \
                         period",
                        self.stats.num_consec_overruns,
                        self.period.as_secs_f64()
                    );
                }

                Some(overrun)
            }
        }
    }

    /// The target cycle period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Timing statistics so far.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let mut clock = ManualClock::new();

        assert_eq!(clock.now(), Duration::from_secs(0));
        clock.sleep(Duration::from_millis(5));
        clock.advance(Duration::from_millis(1));
        assert_eq!(clock.now(), Duration::from_millis(6));
    }

    #[test]
    fn test_cycle_timer_keeps_rate() {
        let mut clock = ManualClock::new();
        let mut timer = CycleTimer::new(Duration::from_millis(10), 5);

        for i in 0..3u32 {
            timer.start_cycle(&clock);
            clock.advance(Duration::from_millis(4));
            assert_eq!(timer.end_cycle(&mut clock), None);
            assert_eq!(clock.now(), Duration::from_millis(10) * (i + 1));
        }

        let stats = timer.stats();
        assert_eq!(stats.num_cycles, 3);
        assert_eq!(stats.num_overruns, 0);
    }

    #[test]
    fn test_cycle_timer_overruns() {
        let mut clock = ManualClock::new();
        let mut timer = CycleTimer::new(Duration::from_millis(10), 2);

        // Two overrunning cycles, no sleep should be added
        timer.start_cycle(&clock);
        clock.advance(Duration::from_millis(13));
        assert_eq!(timer.end_cycle(&mut clock), Some(Duration::from_millis(3)));
        assert_eq!(clock.now(), Duration::from_millis(13));

        timer.start_cycle(&clock);
        clock.advance(Duration::from_millis(11));
        assert_eq!(timer.end_cycle(&mut clock), Some(Duration::from_millis(1)));

        assert_eq!(timer.stats().num_consec_overruns, 2);

        // A cycle on time resets the consecutive count but not the totals
        timer.start_cycle(&clock);
        assert_eq!(timer.end_cycle(&mut clock), None);

        assert_eq!(timer.stats(), CycleStats {
            num_cycles: 3,
            num_overruns: 2,
            num_consec_overruns: 0,
            max_overrun: Duration::from_millis(3),
        });
    }
}
