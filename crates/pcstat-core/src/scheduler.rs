//! Fixed-cadence collection loop.
//!
//! Ticks are anchored to the start of each cycle: a cycle that overruns
//! the interval skips the missed ticks instead of replaying them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::fmt::format_elapsed;
use crate::model::IndexStats;

/// Granularity of shutdown checks while sleeping.
pub const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Reporting,
    Sleeping,
}

/// First tick after `now` on the grid `start + k * interval`, `k >= 1`.
pub fn next_tick(start: Instant, interval: Duration, now: Instant) -> Instant {
    if interval.is_zero() {
        return now;
    }
    let mut next = start + interval;
    while next <= now {
        next += interval;
    }
    next
}

/// Sleeps until `deadline` in [`SLEEP_SLICE`] steps. Returns false when
/// `running` was cleared first.
pub fn sleep_until(deadline: Instant, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// One collect-then-report round.
pub trait Cycle {
    fn collect(&mut self, started: DateTime<Utc>) -> IndexStats;

    fn report(&mut self, stats: &IndexStats, started: DateTime<Utc>);
}

pub struct Scheduler {
    interval: Duration,
    phase: Phase,
    cycles: u64,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            phase: Phase::Idle,
            cycles: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Scheduler: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs one full cycle and returns when it started.
    pub fn run_once<C: Cycle + ?Sized>(&mut self, cycle: &mut C) -> Instant {
        let start = Instant::now();
        let started = Utc::now();

        self.enter(Phase::Collecting);
        let stats = cycle.collect(started);

        self.enter(Phase::Reporting);
        cycle.report(&stats, started);

        self.cycles += 1;
        self.enter(Phase::Idle);
        debug!("Cycle #{} took {}", self.cycles, format_elapsed(start.elapsed()));
        start
    }

    /// Runs cycles until `running` is cleared. A cycle in progress always
    /// completes.
    pub fn run<C: Cycle + ?Sized>(&mut self, cycle: &mut C, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            let start = self.run_once(cycle);

            let next = next_tick(start, self.interval, Instant::now());
            debug!(
                "Next collection in {}",
                format_elapsed(next.saturating_duration_since(Instant::now()))
            );
            self.enter(Phase::Sleeping);
            let reached = sleep_until(next, running);
            self.enter(Phase::Idle);
            if !reached {
                break;
            }
        }
    }
}
