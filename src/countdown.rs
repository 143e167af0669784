use chrono::{DateTime, Local};
use tracing::debug;

use crate::model::{CycleExtra, CycleStore};

/// Source of the current time. The session reads it once per event and
/// hands the value down, so the store itself never depends on it.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// What happened to the running cycle on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No cycle is counting down.
    Idle,
    /// Still counting, with the remaining seconds.
    Counting(i64),
    /// The cycle reached its duration and was marked as finished.
    Finished,
}

/// Seconds left for the running cycle, never negative. Zero when nothing
/// is running.
pub fn remaining_seconds(store: &CycleStore) -> i64 {
    match store.running_cycle() {
        Some(cycle) => std::cmp::max(0, cycle.total_seconds() - store.amount_seconds_passed()),
        None => 0,
    }
}

/// Render seconds as `MM:SS`.
pub fn format_mm_ss(seconds: i64) -> String {
    let seconds = std::cmp::max(0, seconds);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Recompute the elapsed seconds of the running cycle from its start
/// date, push them into the store, and finish the cycle once its whole
/// duration elapsed.
pub fn on_tick(store: &mut CycleStore, now: DateTime<Local>) -> TickOutcome {
    let (start_date, total_seconds) = match store.running_cycle() {
        Some(cycle) => (cycle.start_date, cycle.total_seconds()),
        None => return TickOutcome::Idle,
    };

    let seconds_passed = std::cmp::max(0, now.signed_duration_since(start_date).num_seconds());

    if seconds_passed >= total_seconds {
        store.tick(total_seconds);
        store.finish(now);
        return TickOutcome::Finished;
    }

    store.tick(seconds_passed);
    let remaining = total_seconds - seconds_passed;
    debug!(seconds_passed, remaining, "tick");
    TickOutcome::Counting(remaining)
}
