use chrono::{DateTime, Local};
use std::fmt;
use tracing::{debug, info};

/// Identifier of a cycle, derived from its creation time in
/// milliseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(i64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single timed task attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub id: CycleId,
    pub task: String,
    pub minutes_amount: u32,
    pub start_date: DateTime<Local>,
    pub interruption_date: Option<DateTime<Local>>,
    pub finished_date: Option<DateTime<Local>>,
}

/// The state of a cycle. Both `Finished` and `Interrupted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Running,
    Finished,
    Interrupted,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Running => f.write_str("running"),
            CycleState::Finished => f.write_str("finished"),
            CycleState::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Traits
pub trait CycleExtra {
    fn is_terminal(&self) -> bool;
    fn state(&self) -> CycleState;
    fn total_seconds(&self) -> i64;
}

impl CycleExtra for Cycle {
    fn is_terminal(&self) -> bool {
        self.interruption_date.is_some() || self.finished_date.is_some()
    }

    fn state(&self) -> CycleState {
        if self.finished_date.is_some() {
            CycleState::Finished
        } else if self.interruption_date.is_some() {
            CycleState::Interrupted
        } else {
            CycleState::Running
        }
    }

    fn total_seconds(&self) -> i64 {
        i64::from(self.minutes_amount) * 60
    }
}

/// Holds every cycle of the session, the pointer to the active one and
/// the elapsed seconds of the active cycle.
///
/// The store never reads a clock; operations that stamp a date take
/// `now` from the caller.
#[derive(Debug, Default)]
pub struct CycleStore {
    cycles: Vec<Cycle>,
    active_cycle_id: Option<CycleId>,
    amount_seconds_passed: i64,
    last_id: Option<CycleId>,
}

impl CycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new cycle started at `now` and make it the active one,
    /// resetting the elapsed seconds. Inputs are expected to be validated
    /// already.
    pub fn create(&mut self, task: &str, minutes_amount: u32, now: DateTime<Local>) -> &Cycle {
        let id = self.next_id(now);
        let cycle = Cycle {
            id,
            task: task.to_string(),
            minutes_amount,
            start_date: now,
            interruption_date: None,
            finished_date: None,
        };
        info!(%id, task, minutes_amount, "cycle created");

        self.cycles.push(cycle);
        self.active_cycle_id = Some(id);
        self.amount_seconds_passed = 0;

        let index = self.cycles.len() - 1;
        &self.cycles[index]
    }

    /// Mark the active cycle as finished. The active pointer is kept, so
    /// the finished cycle is still returned by `active_cycle`.
    pub fn finish(&mut self, now: DateTime<Local>) {
        if let Some(cycle) = self.active_cycle_mut() {
            if cycle.is_terminal() {
                debug!(id = %cycle.id, "finish ignored, cycle already terminal");
                return;
            }
            cycle.finished_date = Some(now);
            info!(id = %cycle.id, "cycle finished");
        }
    }

    /// Mark the active cycle as interrupted and clear the active pointer.
    /// A cycle that already finished keeps its finish date; only the
    /// pointer is cleared.
    pub fn interrupt(&mut self, now: DateTime<Local>) {
        if let Some(cycle) = self.active_cycle_mut() {
            if cycle.is_terminal() {
                debug!(id = %cycle.id, "interrupt on terminal cycle, releasing pointer");
            } else {
                cycle.interruption_date = Some(now);
                info!(id = %cycle.id, "cycle interrupted");
            }
            self.active_cycle_id = None;
        }
    }

    /// Overwrite the elapsed seconds of the active cycle.
    pub fn tick(&mut self, seconds_passed: i64) {
        self.amount_seconds_passed = seconds_passed;
    }

    /// The cycle referenced by the active pointer, if any. It may be
    /// finished.
    pub fn active_cycle(&self) -> Option<&Cycle> {
        let id = self.active_cycle_id?;
        self.cycles.iter().find(|cycle| cycle.id == id)
    }

    /// The active cycle, only while it is still counting down.
    pub fn running_cycle(&self) -> Option<&Cycle> {
        self.active_cycle().filter(|cycle| !cycle.is_terminal())
    }

    #[cfg(test)]
    pub fn active_cycle_id(&self) -> Option<CycleId> {
        self.active_cycle_id
    }

    pub fn amount_seconds_passed(&self) -> i64 {
        self.amount_seconds_passed
    }

    /// All cycles, in creation order.
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    fn active_cycle_mut(&mut self) -> Option<&mut Cycle> {
        let id = self.active_cycle_id?;
        self.cycles.iter_mut().find(|cycle| cycle.id == id)
    }

    // ids must stay unique even when two cycles start within the same
    // millisecond, or the clock moves backwards.
    fn next_id(&mut self, now: DateTime<Local>) -> CycleId {
        let millis = now.timestamp_millis();
        let id = match self.last_id {
            Some(last) if millis <= last.0 => CycleId(last.0 + 1),
            _ => CycleId(millis),
        };
        self.last_id = Some(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_650_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn create_makes_the_new_cycle_active() {
        let mut store = CycleStore::new();
        store.tick(42);

        let cycle = store.create("Write report", 25, at(0)).clone();

        assert_eq!(cycle.task, "Write report");
        assert_eq!(cycle.minutes_amount, 25);
        assert_eq!(cycle.start_date, at(0));
        assert_eq!(cycle.state(), CycleState::Running);
        assert_eq!(store.active_cycle_id(), Some(cycle.id));
        assert_eq!(store.active_cycle(), Some(&cycle));
        assert_eq!(store.amount_seconds_passed(), 0);
    }

    #[test]
    fn ids_are_unique_within_the_same_millisecond() {
        let mut store = CycleStore::new();
        let first = store.create("a", 1, at(0)).id;
        store.interrupt(at(0));
        let second = store.create("b", 1, at(0)).id;
        store.interrupt(at(0));
        let third = store.create("c", 1, at(0) - Duration::seconds(5)).id;

        assert!(first < second);
        assert!(second < third);
        assert_eq!(first.to_string(), at(0).timestamp_millis().to_string());
    }

    #[test]
    fn finish_keeps_the_active_pointer() {
        let mut store = CycleStore::new();
        let id = store.create("Write report", 25, at(0)).id;

        store.finish(at(1500));

        let cycle = store.active_cycle().unwrap();
        assert_eq!(cycle.id, id);
        assert_eq!(cycle.finished_date, Some(at(1500)));
        assert_eq!(cycle.interruption_date, None);
        assert_eq!(cycle.state(), CycleState::Finished);
        assert!(store.running_cycle().is_none());
    }

    #[test]
    fn finish_twice_keeps_the_first_date() {
        let mut store = CycleStore::new();
        store.create("Write report", 25, at(0));
        store.finish(at(1500));
        store.finish(at(1600));

        assert_eq!(store.active_cycle().unwrap().finished_date, Some(at(1500)));
    }

    #[test]
    fn interrupt_clears_the_active_pointer() {
        let mut store = CycleStore::new();
        store.create("Read", 10, at(0));

        store.interrupt(at(30));

        assert_eq!(store.active_cycle_id(), None);
        assert!(store.active_cycle().is_none());
        assert_eq!(store.cycles().len(), 1);
        let cycle = &store.cycles()[0];
        assert_eq!(cycle.start_date, at(0));
        assert_eq!(cycle.interruption_date, Some(at(30)));
        assert_eq!(cycle.finished_date, None);
        assert_eq!(cycle.state(), CycleState::Interrupted);
    }

    #[test]
    fn interrupt_after_finish_only_releases_the_pointer() {
        let mut store = CycleStore::new();
        store.create("Read", 10, at(0));
        store.finish(at(600));

        store.interrupt(at(700));

        let cycle = &store.cycles()[0];
        assert_eq!(cycle.finished_date, Some(at(600)));
        assert_eq!(cycle.interruption_date, None);
        assert_eq!(store.active_cycle_id(), None);
    }

    #[test]
    fn operations_without_active_cycle_are_noops() {
        let mut store = CycleStore::new();
        store.finish(at(0));
        store.interrupt(at(0));

        assert!(store.cycles().is_empty());
        assert!(store.active_cycle().is_none());
    }

    #[test]
    fn tick_overwrites_the_counter() {
        let mut store = CycleStore::new();
        store.create("Read", 10, at(0));

        store.tick(30);
        store.tick(12);
        assert_eq!(store.amount_seconds_passed(), 12);
        store.tick(12);
        assert_eq!(store.amount_seconds_passed(), 12);
    }

    #[test]
    fn cycles_are_kept_in_creation_order() {
        let mut store = CycleStore::new();
        store.create("first", 5, at(0));
        store.interrupt(at(10));
        store.create("second", 5, at(20));
        store.finish(at(320));
        store.create("third", 5, at(400));

        let tasks: Vec<&str> = store.cycles().iter().map(|c| c.task.as_str()).collect();
        assert_eq!(tasks, vec!["first", "second", "third"]);
        assert_eq!(store.cycles()[1].state(), CycleState::Finished);
        assert_eq!(store.active_cycle().unwrap().task, "third");
    }
}
