use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use humantime::format_duration;
use prettytable::Table;
use std::io::Write;
use std::time::Duration as STDDuration;
use tracing::warn;

use crate::countdown::{format_mm_ss, remaining_seconds};
use crate::model::{Cycle, CycleExtra, CycleId, CycleStore};
use crate::validation::{FormErrors, NewCycleForm};

const TASK_COLUMN_WIDTH: usize = 32;

/// The result of submitting the new cycle form.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The task is empty, the form was not submitted at all.
    Disabled,
    /// A cycle is counting down; only interrupting is offered.
    Busy,
    Invalid(FormErrors),
    Started(CycleId),
}

/// Submit the new cycle form. On success the cycle is created and the
/// form is reset to its defaults.
pub fn submit(store: &mut CycleStore, form: &mut NewCycleForm, now: DateTime<Local>) -> Submission {
    if store.running_cycle().is_some() {
        return Submission::Busy;
    }
    if form.is_submit_disabled() {
        return Submission::Disabled;
    }
    match form.validate() {
        Ok(data) => {
            let id = store.create(&data.task, data.minutes_amount, now).id;
            form.reset();
            Submission::Started(id)
        }
        Err(errors) => {
            warn!(%errors, "form rejected");
            Submission::Invalid(errors)
        }
    }
}

/// Print the outcome of a submission.
pub fn report_submission(out: &mut impl Write, store: &CycleStore, submission: &Submission) -> Result<()> {
    match submission {
        Submission::Disabled => writeln!(out, "Enter a task to start a cycle.")?,
        Submission::Busy => writeln!(out, "A cycle is running. Use 'interrupt' to stop it first.")?,
        Submission::Invalid(errors) => {
            for (field, message) in errors.iter() {
                writeln!(out, "  {}: {}", field, message)?;
            }
        }
        Submission::Started(_) => {
            if let Some(cycle) = store.active_cycle() {
                writeln!(
                    out,
                    "Started '{}' for {}.",
                    cycle.task,
                    format_duration(STDDuration::from_secs(cycle.total_seconds() as u64))
                )?;
            }
        }
    }
    Ok(())
}

/// Interrupt the active cycle. Returns the interrupted cycle, if there
/// was one counting down.
pub fn interrupt(store: &mut CycleStore, now: DateTime<Local>) -> Option<CycleId> {
    let id = store.running_cycle().map(|cycle| cycle.id);
    store.interrupt(now);
    id
}

/// The countdown line: `MM:SS` remaining and the task being worked on.
pub fn status_line(store: &CycleStore) -> String {
    let remaining = format_mm_ss(remaining_seconds(store));
    match store.running_cycle() {
        Some(cycle) => format!("{}  {}", remaining, cycle.task),
        None => match store.active_cycle() {
            Some(cycle) => format!("{}  {} (finished)", remaining, cycle.task),
            None => format!("{}  no active cycle", remaining),
        },
    }
}

/// Print a table with every cycle of the session.
pub fn history(out: &mut impl Write, store: &CycleStore) -> Result<()> {
    if store.cycles().is_empty() {
        writeln!(out, "No cycles yet. Use 'start <minutes> <task>' to begin.")?;
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["#", "task", "duration", "started", "ended", "status"]);
    for (position, cycle) in store.cycles().iter().enumerate() {
        table.add_row(row![
            position + 1,
            fmt_task(cycle),
            format_duration(STDDuration::from_secs(cycle.total_seconds() as u64)),
            cycle.start_date.format("%T"),
            fmt_end(cycle),
            cycle.state()
        ]);
    }
    table.print(out).context("Failed to print the history table.")?;
    Ok(())
}

fn fmt_task(cycle: &Cycle) -> String {
    textwrap::fill(&cycle.task, TASK_COLUMN_WIDTH)
}

fn fmt_end(cycle: &Cycle) -> String {
    cycle
        .finished_date
        .or(cycle.interruption_date)
        .map(|date| date.format("%T").to_string())
        .unwrap_or_else(|| "-".to_string())
}
